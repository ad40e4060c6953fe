//! Adapter registry (orchestrates all adapters)

use adapter_core::{Adapter, AdapterError, AdapterKind, AdapterStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Shared handle to a registered adapter
///
/// Adapters keep plain-field counters, so the registry is the lock
/// boundary that makes multi-caller sharing safe.
pub type AdapterHandle = Arc<Mutex<Box<dyn Adapter>>>;

struct Registered {
    kind: AdapterKind,
    handle: AdapterHandle,
}

/// Registry that owns adapter instances and selects them by id or capability
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<String, Registered>>,
}

impl AdapterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own id, replacing any previous
    /// registration with the same id.
    pub async fn register(&self, adapter: Box<dyn Adapter>) -> AdapterHandle {
        let info = adapter.info().clone();
        let handle: AdapterHandle = Arc::new(Mutex::new(adapter));
        let mut adapters = self.adapters.write().await;
        if adapters.contains_key(&info.id) {
            warn!(adapter = %info.id, "replacing existing adapter registration");
        }
        adapters.insert(
            info.id.clone(),
            Registered {
                kind: info.kind,
                handle: handle.clone(),
            },
        );
        info!(adapter = %info.id, kind = %info.kind, "adapter registered");
        handle
    }

    /// Look an adapter up by id.
    pub async fn get(&self, id: &str) -> Option<AdapterHandle> {
        let adapters = self.adapters.read().await;
        adapters.get(id).map(|r| r.handle.clone())
    }

    /// All registered adapter ids.
    pub async fn ids(&self) -> Vec<String> {
        let adapters = self.adapters.read().await;
        let mut ids: Vec<String> = adapters.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// All adapters of one backend family.
    pub async fn find_by_kind(&self, kind: AdapterKind) -> Vec<AdapterHandle> {
        let adapters = self.adapters.read().await;
        adapters
            .values()
            .filter(|r| r.kind == kind)
            .map(|r| r.handle.clone())
            .collect()
    }

    /// Status snapshot of every registered adapter.
    pub async fn status_report(&self) -> HashMap<String, AdapterStatus> {
        let handles: Vec<(String, AdapterHandle)> = {
            let adapters = self.adapters.read().await;
            adapters
                .iter()
                .map(|(id, r)| (id.clone(), r.handle.clone()))
                .collect()
        };

        let mut report = HashMap::with_capacity(handles.len());
        for (id, handle) in handles {
            let adapter = handle.lock().await;
            report.insert(id, adapter.status());
        }
        report
    }

    /// Probe every registered adapter.
    pub async fn check_health(&self) -> HashMap<String, bool> {
        let handles: Vec<(String, AdapterHandle)> = {
            let adapters = self.adapters.read().await;
            adapters
                .iter()
                .map(|(id, r)| (id.clone(), r.handle.clone()))
                .collect()
        };

        let mut report = HashMap::with_capacity(handles.len());
        for (id, handle) in handles {
            let mut adapter = handle.lock().await;
            report.insert(id, adapter.is_healthy().await);
        }
        report
    }

    /// Shut every adapter down, collecting failures instead of stopping at
    /// the first one.
    pub async fn shutdown_all(&self) -> Vec<(String, AdapterError)> {
        let handles: Vec<(String, AdapterHandle)> = {
            let mut adapters = self.adapters.write().await;
            adapters
                .drain()
                .map(|(id, r)| (id, r.handle))
                .collect()
        };

        let mut failures = Vec::new();
        for (id, handle) in handles {
            let mut adapter = handle.lock().await;
            if let Err(err) = adapter.shutdown().await {
                warn!(adapter = %id, error = %err, "shutdown failed");
                failures.push((id, err));
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseAdapter;
    use adapter_core::{
        AdapterConfig, AdapterState, Credentials, DatabaseAuthMethod, DatabaseConfig,
        DatabaseCredentials,
    };

    fn db_config() -> AdapterConfig {
        AdapterConfig::Database(DatabaseConfig {
            database: "machines".to_string(),
            ..DatabaseConfig::default()
        })
    }

    fn db_credentials() -> Credentials {
        Credentials::Database(DatabaseCredentials {
            username: "cnc".to_string(),
            password: "secret".to_string(),
            auth_method: DatabaseAuthMethod::Password,
        })
    }

    #[tokio::test]
    async fn register_lookup_and_kind_selection() {
        let registry = AdapterRegistry::new();
        registry
            .register(Box::new(DatabaseAdapter::in_memory("jobs-db")))
            .await;
        registry
            .register(Box::new(DatabaseAdapter::in_memory("telemetry-db")))
            .await;

        assert_eq!(registry.ids().await, vec!["jobs-db", "telemetry-db"]);
        assert!(registry.get("jobs-db").await.is_some());
        assert!(registry.get("missing").await.is_none());
        assert_eq!(
            registry.find_by_kind(AdapterKind::Database).await.len(),
            2
        );
        assert!(registry
            .find_by_kind(AdapterKind::HttpApi)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn status_report_reflects_lifecycle() {
        let registry = AdapterRegistry::new();
        let handle = registry
            .register(Box::new(DatabaseAdapter::in_memory("jobs-db")))
            .await;

        {
            let mut adapter = handle.lock().await;
            adapter.initialize(db_config()).await.unwrap();
            assert!(adapter.connect(db_credentials()).await.success);
        }

        let report = registry.status_report().await;
        assert!(report["jobs-db"].connected);
        assert_eq!(report["jobs-db"].connection_count, 1);

        let health = registry.check_health().await;
        assert!(health["jobs-db"]);
    }

    #[tokio::test]
    async fn shutdown_all_drains_the_registry() {
        let registry = AdapterRegistry::new();
        let handle = registry
            .register(Box::new(DatabaseAdapter::in_memory("jobs-db")))
            .await;

        let failures = registry.shutdown_all().await;
        assert!(failures.is_empty());
        assert!(registry.ids().await.is_empty());
        assert_eq!(handle.lock().await.state(), AdapterState::ShutDown);
    }
}
