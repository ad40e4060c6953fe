//! The adapter contract

use crate::{
    config::AdapterConfig, credentials::Credentials, operation::AdapterOperation,
    result::{AdapterResult, ConnectionResult}, status::AdapterStatus, Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend family an adapter speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Relational/NoSQL data store
    Database,
    /// Sandboxed local file store
    FileSystem,
    /// Remote REST backend
    HttpApi,
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterKind::Database => write!(f, "database"),
            AdapterKind::FileSystem => write!(f, "file_system"),
            AdapterKind::HttpApi => write!(f, "http_api"),
        }
    }
}

/// Static adapter identity
///
/// Used by registries that select an adapter by capability (`kind`) rather
/// than concrete type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Unique adapter instance id
    pub id: String,
    /// Display name
    pub name: String,
    /// Backend family
    pub kind: AdapterKind,
    /// Implementation version
    pub version: String,
    /// Short description
    pub description: String,
}

/// Lifecycle state
///
/// ```text
/// Uninitialized → Initialized → Connected ⇄ Disconnected → ShutDown
/// ```
///
/// `ShutDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// No configuration stored yet
    Uninitialized,
    /// Configured, no session
    Initialized,
    /// Session established
    Connected,
    /// Session torn down, may reconnect
    Disconnected,
    /// Resources released, terminal
    ShutDown,
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterState::Uninitialized => write!(f, "uninitialized"),
            AdapterState::Initialized => write!(f, "initialized"),
            AdapterState::Connected => write!(f, "connected"),
            AdapterState::Disconnected => write!(f, "disconnected"),
            AdapterState::ShutDown => write!(f, "shut_down"),
        }
    }
}

/// Uniform contract every backend adapter implements
///
/// Callers drive the lifecycle `initialize → connect → execute* →
/// disconnect/shutdown` without knowing which backend they hold. An adapter
/// instance is owned by one caller context; internal counters are plain
/// fields, so concurrent sharing needs an external lock (see
/// `AdapterRegistry` in the adapters crate).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Static identity of this adapter instance.
    fn info(&self) -> &AdapterInfo;

    /// Current lifecycle state.
    fn state(&self) -> AdapterState;

    /// Store configuration. No I/O; fails only on structurally invalid
    /// config (or after shutdown). A second call overwrites the previous
    /// configuration.
    async fn initialize(&mut self, config: AdapterConfig) -> Result<()>;

    /// Establish a session. Never returns `Err`: every failure is captured
    /// in the [`ConnectionResult`]. Increments the connection counter on
    /// success and the error counter on failure.
    async fn connect(&mut self, credentials: Credentials) -> ConnectionResult;

    /// Tear down the session. Idempotent: returns `Ok(())` when already
    /// disconnected. May propagate backend teardown errors.
    async fn disconnect(&mut self) -> Result<()>;

    /// Dispatch one operation. Only valid while connected; otherwise the
    /// result fails with a terminal `NOT_CONNECTED` error. Always returns a
    /// result so callers can branch on `result.success` uniformly.
    async fn execute(&mut self, operation: AdapterOperation) -> AdapterResult;

    /// Lightweight round-trip probe. Never panics or errors; any failure
    /// degrades to `false`.
    async fn is_healthy(&mut self) -> bool;

    /// Health snapshot. Performs no I/O; latency is the last recorded
    /// probe/operation latency.
    fn status(&self) -> AdapterStatus;

    /// Release all resources. Forces a disconnect first when still
    /// connected and propagates its errors. Safe to call multiple times.
    async fn shutdown(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_matches_wire_names() {
        assert_eq!(AdapterKind::Database.to_string(), "database");
        assert_eq!(AdapterKind::FileSystem.to_string(), "file_system");
        assert_eq!(AdapterKind::HttpApi.to_string(), "http_api");
    }

    #[test]
    fn kind_serde_round_trip() {
        let json = serde_json::to_string(&AdapterKind::HttpApi).unwrap();
        assert_eq!(json, "\"http_api\"");
        let back: AdapterKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AdapterKind::HttpApi);
    }
}
