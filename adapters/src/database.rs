//! Database adapter
//!
//! Implements the contract for data-store backends. The wire-level driver
//! is hidden behind [`DatabaseBackend`]; the adapter owns verb dispatch,
//! transaction semantics, and error classification. [`MemoryBackend`] is
//! the default backend for tests and offline development.

use crate::metrics;
use adapter_core::{
    Adapter, AdapterConfig, AdapterError, AdapterInfo, AdapterKind, AdapterOperation,
    AdapterResult, AdapterState, AdapterStatus, ConnectionResult, Credentials, DatabaseConfig,
    DatabaseCredentials, DatabaseOperation, ErrorCode, OperationMetadata, Result, StatusTracker,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// One result row, as column/value pairs
pub type Row = Map<String, Value>;

/// Failure raised by a database backend client
#[derive(Debug, Error)]
pub enum BackendError {
    /// Established connection dropped mid-operation
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Backend refused the connection
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Operation exceeded its time budget
    #[error("timeout: {0}")]
    Timeout(String),

    /// Lock wait exceeded
    #[error("lock timeout: {0}")]
    LockTimeout(String),

    /// Deadlock detected
    #[error("deadlock: {0}")]
    Deadlock(String),

    /// Statement rejected
    #[error("query error: {0}")]
    Query(String),

    /// Anything the client surfaces only as text
    #[error("{0}")]
    Other(String),
}

/// Narrow interface a real driver (or test double) implements
///
/// "Perform the verb, raise on failure" — pooling, wire protocol, and TLS
/// all belong to the implementing client.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Open a session.
    async fn connect(
        &mut self,
        config: &DatabaseConfig,
        credentials: &DatabaseCredentials,
    ) -> std::result::Result<(), BackendError>;

    /// Close the session.
    async fn disconnect(&mut self) -> std::result::Result<(), BackendError>;

    /// Trivial round trip.
    async fn ping(&mut self) -> std::result::Result<(), BackendError>;

    /// Run a statement and return matching rows.
    async fn query(
        &mut self,
        statement: &str,
        params: &[Value],
    ) -> std::result::Result<Vec<Row>, BackendError>;

    /// Insert one row; returns rows affected.
    async fn insert(
        &mut self,
        table: &str,
        values: &Row,
    ) -> std::result::Result<u64, BackendError>;

    /// Update rows matching an equality filter; returns rows affected.
    async fn update(
        &mut self,
        table: &str,
        values: &Row,
        filter: &Row,
    ) -> std::result::Result<u64, BackendError>;

    /// Delete rows matching an equality filter; returns rows affected.
    async fn delete(&mut self, table: &str, filter: &Row)
        -> std::result::Result<u64, BackendError>;

    /// Describe one table, or list all tables.
    async fn schema(&mut self, table: Option<&str>) -> std::result::Result<Value, BackendError>;

    /// Open a transaction.
    async fn begin(&mut self) -> std::result::Result<(), BackendError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> std::result::Result<(), BackendError>;

    /// Roll the open transaction back.
    async fn rollback(&mut self) -> std::result::Result<(), BackendError>;
}

/// Classify a backend failure into the shared taxonomy.
///
/// Structured variants map directly; `Other` falls back to message
/// inspection ("timeout"/"connection" substrings signal transience).
fn classify(err: BackendError) -> AdapterError {
    match err {
        BackendError::ConnectionLost(msg) => AdapterError::new(ErrorCode::ConnectionLost, msg),
        BackendError::ConnectionRefused(msg) => {
            AdapterError::new(ErrorCode::ConnectionRefused, msg)
        }
        BackendError::Timeout(msg) => AdapterError::new(ErrorCode::Timeout, msg),
        BackendError::LockTimeout(msg) => AdapterError::new(ErrorCode::LockTimeout, msg),
        BackendError::Deadlock(msg) => AdapterError::new(ErrorCode::Deadlock, msg),
        BackendError::Query(msg) => AdapterError::new(ErrorCode::QueryFailed, msg),
        BackendError::Other(msg) => {
            let lower = msg.to_lowercase();
            if lower.contains("timeout") {
                AdapterError::new(ErrorCode::Timeout, msg)
            } else if lower.contains("connection") {
                AdapterError::new(ErrorCode::ConnectionLost, msg)
            } else {
                AdapterError::new(ErrorCode::Internal, msg)
            }
        }
    }
}

/// Deterministic in-memory table store
///
/// Equality-filter select/update/delete over named tables, trivial
/// `SELECT … FROM <table>` statements, and snapshot-based transactions.
/// Rejects empty usernames so failed-connect paths stay testable.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    connected: bool,
    tables: HashMap<String, Vec<Row>>,
    snapshot: Option<HashMap<String, Vec<Row>>>,
}

impl MemoryBackend {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> std::result::Result<&Vec<Row>, BackendError> {
        self.tables
            .get(name)
            .ok_or_else(|| BackendError::Query(format!("unknown table {:?}", name)))
    }

    fn row_matches(row: &Row, filter: &Row) -> bool {
        filter.iter().all(|(k, v)| row.get(k) == Some(v))
    }

    fn require_connected(&self) -> std::result::Result<(), BackendError> {
        if self.connected {
            Ok(())
        } else {
            Err(BackendError::ConnectionLost("no open session".to_string()))
        }
    }
}

#[async_trait]
impl DatabaseBackend for MemoryBackend {
    async fn connect(
        &mut self,
        _config: &DatabaseConfig,
        credentials: &DatabaseCredentials,
    ) -> std::result::Result<(), BackendError> {
        if credentials.username.is_empty() {
            return Err(BackendError::ConnectionRefused(
                "authentication failed: empty username".to_string(),
            ));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> std::result::Result<(), BackendError> {
        self.connected = false;
        self.snapshot = None;
        Ok(())
    }

    async fn ping(&mut self) -> std::result::Result<(), BackendError> {
        self.require_connected()
    }

    async fn query(
        &mut self,
        statement: &str,
        _params: &[Value],
    ) -> std::result::Result<Vec<Row>, BackendError> {
        self.require_connected()?;
        let mut tokens = statement.split_whitespace();
        match tokens.next() {
            Some(first) if first.eq_ignore_ascii_case("select") => {}
            _ => {
                return Err(BackendError::Query(format!(
                    "unsupported statement: {:?}",
                    statement
                )))
            }
        }
        let mut tokens = statement.split_whitespace();
        while let Some(token) = tokens.next() {
            if token.eq_ignore_ascii_case("from") {
                let table = tokens
                    .next()
                    .map(|t| t.trim_end_matches(';'))
                    .ok_or_else(|| {
                        BackendError::Query("statement missing table after FROM".to_string())
                    })?;
                return Ok(self.table(table)?.clone());
            }
        }
        Err(BackendError::Query(format!(
            "statement has no FROM clause: {:?}",
            statement
        )))
    }

    async fn insert(
        &mut self,
        table: &str,
        values: &Row,
    ) -> std::result::Result<u64, BackendError> {
        self.require_connected()?;
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(values.clone());
        Ok(1)
    }

    async fn update(
        &mut self,
        table: &str,
        values: &Row,
        filter: &Row,
    ) -> std::result::Result<u64, BackendError> {
        self.require_connected()?;
        self.table(table)?;
        let rows = self.tables.get_mut(table).unwrap();
        let mut affected = 0;
        for row in rows.iter_mut() {
            if Self::row_matches(row, filter) {
                for (k, v) in values {
                    row.insert(k.clone(), v.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(
        &mut self,
        table: &str,
        filter: &Row,
    ) -> std::result::Result<u64, BackendError> {
        self.require_connected()?;
        self.table(table)?;
        let rows = self.tables.get_mut(table).unwrap();
        let before = rows.len();
        rows.retain(|row| !Self::row_matches(row, filter));
        Ok((before - rows.len()) as u64)
    }

    async fn schema(&mut self, table: Option<&str>) -> std::result::Result<Value, BackendError> {
        self.require_connected()?;
        match table {
            Some(name) => {
                let rows = self.table(name)?;
                let columns: Map<String, Value> = rows
                    .first()
                    .map(|row| {
                        row.iter()
                            .map(|(k, v)| (k.clone(), Value::from(json_type_name(v))))
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(json!({ "table": name, "columns": columns }))
            }
            None => {
                let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
                names.sort_unstable();
                Ok(json!({ "tables": names }))
            }
        }
    }

    async fn begin(&mut self) -> std::result::Result<(), BackendError> {
        self.require_connected()?;
        if self.snapshot.is_some() {
            return Err(BackendError::Query("transaction already open".to_string()));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    async fn commit(&mut self) -> std::result::Result<(), BackendError> {
        self.require_connected()?;
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| BackendError::Query("no open transaction".to_string()))
    }

    async fn rollback(&mut self) -> std::result::Result<(), BackendError> {
        self.require_connected()?;
        match self.snapshot.take() {
            Some(snapshot) => {
                self.tables = snapshot;
                Ok(())
            }
            None => Err(BackendError::Query("no open transaction".to_string())),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Adapter for data-store backends
pub struct DatabaseAdapter {
    info: AdapterInfo,
    state: AdapterState,
    config: Option<DatabaseConfig>,
    backend: Box<dyn DatabaseBackend>,
    tracker: StatusTracker,
    connection_id: Option<Uuid>,
}

impl DatabaseAdapter {
    /// Adapter over a caller-supplied backend.
    pub fn new(id: impl Into<String>, backend: Box<dyn DatabaseBackend>) -> Self {
        Self {
            info: AdapterInfo {
                id: id.into(),
                name: "Database Adapter".to_string(),
                kind: AdapterKind::Database,
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: "Data-store connectivity with transactional batches".to_string(),
            },
            state: AdapterState::Uninitialized,
            config: None,
            backend,
            tracker: StatusTracker::new(),
            connection_id: None,
        }
    }

    /// Adapter over the in-memory backend.
    pub fn in_memory(id: impl Into<String>) -> Self {
        Self::new(id, Box::new(MemoryBackend::new()))
    }

    /// Run one non-transaction verb against the backend.
    async fn run_single(
        &mut self,
        op: &DatabaseOperation,
    ) -> std::result::Result<Value, BackendError> {
        match op {
            DatabaseOperation::Query { statement, params } => {
                let rows = self.backend.query(statement, params).await?;
                let row_count = rows.len();
                Ok(json!({ "rows": rows, "row_count": row_count }))
            }
            DatabaseOperation::Insert { table, values } => {
                let affected = self.backend.insert(table, values).await?;
                Ok(json!({ "rows_affected": affected }))
            }
            DatabaseOperation::Update {
                table,
                values,
                filter,
            } => {
                let affected = self.backend.update(table, values, filter).await?;
                Ok(json!({ "rows_affected": affected }))
            }
            DatabaseOperation::Delete { table, filter } => {
                let affected = self.backend.delete(table, filter).await?;
                Ok(json!({ "rows_affected": affected }))
            }
            DatabaseOperation::Schema { table } => self.backend.schema(table.as_deref()).await,
            DatabaseOperation::Transaction { .. } => {
                unreachable!("transactions are handled by dispatch")
            }
        }
    }

    /// Run a transaction: first member failure aborts the whole batch.
    async fn run_transaction(
        &mut self,
        operations: Vec<DatabaseOperation>,
    ) -> std::result::Result<Value, AdapterError> {
        self.backend.begin().await.map_err(classify)?;

        let mut results = Vec::with_capacity(operations.len());
        for op in &operations {
            if matches!(op, DatabaseOperation::Transaction { .. }) {
                self.backend.rollback().await.map_err(classify)?;
                return Err(AdapterError::unsupported_operation(
                    "nested transactions are not supported",
                ));
            }
            match self.run_single(op).await {
                Ok(data) => results.push(data),
                Err(err) => {
                    let failure = classify(err);
                    if let Err(rb) = self.backend.rollback().await {
                        warn!(error = %rb, "rollback failed after aborted transaction");
                    }
                    return Err(failure);
                }
            }
        }

        self.backend.commit().await.map_err(classify)?;
        Ok(json!({ "results": results, "operations": operations.len() }))
    }

    async fn dispatch(&mut self, op: DatabaseOperation) -> std::result::Result<Value, AdapterError> {
        match op {
            DatabaseOperation::Transaction { operations } => self.run_transaction(operations).await,
            other => self.run_single(&other).await.map_err(classify),
        }
    }

    fn metadata_json(&self) -> Value {
        match &self.config {
            Some(cfg) => json!({
                "host": cfg.host,
                "port": cfg.port,
                "database": cfg.database,
                "ssl": cfg.ssl,
                "pool": { "min": cfg.pool.min_connections, "max": cfg.pool.max_connections },
            }),
            None => json!({}),
        }
    }
}

#[async_trait]
impl Adapter for DatabaseAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    fn state(&self) -> AdapterState {
        self.state
    }

    async fn initialize(&mut self, config: AdapterConfig) -> Result<()> {
        if self.state == AdapterState::ShutDown {
            return Err(AdapterError::new(
                ErrorCode::InvalidState,
                "adapter has been shut down",
            ));
        }
        let cfg = match config {
            AdapterConfig::Database(cfg) => cfg,
            other => {
                return Err(AdapterError::invalid_config(format!(
                    "expected database configuration, got {}",
                    other.kind()
                )))
            }
        };
        cfg.validate()?;
        info!(adapter = %self.info.id, host = %cfg.host, database = %cfg.database, "database adapter initialized");
        self.config = Some(cfg);
        if self.state == AdapterState::Uninitialized {
            self.state = AdapterState::Initialized;
        }
        Ok(())
    }

    async fn connect(&mut self, credentials: Credentials) -> ConnectionResult {
        if self.state == AdapterState::ShutDown {
            return ConnectionResult::refused(AdapterError::new(
                ErrorCode::InvalidState,
                "adapter has been shut down",
            ));
        }
        let Some(config) = self.config.clone() else {
            self.tracker.record_error();
            return ConnectionResult::refused(AdapterError::new(
                ErrorCode::NotInitialized,
                "connect called before initialize",
            ));
        };
        let creds = match credentials {
            Credentials::Database(creds) => creds,
            other => {
                self.tracker.record_error();
                return ConnectionResult::refused(AdapterError::invalid_config(format!(
                    "expected database credentials, got {:?}",
                    other
                )));
            }
        };

        // A new session replaces any existing one.
        if self.state == AdapterState::Connected {
            if let Err(err) = self.backend.disconnect().await {
                warn!(error = %err, "stale session teardown failed");
            }
        }

        let started = Instant::now();
        match self.backend.connect(&config, &creds).await {
            Ok(()) => {
                let connection_id = Uuid::new_v4();
                self.state = AdapterState::Connected;
                self.connection_id = Some(connection_id);
                self.tracker.record_connect();
                self.tracker.record_latency(started.elapsed());
                metrics::set_connected(&self.info.id, self.info.kind, true);
                info!(adapter = %self.info.id, %connection_id, "database session established");
                ConnectionResult::established_with(connection_id, self.metadata_json())
            }
            Err(err) => {
                self.tracker.record_error();
                let failure = classify(err);
                warn!(adapter = %self.info.id, error = %failure, "database connect failed");
                ConnectionResult::refused(failure)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.state != AdapterState::Connected {
            return Ok(());
        }
        let result = self.backend.disconnect().await.map_err(classify);
        self.state = AdapterState::Disconnected;
        self.connection_id = None;
        metrics::set_connected(&self.info.id, self.info.kind, false);
        info!(adapter = %self.info.id, "database session closed");
        result
    }

    async fn execute(&mut self, operation: AdapterOperation) -> AdapterResult {
        let name = operation.name();
        let started = Instant::now();

        let outcome = if self.state != AdapterState::Connected {
            Err(AdapterError::not_connected())
        } else {
            match operation {
                AdapterOperation::Database(op) => self.dispatch(op).await,
                other => Err(AdapterError::unsupported_operation(format!(
                    "database adapter cannot execute {} operations",
                    other.family()
                ))),
            }
        };

        let elapsed = started.elapsed();
        metrics::record_operation(&self.info.id, name, outcome.is_ok(), elapsed);
        let metadata = OperationMetadata::new(name, elapsed);
        match outcome {
            Ok(data) => {
                self.tracker.touch();
                self.tracker.record_latency(elapsed);
                AdapterResult::ok(data, metadata)
            }
            Err(err) => {
                self.tracker.record_error();
                warn!(adapter = %self.info.id, operation = name, error = %err, "database operation failed");
                AdapterResult::fail(err, metadata)
            }
        }
    }

    async fn is_healthy(&mut self) -> bool {
        if self.state != AdapterState::Connected {
            return false;
        }
        let started = Instant::now();
        match self.backend.ping().await {
            Ok(()) => {
                self.tracker.record_latency(started.elapsed());
                self.tracker.touch();
                true
            }
            Err(_) => false,
        }
    }

    fn status(&self) -> AdapterStatus {
        self.tracker
            .snapshot(self.state == AdapterState::Connected, self.metadata_json())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.state == AdapterState::ShutDown {
            return Ok(());
        }
        let result = self.disconnect().await;
        self.state = AdapterState::ShutDown;
        info!(adapter = %self.info.id, "database adapter shut down");
        result
    }
}
