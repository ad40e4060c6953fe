//! File-system adapter
//!
//! Implements the contract for a sandboxed file store. Every path is
//! resolved through a two-step containment guard before any I/O; verbs are
//! additionally gated by per-flag permissions, an extension allow-list, and
//! a size ceiling. The OS file system is hidden behind [`FileStore`] so
//! test doubles can verify that rejected paths never reach the disk.

use crate::metrics;
use adapter_core::{
    Adapter, AdapterConfig, AdapterError, AdapterInfo, AdapterKind, AdapterOperation,
    AdapterResult, AdapterState, AdapterStatus, ConnectionResult, Credentials, ErrorCode,
    FileSystemConfig, FsOperation, OperationMetadata, Result, StatusTracker,
};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

// POSIX errno values without stable `io::ErrorKind` mappings.
const ENFILE: i32 = 23;
const EMFILE: i32 = 24;
const ENOSPC: i32 = 28;

/// Metadata for one file or directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Entry is a directory
    pub is_dir: bool,
    /// Entry is a regular file
    pub is_file: bool,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, when the platform reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    /// Write-protected at the OS level
    pub readonly: bool,
}

/// One directory listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntryInfo {
    /// Entry name (no path)
    pub name: String,
    /// Entry is a directory
    pub is_dir: bool,
    /// Size in bytes
    pub size: u64,
}

/// Narrow interface over the OS file system
///
/// All paths arriving here have already passed the containment guard.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Read a whole file.
    async fn read(&self, path: &Path) -> io::Result<Bytes>;

    /// Write a whole file, replacing any existing contents.
    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// List a directory.
    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;

    /// Remove a file.
    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory.
    async fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Copy a file; returns bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Rename a file or directory.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create a directory and any missing parents.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Return entry metadata.
    async fn metadata(&self, path: &Path) -> io::Result<FileInfo>;

    /// Whether an entry exists.
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        match self.metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Production store backed by `tokio::fs`
#[derive(Debug, Default)]
pub struct TokioFileStore;

fn file_info(meta: &std::fs::Metadata) -> FileInfo {
    FileInfo {
        is_dir: meta.is_dir(),
        is_file: meta.is_file(),
        size: meta.len(),
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
        readonly: meta.permissions().readonly(),
    }
}

#[async_trait]
impl FileStore for TokioFileStore {
    async fn read(&self, path: &Path) -> io::Result<Bytes> {
        Ok(Bytes::from(tokio::fs::read(path).await?))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir(path).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        tokio::fs::copy(from, to).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileInfo> {
        Ok(file_info(&tokio::fs::metadata(path).await?))
    }
}

/// Map an I/O failure into the shared taxonomy.
fn classify(err: io::Error, path: &str) -> AdapterError {
    let details = json!({ "path": path });
    let adapter_err = match err.kind() {
        io::ErrorKind::NotFound => {
            AdapterError::new(ErrorCode::FileNotFound, format!("{:?} not found", path))
        }
        io::ErrorKind::PermissionDenied => AdapterError::new(
            ErrorCode::PermissionDenied,
            format!("access to {:?} denied by the operating system", path),
        ),
        io::ErrorKind::AlreadyExists => {
            AdapterError::new(ErrorCode::FileExists, format!("{:?} already exists", path))
        }
        _ => match err.raw_os_error() {
            Some(ENFILE) | Some(EMFILE) => AdapterError::new(
                ErrorCode::TooManyFiles,
                "file handle limit reached".to_string(),
            ),
            Some(ENOSPC) => {
                AdapterError::new(ErrorCode::NoSpace, "storage device is full".to_string())
            }
            _ => AdapterError::new(ErrorCode::IoError, err.to_string()),
        },
    };
    adapter_err.with_details(details)
}

/// Lexically fold `.` and `..` segments without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn path_violation(path: &str, reason: &str) -> AdapterError {
    AdapterError::new(
        ErrorCode::PathViolation,
        format!("path {:?} rejected: {}", path, reason),
    )
    .with_details(json!({ "path": path }))
}

/// Adapter for a sandboxed local file store
pub struct FileSystemAdapter {
    info: AdapterInfo,
    state: AdapterState,
    config: Option<FileSystemConfig>,
    store: Box<dyn FileStore>,
    tracker: StatusTracker,
    connection_id: Option<Uuid>,
    watches: HashMap<Uuid, PathBuf>,
}

impl FileSystemAdapter {
    /// Adapter over a caller-supplied store.
    pub fn new(id: impl Into<String>, store: Box<dyn FileStore>) -> Self {
        Self {
            info: AdapterInfo {
                id: id.into(),
                name: "File System Adapter".to_string(),
                kind: AdapterKind::FileSystem,
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: "Sandboxed file store with a base-path jail".to_string(),
            },
            state: AdapterState::Uninitialized,
            config: None,
            store,
            tracker: StatusTracker::new(),
            connection_id: None,
            watches: HashMap::new(),
        }
    }

    /// Adapter over the real file system.
    pub fn local(id: impl Into<String>) -> Self {
        Self::new(id, Box::new(TokioFileStore))
    }

    fn config(&self) -> &FileSystemConfig {
        self.config
            .as_ref()
            .expect("dispatch is only reachable after initialize")
    }

    /// Two-step containment guard. Both checks run before any I/O; no
    /// operation may touch a path outside the base, however it is encoded.
    fn resolve(&self, raw: &str) -> std::result::Result<PathBuf, AdapterError> {
        let candidate = Path::new(raw);
        if candidate.is_absolute() {
            return Err(path_violation(raw, "absolute paths are not allowed"));
        }
        for component in candidate.components() {
            match component {
                Component::ParentDir => {
                    return Err(path_violation(raw, "parent-directory segments are not allowed"))
                }
                Component::Prefix(_) | Component::RootDir => {
                    return Err(path_violation(raw, "absolute paths are not allowed"))
                }
                Component::CurDir | Component::Normal(_) => {}
            }
        }

        let base = normalize(&self.config().base_path);
        let joined = normalize(&base.join(candidate));
        if !joined.starts_with(&base) {
            return Err(path_violation(raw, "resolved path escapes the base directory"));
        }
        Ok(joined)
    }

    fn require_permission(
        &self,
        granted: bool,
        name: &str,
    ) -> std::result::Result<(), AdapterError> {
        if granted {
            Ok(())
        } else {
            Err(AdapterError::new(
                ErrorCode::PermissionDenied,
                format!("{} permission not granted", name),
            ))
        }
    }

    fn check_extension(&self, raw: &str) -> std::result::Result<(), AdapterError> {
        let Some(allowed) = &self.config().allowed_extensions else {
            return Ok(());
        };
        let ext = Path::new(raw)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
            Ok(())
        } else {
            Err(AdapterError::new(
                ErrorCode::ExtensionNotAllowed,
                format!("file extension {:?} not allowed", ext),
            )
            .with_details(json!({ "path": raw, "allowed": allowed })))
        }
    }

    fn check_size(&self, size: u64, path: &str) -> std::result::Result<(), AdapterError> {
        match self.config().max_file_size_bytes {
            Some(max) if size > max => Err(AdapterError::new(
                ErrorCode::FileTooLarge,
                format!("{:?} is {} bytes, ceiling is {}", path, size, max),
            )),
            _ => Ok(()),
        }
    }

    async fn dispatch(&mut self, op: FsOperation) -> std::result::Result<Value, AdapterError> {
        let perms = self.config().permissions;
        match op {
            FsOperation::Read { path } => {
                self.require_permission(perms.read, "read")?;
                let target = self.resolve(&path)?;
                let meta = self
                    .store
                    .metadata(&target)
                    .await
                    .map_err(|e| classify(e, &path))?;
                self.check_size(meta.size, &path)?;
                let contents = self.store.read(&target).await.map_err(|e| classify(e, &path))?;
                let size = contents.len();
                let (content, encoding) = match std::str::from_utf8(&contents) {
                    Ok(text) => (Value::from(text), "utf-8"),
                    Err(_) => (
                        Value::from(base64::engine::general_purpose::STANDARD.encode(&contents)),
                        "base64",
                    ),
                };
                Ok(json!({ "path": path, "size": size, "content": content, "encoding": encoding }))
            }
            FsOperation::Write {
                path,
                contents,
                overwrite,
            } => {
                let target = self.resolve(&path)?;
                self.check_extension(&path)?;
                self.check_size(contents.len() as u64, &path)?;
                let exists = self.store.exists(&target).await.map_err(|e| classify(e, &path))?;
                if exists {
                    self.require_permission(perms.write, "write")?;
                    if !overwrite {
                        return Err(AdapterError::new(
                            ErrorCode::FileExists,
                            format!("{:?} already exists and overwrite is disabled", path),
                        ));
                    }
                } else {
                    self.require_permission(perms.create, "create")?;
                }
                self.store
                    .write(&target, &contents)
                    .await
                    .map_err(|e| classify(e, &path))?;
                Ok(json!({ "path": path, "bytes_written": contents.len() }))
            }
            FsOperation::List { path } => {
                self.require_permission(perms.read, "read")?;
                let target = self.resolve(&path)?;
                let entries = self.store.list(&target).await.map_err(|e| classify(e, &path))?;
                let count = entries.len();
                Ok(json!({ "path": path, "entries": entries, "count": count }))
            }
            FsOperation::Delete { path } => {
                self.require_permission(perms.delete, "delete")?;
                let target = self.resolve(&path)?;
                let meta = self
                    .store
                    .metadata(&target)
                    .await
                    .map_err(|e| classify(e, &path))?;
                if meta.is_dir {
                    self.store.remove_dir(&target).await.map_err(|e| classify(e, &path))?;
                } else {
                    self.store.remove_file(&target).await.map_err(|e| classify(e, &path))?;
                }
                Ok(json!({ "path": path, "deleted": true }))
            }
            FsOperation::Copy { from, to } => {
                self.require_permission(perms.read, "read")?;
                self.require_permission(perms.create, "create")?;
                let source = self.resolve(&from)?;
                let dest = self.resolve(&to)?;
                self.check_extension(&to)?;
                let bytes = self
                    .store
                    .copy(&source, &dest)
                    .await
                    .map_err(|e| classify(e, &from))?;
                Ok(json!({ "from": from, "to": to, "bytes_copied": bytes }))
            }
            FsOperation::Move { from, to } => {
                self.require_permission(perms.write, "write")?;
                self.require_permission(perms.delete, "delete")?;
                let source = self.resolve(&from)?;
                let dest = self.resolve(&to)?;
                self.check_extension(&to)?;
                self.store
                    .rename(&source, &dest)
                    .await
                    .map_err(|e| classify(e, &from))?;
                Ok(json!({ "from": from, "to": to, "moved": true }))
            }
            FsOperation::Mkdir { path } => {
                self.require_permission(perms.create, "create")?;
                let target = self.resolve(&path)?;
                self.store
                    .create_dir_all(&target)
                    .await
                    .map_err(|e| classify(e, &path))?;
                Ok(json!({ "path": path, "created": true }))
            }
            FsOperation::Stat { path } => {
                self.require_permission(perms.read, "read")?;
                let target = self.resolve(&path)?;
                let meta = self
                    .store
                    .metadata(&target)
                    .await
                    .map_err(|e| classify(e, &path))?;
                let mut data = serde_json::to_value(&meta)
                    .map_err(|e| AdapterError::new(ErrorCode::Internal, e.to_string()))?;
                data["path"] = Value::from(path);
                Ok(data)
            }
            FsOperation::Watch { path } => {
                self.require_permission(perms.read, "read")?;
                let target = self.resolve(&path)?;
                self.store
                    .metadata(&target)
                    .await
                    .map_err(|e| classify(e, &path))?;
                let watch_id = Uuid::new_v4();
                self.watches.insert(watch_id, target);
                // Change detection is caller-driven: poll with `stat`.
                Ok(json!({ "watch_id": watch_id, "path": path }))
            }
        }
    }

    fn metadata_json(&self) -> Value {
        match &self.config {
            Some(cfg) => json!({
                "base_path": cfg.base_path.display().to_string(),
                "permissions": cfg.permissions,
                "allowed_extensions": cfg.allowed_extensions,
                "max_file_size_bytes": cfg.max_file_size_bytes,
                "watches": self.watches.len(),
            }),
            None => json!({}),
        }
    }
}

#[async_trait]
impl Adapter for FileSystemAdapter {
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
            AdapterConfig::FileSystem(cfg) => cfg,
            other => {
                return Err(AdapterError::invalid_config(format!(
                    "expected file_system configuration, got {}",
                    other.kind()
                )))
            }
        };
        cfg.validate()?;
        info!(adapter = %self.info.id, base_path = %cfg.base_path.display(), "file-system adapter initialized");
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
        let Some(config) = &self.config else {
            self.tracker.record_error();
            return ConnectionResult::refused(AdapterError::new(
                ErrorCode::NotInitialized,
                "connect called before initialize",
            ));
        };
        if !matches!(credentials, Credentials::None) {
            self.tracker.record_error();
            return ConnectionResult::refused(AdapterError::invalid_config(
                "file-system adapters take no credentials; the sandbox is the trust boundary",
            ));
        }

        let base = config.base_path.clone();
        let raw = base.display().to_string();
        let started = Instant::now();
        match self.store.metadata(&base).await {
            Ok(meta) if meta.is_dir => {
                let connection_id = Uuid::new_v4();
                self.state = AdapterState::Connected;
                self.connection_id = Some(connection_id);
                self.tracker.record_connect();
                self.tracker.record_latency(started.elapsed());
                metrics::set_connected(&self.info.id, self.info.kind, true);
                info!(adapter = %self.info.id, %connection_id, "file-system sandbox opened");
                ConnectionResult::established_with(connection_id, self.metadata_json())
            }
            Ok(_) => {
                self.tracker.record_error();
                ConnectionResult::refused(AdapterError::invalid_config(format!(
                    "base path {:?} is not a directory",
                    raw
                )))
            }
            Err(err) => {
                self.tracker.record_error();
                let failure = classify(err, &raw);
                warn!(adapter = %self.info.id, error = %failure, "file-system connect failed");
                ConnectionResult::refused(failure)
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.state != AdapterState::Connected {
            return Ok(());
        }
        self.state = AdapterState::Disconnected;
        self.connection_id = None;
        self.watches.clear();
        metrics::set_connected(&self.info.id, self.info.kind, false);
        info!(adapter = %self.info.id, "file-system sandbox closed");
        Ok(())
    }

    async fn execute(&mut self, operation: AdapterOperation) -> AdapterResult {
        let name = operation.name();
        let started = Instant::now();

        let outcome = if self.state != AdapterState::Connected {
            Err(AdapterError::not_connected())
        } else {
            match operation {
                AdapterOperation::FileSystem(op) => self.dispatch(op).await,
                other => Err(AdapterError::unsupported_operation(format!(
                    "file-system adapter cannot execute {} operations",
                    other.family()
                ))),
            }
        };

        let elapsed = started.elapsed();
        metrics::record_operation(&self.info.id, name, outcome.is_ok(), elapsed);
        let metadata = OperationMetadata::new(name, elapsed);
        match outcome {
            Ok(data) => {
                // Sessionless adapter: the connection counter doubles as the
                // successful-operation counter.
                self.tracker.record_connect();
                self.tracker.record_latency(elapsed);
                AdapterResult::ok(data, metadata)
            }
            Err(err) => {
                self.tracker.record_error();
                warn!(adapter = %self.info.id, operation = name, error = %err, "file-system operation failed");
                AdapterResult::fail(err, metadata)
            }
        }
    }

    async fn is_healthy(&mut self) -> bool {
        if self.state == AdapterState::ShutDown {
            return false;
        }
        let Some(config) = &self.config else {
            return false;
        };
        let base = config.base_path.clone();
        let started = Instant::now();
        match self.store.metadata(&base).await {
            Ok(meta) if meta.is_dir => {
                self.tracker.record_latency(started.elapsed());
                true
            }
            _ => false,
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
        info!(adapter = %self.info.id, "file-system adapter shut down");
        result
    }
}
