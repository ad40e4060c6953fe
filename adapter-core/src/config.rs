//! Per-backend adapter configuration
//!
//! Configuration is supplied once at `initialize` and treated as immutable
//! afterwards; it is never re-validated after connect. Parsing raw config
//! files is the configuration source's job, not the framework's.

use crate::{AdapterError, AdapterKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Typed configuration for one adapter instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum AdapterConfig {
    /// Data-store configuration
    Database(DatabaseConfig),
    /// Sandboxed file-store configuration
    FileSystem(FileSystemConfig),
    /// Remote REST backend configuration
    HttpApi(HttpApiConfig),
}

impl AdapterConfig {
    /// Backend family this configuration targets.
    pub fn kind(&self) -> AdapterKind {
        match self {
            AdapterConfig::Database(_) => AdapterKind::Database,
            AdapterConfig::FileSystem(_) => AdapterKind::FileSystem,
            AdapterConfig::HttpApi(_) => AdapterKind::HttpApi,
        }
    }

    /// Structural validation, performed once at `initialize`.
    pub fn validate(&self) -> Result<()> {
        match self {
            AdapterConfig::Database(cfg) => cfg.validate(),
            AdapterConfig::FileSystem(cfg) => cfg.validate(),
            AdapterConfig::HttpApi(cfg) => cfg.validate(),
        }
    }
}

/// Database adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Enable TLS on the backend connection
    pub ssl: bool,
    /// Connection pool sizing (enforced by the backend client)
    pub pool: PoolConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: crate::DEFAULT_DATABASE_PORT,
            database: String::new(),
            ssl: false,
            pool: PoolConfig::default(),
        }
    }
}

impl DatabaseConfig {
    /// Structural validation.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(AdapterError::invalid_config("database host must not be empty"));
        }
        if self.port == 0 {
            return Err(AdapterError::invalid_config("database port must not be zero"));
        }
        if self.database.is_empty() {
            return Err(AdapterError::invalid_config("database name must not be empty"));
        }
        self.pool.validate()
    }
}

/// Connection pool sizing
///
/// Pool locking and scheduling are delegated to the backend client library;
/// these bounds are only passed through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum pooled connections
    pub min_connections: u32,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: crate::DEFAULT_POOL_MAX_CONNECTIONS,
        }
    }
}

impl PoolConfig {
    /// Structural validation.
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(AdapterError::invalid_config("pool max_connections must not be zero"));
        }
        if self.min_connections > self.max_connections {
            return Err(AdapterError::invalid_config(format!(
                "pool min_connections {} exceeds max_connections {}",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}

/// File-system adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemConfig {
    /// Containment root; no operation may touch a path outside it
    pub base_path: PathBuf,
    /// Per-verb permission flags
    pub permissions: FsPermissions,
    /// Allowed file extensions (lowercase, without dot); `None` allows all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<Vec<String>>,
    /// Byte-size ceiling for reads and writes; `None` is unlimited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_size_bytes: Option<u64>,
}

impl Default for FileSystemConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::new(),
            permissions: FsPermissions::default(),
            allowed_extensions: None,
            max_file_size_bytes: Some(crate::DEFAULT_MAX_FILE_SIZE_BYTES),
        }
    }
}

impl FileSystemConfig {
    /// Structural validation.
    pub fn validate(&self) -> Result<()> {
        if self.base_path.as_os_str().is_empty() {
            return Err(AdapterError::invalid_config("base_path must not be empty"));
        }
        if let Some(max) = self.max_file_size_bytes {
            if max == 0 {
                return Err(AdapterError::invalid_config("max_file_size_bytes must not be zero"));
            }
        }
        if let Some(exts) = &self.allowed_extensions {
            if exts.iter().any(|e| e.is_empty() || e.starts_with('.')) {
                return Err(AdapterError::invalid_config(
                    "allowed_extensions entries must be bare extensions without a leading dot",
                ));
            }
        }
        Ok(())
    }
}

/// Fine-grained file-store permissions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FsPermissions {
    /// Read files and directories (read/list/stat/watch)
    pub read: bool,
    /// Overwrite existing files
    pub write: bool,
    /// Delete files and directories
    pub delete: bool,
    /// Create new files and directories
    pub create: bool,
}

impl Default for FsPermissions {
    fn default() -> Self {
        // Least privilege: callers opt in to anything that mutates.
        Self {
            read: true,
            write: false,
            delete: false,
            create: false,
        }
    }
}

impl FsPermissions {
    /// All flags granted.
    pub fn all() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
            create: true,
        }
    }

    /// Read-only access.
    pub fn read_only() -> Self {
        Self::default()
    }
}

/// HTTP API adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpApiConfig {
    /// Base URL every operation path is joined onto
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
    /// Retry budget advertised to callers (adapters never retry internally)
    pub retries: u32,
    /// Fixed-window rate limit; `None` disables limiting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
    /// Headers attached to every request (auth and per-operation headers win)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub default_headers: HashMap<String, String>,
    /// Path probed by `connect` and `is_healthy`
    pub health_path: String,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_seconds: crate::DEFAULT_REQUEST_TIMEOUT_SECONDS,
            retries: crate::DEFAULT_RETRY_ATTEMPTS,
            rate_limit: None,
            default_headers: HashMap::new(),
            health_path: crate::DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

impl HttpApiConfig {
    /// Structural validation.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AdapterError::invalid_config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(AdapterError::invalid_config("timeout_seconds must not be zero"));
        }
        if let Some(rl) = &self.rate_limit {
            rl.validate()?;
        }
        Ok(())
    }
}

/// Fixed-window rate limit
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: crate::DEFAULT_RATE_LIMIT_REQUESTS,
            window_seconds: crate::DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        }
    }
}

impl RateLimitConfig {
    /// Structural validation.
    pub fn validate(&self) -> Result<()> {
        if self.requests == 0 {
            return Err(AdapterError::invalid_config("rate_limit.requests must not be zero"));
        }
        if self.window_seconds == 0 {
            return Err(AdapterError::invalid_config(
                "rate_limit.window_seconds must not be zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn database_config_rejects_empty_fields() {
        let cfg = DatabaseConfig::default();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfig);

        let cfg = DatabaseConfig {
            database: "machines".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn pool_bounds_must_be_ordered() {
        let pool = PoolConfig {
            min_connections: 8,
            max_connections: 2,
        };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn http_config_requires_http_scheme() {
        let cfg = HttpApiConfig {
            base_url: "ftp://host".to_string(),
            ..HttpApiConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = HttpApiConfig {
            base_url: "https://api.example.com".to_string(),
            ..HttpApiConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn fs_config_rejects_dotted_extensions() {
        let cfg = FileSystemConfig {
            base_path: PathBuf::from("/var/lib/milllink"),
            allowed_extensions: Some(vec![".gcode".to_string()]),
            ..FileSystemConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_kind_matches_variant() {
        let cfg = AdapterConfig::FileSystem(FileSystemConfig {
            base_path: PathBuf::from("/tmp/jail"),
            ..FileSystemConfig::default()
        });
        assert_eq!(cfg.kind(), AdapterKind::FileSystem);
    }

    #[test]
    fn rate_limit_zero_window_is_invalid() {
        let rl = RateLimitConfig {
            requests: 10,
            window_seconds: 0,
        };
        assert!(rl.validate().is_err());
    }
}
