//! # MillLink Adapter Core
//!
//! Contract and shared value types for the integration adapter framework:
//! one polymorphic surface through which the controller talks to
//! heterogeneous external systems.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 Caller / Registry                │
//! └────────────────────────┬─────────────────────────┘
//!                          │ Adapter contract
//!        ┌─────────────────┼──────────────────┐
//!        │                 │                  │
//! ┌──────▼──────┐  ┌───────▼───────┐  ┌───────▼──────┐
//! │  Database   │  │  File System  │  │   HTTP API   │
//! │   Adapter   │  │    Adapter    │  │    Adapter   │
//! └──────┬──────┘  └───────┬───────┘  └───────┬──────┘
//!        │                 │                  │
//! ┌──────▼──────┐  ┌───────▼───────┐  ┌───────▼──────┐
//! │  DB client  │  │   tokio::fs   │  │   reqwest    │
//! └─────────────┘  └───────────────┘  └──────────────┘
//! ```
//!
//! Every adapter walks the same lifecycle
//! (`initialize → connect → execute* → disconnect/shutdown`), returns the
//! same [`AdapterResult`] shape, and classifies failures into the same
//! retryable/terminal taxonomy, so callers never branch on backend type.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod adapter;
pub mod config;
pub mod credentials;
pub mod error;
pub mod operation;
pub mod result;
pub mod retry;
pub mod status;

pub use adapter::{Adapter, AdapterInfo, AdapterKind, AdapterState};
pub use config::{
    AdapterConfig, DatabaseConfig, FileSystemConfig, FsPermissions, HttpApiConfig, PoolConfig,
    RateLimitConfig,
};
pub use credentials::{Credentials, DatabaseAuthMethod, DatabaseCredentials, HttpCredentials};
pub use error::{AdapterError, ErrorCode, Result};
pub use operation::{AdapterOperation, DatabaseOperation, FsOperation, HttpOperation};
pub use result::{AdapterResult, ConnectionResult, OperationMetadata};
pub use retry::retry_with_backoff;
pub use status::{AdapterStatus, StatusTracker};

/// Default per-request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default retry budget advertised to callers
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default rate-limit window capacity (requests)
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;

/// Default rate-limit window length (seconds)
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// Default file size ceiling (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Default database port (PostgreSQL)
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Default connection pool upper bound
pub const DEFAULT_POOL_MAX_CONNECTIONS: u32 = 10;

/// Default health probe path for HTTP backends
pub const DEFAULT_HEALTH_PATH: &str = "/health";
