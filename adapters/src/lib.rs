//! # MillLink Adapters
//!
//! Integration adapter layer with:
//! - One polymorphic contract for heterogeneous backends
//! - Base-path jail and permission gating for file access
//! - Credential-derived authentication and fixed-window rate limiting
//! - A shared retryable/terminal error taxonomy
//! - Uniform health/status observability
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          Adapter Registry (lock boundary)           │
//! └────────────┬────────────────────────────────────────┘
//!              │
//!     ┌────────┼────────────────┐
//!     │        │                │
//! ┌───▼────┐ ┌─▼────────┐ ┌─────▼────┐
//! │Database│ │FileSystem│ │ HTTP API │
//! │Adapter │ │ Adapter  │ │ Adapter  │
//! └───┬────┘ └─┬────────┘ └─────┬────┘
//!     │        │                │
//! ┌───▼────┐ ┌─▼────────┐ ┌─────▼────┐
//! │Backend │ │FileStore │ │Transport │  ← narrow traits, test doubles
//! └────────┘ └──────────┘ └──────────┘
//! ```
//!
//! Callers hold a `Box<dyn Adapter>` (or a registry handle) and drive the
//! shared lifecycle without knowing which backend is underneath.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod database;
pub mod filesystem;
pub mod http;
pub mod metrics;
pub mod registry;

pub use database::{BackendError, DatabaseAdapter, DatabaseBackend, MemoryBackend, Row};
pub use filesystem::{DirEntryInfo, FileInfo, FileStore, FileSystemAdapter, TokioFileStore};
pub use http::{
    HttpApiAdapter, HttpMethod, HttpTransport, ReqwestTransport, TransportError, TransportRequest,
    TransportResponse,
};
pub use registry::{AdapterHandle, AdapterRegistry};
