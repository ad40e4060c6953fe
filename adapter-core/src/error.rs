//! Shared error taxonomy for adapters

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for adapter lifecycle operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Stable failure code, uniform across backends.
///
/// Codes render in SCREAMING_SNAKE_CASE so monitoring rules and retry
/// policies can match on them regardless of which adapter produced the
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Adapter has no configuration yet
    NotInitialized,
    /// Operation requires a connected adapter
    NotConnected,
    /// Lifecycle call invalid in the current state (e.g. after shutdown)
    InvalidState,
    /// Structurally invalid configuration or credentials
    InvalidConfig,
    /// Operation family does not match the adapter
    UnsupportedOperation,
    /// Session could not be established
    ConnectionFailed,
    /// Established session was lost mid-operation
    ConnectionLost,
    /// Backend actively refused the connection
    ConnectionRefused,
    /// Operation exceeded its time budget
    Timeout,
    /// Row/table lock wait exceeded
    LockTimeout,
    /// Deadlock detected by the backend
    Deadlock,
    /// Statement rejected by the backend
    QueryFailed,
    /// Path escapes the configured base directory
    PathViolation,
    /// File or directory does not exist
    FileNotFound,
    /// Permission flag missing or OS-level access denied
    PermissionDenied,
    /// Target already exists
    FileExists,
    /// Storage device is full
    NoSpace,
    /// Process or system file-handle limit reached
    TooManyFiles,
    /// File extension not in the configured allow-list
    ExtensionNotAllowed,
    /// File exceeds the configured size ceiling
    FileTooLarge,
    /// Rate-limit window exhausted
    RateLimit,
    /// Remote returned a 5xx status
    ServerError,
    /// Remote returned 401
    Unauthorized,
    /// Remote returned 403
    Forbidden,
    /// Remote returned 404
    NotFound,
    /// Any other non-success HTTP status
    HttpError,
    /// Unclassified I/O failure
    IoError,
    /// Unclassified internal failure
    Internal,
}

impl ErrorCode {
    /// Default retryability for this code.
    ///
    /// Transient conditions (timeouts, lock contention, rate limiting,
    /// resource exhaustion) are retryable; structural problems are not.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectionFailed
                | ErrorCode::ConnectionLost
                | ErrorCode::ConnectionRefused
                | ErrorCode::Timeout
                | ErrorCode::LockTimeout
                | ErrorCode::Deadlock
                | ErrorCode::NoSpace
                | ErrorCode::TooManyFiles
                | ErrorCode::RateLimit
                | ErrorCode::ServerError
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::NotInitialized => "NOT_INITIALIZED",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::ConnectionLost => "CONNECTION_LOST",
            ErrorCode::ConnectionRefused => "CONNECTION_REFUSED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::Deadlock => "DEADLOCK",
            ErrorCode::QueryFailed => "QUERY_FAILED",
            ErrorCode::PathViolation => "PATH_VIOLATION",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::FileExists => "FILE_EXISTS",
            ErrorCode::NoSpace => "NO_SPACE",
            ErrorCode::TooManyFiles => "TOO_MANY_FILES",
            ErrorCode::ExtensionNotAllowed => "EXTENSION_NOT_ALLOWED",
            ErrorCode::FileTooLarge => "FILE_TOO_LARGE",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

/// Classified adapter failure
///
/// Every failure surfaced by an adapter carries one of these, whether it is
/// returned inside an [`crate::AdapterResult`] or propagated from a
/// lifecycle call. `retryable` is the only field a retry policy needs.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct AdapterError {
    /// Stable failure code
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
    /// Backend-specific context (status codes, paths, statements)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Whether the caller may retry the same operation later
    pub retryable: bool,
}

impl AdapterError {
    /// Create an error with the code's default retryability.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retryable: code.is_transient(),
        }
    }

    /// Override the retryability flag.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach backend-specific context.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Terminal "not connected" error for pre-dispatch guards.
    pub fn not_connected() -> Self {
        Self::new(ErrorCode::NotConnected, "adapter is not connected")
    }

    /// Terminal error for configuration problems.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, message)
    }

    /// Terminal error for an operation the adapter does not implement.
    pub fn unsupported_operation(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedOperation, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_display_is_screaming_snake() {
        assert_eq!(ErrorCode::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCode::FileNotFound.to_string(), "FILE_NOT_FOUND");
        assert_eq!(ErrorCode::ConnectionLost.to_string(), "CONNECTION_LOST");
    }

    #[test]
    fn transient_codes_default_to_retryable() {
        assert!(AdapterError::new(ErrorCode::Timeout, "t").retryable);
        assert!(AdapterError::new(ErrorCode::RateLimit, "r").retryable);
        assert!(!AdapterError::new(ErrorCode::PathViolation, "p").retryable);
        assert!(!AdapterError::not_connected().retryable);
    }

    #[test]
    fn retryable_override() {
        let err = AdapterError::new(ErrorCode::Internal, "opaque timeout").with_retryable(true);
        assert!(err.retryable);
    }

    #[test]
    fn serializes_code_as_screaming_snake() {
        let err = AdapterError::new(ErrorCode::ExtensionNotAllowed, "bad extension");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "EXTENSION_NOT_ALLOWED");
        assert_eq!(json["retryable"], false);
    }
}
