//! Operation and connection results

use crate::AdapterError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Metadata attached to every operation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Verb name (e.g. `query`, `read`, `get`)
    pub operation: String,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: u64,
    /// Completion timestamp
    pub timestamp: DateTime<Utc>,
}

impl OperationMetadata {
    /// Build metadata from a verb name and elapsed duration.
    pub fn new(operation: impl Into<String>, elapsed: std::time::Duration) -> Self {
        Self {
            operation: operation.into(),
            execution_time_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}

/// Uniform outcome of one `execute` call
///
/// Invariant: `success == error.is_none() == data.is_some()`. `execute`
/// never propagates an error any other way, so callers branch on `success`
/// without knowing which backend they talked to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterResult {
    /// Whether the operation succeeded
    pub success: bool,
    /// Operation payload, present iff `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Classified failure, present iff `!success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AdapterError>,
    /// Always-present execution metadata
    pub metadata: OperationMetadata,
}

impl AdapterResult {
    /// Successful result.
    pub fn ok(data: Value, metadata: OperationMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata,
        }
    }

    /// Failed result.
    pub fn fail(error: AdapterError, metadata: OperationMetadata) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            metadata,
        }
    }

    /// Convert into a `Result` for callers that prefer `?`.
    pub fn into_result(self) -> crate::Result<Value> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

/// Outcome of one `connect` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionResult {
    /// Whether a session was established
    pub success: bool,
    /// Opaque per-session token, present iff `success`; never reused
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<Uuid>,
    /// Backend-specific session context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Classified failure, present iff `!success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AdapterError>,
}

impl ConnectionResult {
    /// Session established.
    pub fn established(connection_id: Uuid) -> Self {
        Self {
            success: true,
            connection_id: Some(connection_id),
            metadata: None,
            error: None,
        }
    }

    /// Session established, with backend context.
    pub fn established_with(connection_id: Uuid, metadata: Value) -> Self {
        Self {
            success: true,
            connection_id: Some(connection_id),
            metadata: Some(metadata),
            error: None,
        }
    }

    /// Session refused.
    pub fn refused(error: AdapterError) -> Self {
        Self {
            success: false,
            connection_id: None,
            metadata: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use std::time::Duration;

    #[test]
    fn result_invariant_holds() {
        let meta = OperationMetadata::new("query", Duration::from_millis(12));
        let ok = AdapterResult::ok(serde_json::json!({"rows": []}), meta.clone());
        assert!(ok.success && ok.data.is_some() && ok.error.is_none());

        let fail = AdapterResult::fail(AdapterError::not_connected(), meta);
        assert!(!fail.success && fail.data.is_none() && fail.error.is_some());
    }

    #[test]
    fn into_result_maps_both_arms() {
        let meta = OperationMetadata::new("read", Duration::from_millis(1));
        let ok = AdapterResult::ok(Value::from(7), meta.clone());
        assert_eq!(ok.into_result().unwrap(), Value::from(7));

        let err = AdapterResult::fail(AdapterError::new(ErrorCode::Timeout, "slow"), meta)
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Timeout);
    }

    #[test]
    fn connection_result_carries_fresh_id() {
        let a = ConnectionResult::established(Uuid::new_v4());
        let b = ConnectionResult::established(Uuid::new_v4());
        assert_ne!(a.connection_id, b.connection_id);
        assert!(a.success);

        let refused = ConnectionResult::refused(AdapterError::invalid_config("bad"));
        assert!(!refused.success);
        assert!(refused.connection_id.is_none());
    }
}
