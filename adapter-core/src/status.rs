//! Health snapshots and counter tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform health snapshot
///
/// `connection_count` counts successful connects for session-oriented
/// adapters (database, HTTP); the file-system adapter has no persistent
/// session, so it additionally counts successful operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterStatus {
    /// Whether a session is currently established
    pub connected: bool,
    /// Timestamp of the last connect, operation, or probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    /// Successful connect (and, for file system, operation) count
    pub connection_count: u64,
    /// Failed connect and operation count
    pub error_count: u64,
    /// Last recorded probe/operation latency in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Adapter-specific context (pool sizing, base path, window state)
    pub metadata: Value,
}

/// Plain-field counter state shared by all adapters
///
/// Single-owner per adapter instance; not atomic. Adapters that must be
/// shared across callers go behind the registry's lock instead.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    connection_count: u64,
    error_count: u64,
    last_activity: Option<DateTime<Utc>>,
    latency_ms: Option<u64>,
}

impl StatusTracker {
    /// Fresh tracker with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful connect (or, for sessionless adapters, a
    /// successful operation).
    pub fn record_connect(&mut self) {
        self.connection_count += 1;
        self.touch();
    }

    /// Record a failed connect or operation.
    pub fn record_error(&mut self) {
        self.error_count += 1;
        self.touch();
    }

    /// Record an observed round-trip latency.
    pub fn record_latency(&mut self, latency: std::time::Duration) {
        self.latency_ms = Some(latency.as_millis() as u64);
    }

    /// Bump the activity timestamp without touching counters.
    pub fn touch(&mut self) {
        self.last_activity = Some(Utc::now());
    }

    /// Successful connect/operation count so far.
    pub fn connection_count(&self) -> u64 {
        self.connection_count
    }

    /// Failure count so far.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Build a snapshot. No I/O; latency is whatever was last recorded.
    pub fn snapshot(&self, connected: bool, metadata: Value) -> AdapterStatus {
        AdapterStatus {
            connected,
            last_activity: self.last_activity,
            connection_count: self.connection_count,
            error_count: self.error_count,
            latency_ms: self.latency_ms,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tracker_counts_and_snapshots() {
        let mut tracker = StatusTracker::new();
        assert_eq!(tracker.connection_count(), 0);

        tracker.record_connect();
        tracker.record_connect();
        tracker.record_error();
        tracker.record_latency(Duration::from_millis(35));

        let status = tracker.snapshot(true, Value::Null);
        assert!(status.connected);
        assert_eq!(status.connection_count, 2);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.latency_ms, Some(35));
        assert!(status.last_activity.is_some());
    }

    #[test]
    fn snapshot_reflects_disconnect() {
        let mut tracker = StatusTracker::new();
        tracker.record_connect();
        let status = tracker.snapshot(false, Value::Null);
        assert!(!status.connected);
        assert_eq!(status.connection_count, 1);
    }
}
