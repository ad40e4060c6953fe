//! Caller-side retry helper
//!
//! Adapters never retry internally; the error taxonomy's `retryable` flag
//! exists so callers can. This helper is the canonical consumer: it re-runs
//! an operation while failures stay retryable, backing off exponentially.

use crate::AdapterResult;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Re-run `operation` until it succeeds, fails terminally, or the attempt
/// budget is spent. Returns the last result either way.
///
/// The backoff schedule is `2^attempt` seconds, capped at 64s.
pub async fn retry_with_backoff<F, Fut>(max_attempts: u32, mut operation: F) -> AdapterResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AdapterResult>,
{
    let mut attempt: u32 = 0;
    loop {
        let result = operation().await;
        if result.success {
            return result;
        }

        let retryable = result.error.as_ref().map(|e| e.retryable).unwrap_or(false);
        attempt += 1;
        if !retryable || attempt >= max_attempts {
            return result;
        }

        let delay = Duration::from_secs(2u64.pow(attempt.min(6)));
        debug!(
            attempt,
            max_attempts,
            delay_secs = delay.as_secs(),
            operation = %result.metadata.operation,
            "retrying after transient failure"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdapterError, ErrorCode, OperationMetadata};
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn meta() -> OperationMetadata {
        OperationMetadata::new("query", Duration::from_millis(1))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(5, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    AdapterResult::fail(AdapterError::new(ErrorCode::Timeout, "slow"), meta())
                } else {
                    AdapterResult::ok(Value::from("done"), meta())
                }
            }
        })
        .await;

        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_failure_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                AdapterResult::fail(
                    AdapterError::new(ErrorCode::PathViolation, "escape attempt"),
                    meta(),
                )
            }
        })
        .await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_budget_is_honored() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                AdapterResult::fail(AdapterError::new(ErrorCode::RateLimit, "window full"), meta())
            }
        })
        .await;

        assert!(!result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.error.unwrap().code, ErrorCode::RateLimit);
    }
}
