//! Timeout enforcement.
//!
//! Every attempt runs under a deadline. When it fires, the in-flight future
//! is dropped, which aborts the underlying request, and the caller gets
//! [`TransportError::Timeout`].

use std::future::Future;
use std::time::Duration;

use crate::error::{TransportError, TransportResult};

/// Deadline guard for a single network attempt.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    /// Report expiry as retryable (status 408).
    retry_on_timeout: bool,
}

impl TimeoutGuard {
    pub fn new(retry_on_timeout: bool) -> Self {
        Self { retry_on_timeout }
    }

    /// Run `future`, aborting it after `timeout`.
    pub async fn run<T, F>(&self, timeout: Duration, future: F) -> TransportResult<T>
    where
        F: Future<Output = TransportResult<T>>,
    {
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(timeout_ms, "Request timed out, aborting");
                Err(TransportError::Timeout {
                    timeout_ms,
                    retryable: self.retry_on_timeout,
                })
            }
        }
    }
}

impl Default for TimeoutGuard {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let guard = TimeoutGuard::default();
        let result = guard
            .run(Duration::from_millis(200), async { Ok::<_, TransportError>(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_aborts_slow_future() {
        let guard = TimeoutGuard::default();
        let result: TransportResult<u32> = guard
            .run(Duration::from_millis(20), async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;

        match result {
            Err(TransportError::Timeout { timeout_ms, retryable }) => {
                assert_eq!(timeout_ms, 20);
                assert!(!retryable);
            }
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_retryable_mapping() {
        let guard = TimeoutGuard::new(true);
        let err = guard
            .run(Duration::from_millis(5), std::future::pending::<TransportResult<()>>())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(408));
    }
}
