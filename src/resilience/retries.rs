//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is retryable (status allowlist, transient kinds)
//! - Re-invoke the operation with exponential backoff
//! - Report recovery and exhaustion as log events and metrics
//!
//! Errors without a status (connection failures) are retried. Errors whose
//! status is outside the allowlist propagate on first failure.

use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::BackoffPolicy;

/// Classification hook for errors passed through [`RetryExecutor`].
pub trait RetryableError {
    /// HTTP status carried by the error, if any.
    fn status(&self) -> Option<u16>;

    /// Whether this kind of error may be retried at all.
    fn is_transient(&self) -> bool {
        true
    }
}

/// Retry settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    pub retryable_statuses: HashSet<u16>,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            backoff: BackoffPolicy::from_config(config),
            retryable_statuses: config.retryable_statuses.iter().copied().collect(),
        }
    }

    /// Whether `error` qualifies for another attempt.
    pub fn is_retryable<E: RetryableError>(&self, error: &E) -> bool {
        error.is_transient()
            && error
                .status()
                .map_or(true, |status| self.retryable_statuses.contains(&status))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Attempt counter and current delay for one `execute` call.
#[derive(Debug)]
struct RetryState {
    attempt: u32,
    delay: Duration,
}

/// Runs an async operation, retrying retryable failures with backoff.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying up to `max_retries` attempts in total.
    ///
    /// On exhaustion the last error is returned unchanged.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F, context: &str) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let mut state = RetryState {
            attempt: 0,
            delay: self.policy.backoff.initial_delay,
        };

        loop {
            state.attempt += 1;

            let error = match operation().await {
                Ok(value) => {
                    if state.attempt > 1 {
                        tracing::info!(context = %context, attempts = state.attempt, "Operation succeeded after retry");
                        metrics::record_retry_outcome(context, "recovered");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.policy.is_retryable(&error) {
                tracing::debug!(context = %context, attempt = state.attempt, error = %error, "Error is not retryable");
                return Err(error);
            }

            if state.attempt >= self.policy.max_retries {
                tracing::warn!(
                    context = %context,
                    attempts = state.attempt,
                    error = %error,
                    "Operation failed after all retry attempts"
                );
                metrics::record_retry_outcome(context, "exhausted");
                return Err(error);
            }

            let wait = self.policy.backoff.apply_jitter(state.delay);
            tracing::info!(
                context = %context,
                attempt = state.attempt,
                delay = ?wait,
                status = ?error.status(),
                error = %error,
                "Retrying operation"
            );
            metrics::record_retry_attempt(context);
            tokio::time::sleep(wait).await;
            state.delay = self.policy.backoff.next_delay(state.delay);
        }
    }
}
