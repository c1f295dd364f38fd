//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and URLs and
//! returns every problem it finds, not just the first.

use thiserror::Error;
use url::Url;

use crate::config::schema::TransportConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &TransportConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "api.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("api.base_url", e.to_string())),
    }

    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::new("timeouts.request_ms", "must be greater than 0"));
    }
    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::new("timeouts.connect_ms", "must be greater than 0"));
    }

    let retries = &config.retries;
    if retries.max_retries == 0 {
        errors.push(ValidationError::new("retries.max_retries", "must allow at least one attempt"));
    }
    if !retries.backoff_factor.is_finite() || retries.backoff_factor < 1.0 {
        errors.push(ValidationError::new("retries.backoff_factor", "must be a finite number >= 1.0"));
    }
    if retries.initial_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.initial_delay_ms",
            format!("{} exceeds max_delay_ms {}", retries.initial_delay_ms, retries.max_delay_ms),
        ));
    }
    for status in &retries.retryable_statuses {
        if !(100..=599).contains(status) {
            errors.push(ValidationError::new(
                "retries.retryable_statuses",
                format!("{} is not an HTTP status", status),
            ));
        }
    }

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
    }
    if config.rate_limit.time_window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.time_window_ms", "must be greater than 0"));
    }
    if config.rate_limit.max_keys == 0 {
        errors.push(ValidationError::new("rate_limit.max_keys", "must be greater than 0"));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than 0"));
    }
    if config.cache.max_entries == 0 {
        errors.push(ValidationError::new("cache.max_entries", "must be greater than 0"));
    }

    if config.auth.token_key.is_empty() {
        errors.push(ValidationError::new("auth.token_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
