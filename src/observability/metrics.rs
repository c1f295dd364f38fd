//! Metrics collection.
//!
//! # Metrics
//! - `api_requests_total` (counter): calls by method, status, outcome
//! - `api_request_duration_seconds` (histogram): end-to-end call latency
//! - `api_retries_total` (counter): retry attempts and final outcomes by context
//! - `api_cache_events_total` (counter): cache hits, misses, expiries, evictions
//! - `api_cache_size` (gauge): cached response count
//! - `api_rate_limited_total` (counter): calls that had to wait for admission
//!
//! Only the `metrics` facade is used here. Without an installed recorder
//! every call is a no-op.

use std::time::Instant;

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "api_requests_total",
        "method" => method.clone(),
        "status" => status,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("api_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry_attempt(context: &str) {
    metrics::counter!("api_retries_total", "context" => context.to_string(), "event" => "attempt")
        .increment(1);
}

pub fn record_retry_outcome(context: &str, outcome: &'static str) {
    metrics::counter!("api_retries_total", "context" => context.to_string(), "event" => outcome)
        .increment(1);
}

pub fn record_cache_event(event: &'static str) {
    metrics::counter!("api_cache_events_total", "event" => event).increment(1);
}

pub fn record_cache_size(size: usize) {
    metrics::gauge!("api_cache_size").set(size as f64);
}

pub fn record_rate_limited(key: &str) {
    metrics::counter!("api_rate_limited_total", "key" => key.to_string()).increment(1);
}
