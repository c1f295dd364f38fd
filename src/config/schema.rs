//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the transport.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the API transport.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransportConfig {
    /// Target API settings (base URL, static headers).
    pub api: ApiConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Client-side rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Response cache configuration.
    pub cache: CacheConfig,

    /// Bearer token lookup.
    pub auth: AuthConfig,

    /// Per-request toggles applied when the caller leaves them unset.
    pub defaults: RequestDefaults,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Target API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL that relative endpoints are joined onto.
    pub base_url: String,

    /// Headers sent with every request, before caller headers.
    pub default_headers: BTreeMap<String, String>,

    /// User-Agent sent with every request.
    pub user_agent: String,

    /// Ignore system proxy settings.
    pub no_proxy: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            default_headers: BTreeMap::new(),
            user_agent: concat!("api-transport/", env!("CARGO_PKG_VERSION")).to_string(),
            no_proxy: false,
        }
    }
}

/// Timeout configuration for outgoing requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-attempt deadline in milliseconds.
    pub request_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 30_000,
            connect_ms: 10_000,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,

    /// HTTP statuses that may be retried.
    pub retryable_statuses: Vec<u16>,

    /// Classify timeouts as 408 so they follow the status allowlist.
    pub retry_on_timeout: bool,

    /// Add 0-10% random jitter on top of each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
            retry_on_timeout: false,
            jitter: false,
        }
    }
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per key inside one window.
    pub max_requests: usize,

    /// Length of the trailing window in milliseconds.
    pub time_window_ms: u64,

    /// Maximum number of tracked keys.
    pub max_keys: usize,
}

impl RateLimitConfig {
    pub fn time_window(&self) -> Duration {
        Duration::from_millis(self.time_window_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            time_window_ms: 1_000,
            max_keys: 1_024,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live for cached GET responses in seconds.
    pub ttl_secs: u64,

    /// Maximum number of cached responses.
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300, // 5 minutes
            max_entries: 1_000,
        }
    }
}

/// Where the bearer token comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session store key holding the bearer token.
    pub token_key: String,

    /// JSON file backing the session store. In-memory when unset.
    pub session_file: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_key: "token".to_string(),
            session_file: None,
        }
    }
}

/// Default per-request toggles.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestDefaults {
    pub retry: bool,
    pub rate_limit: bool,
    pub cache: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            retry: true,
            rate_limit: true,
            cache: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
