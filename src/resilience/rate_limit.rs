//! Sliding-window rate limiter keyed by endpoint.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Admission instants for one key, oldest first.
#[derive(Debug, Default)]
struct RateWindow {
    admitted: VecDeque<Instant>,
}

impl RateWindow {
    /// Drop instants that have aged out of the trailing window.
    fn prune(&mut self, now: Instant, span: Duration) {
        while let Some(&oldest) = self.admitted.front() {
            if now.duration_since(oldest) >= span {
                self.admitted.pop_front();
            } else {
                break;
            }
        }
    }

    fn newest(&self) -> Option<Instant> {
        self.admitted.back().copied()
    }
}

/// Per-key sliding-window limiter.
///
/// A key admits at most `max_requests` requests within any trailing
/// `time_window`. At most `max_keys` windows are tracked.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    max_requests: usize,
    time_window: Duration,
    max_keys: usize,
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self::with_capacity(max_requests, time_window, RateLimitConfig::default().max_keys)
    }

    pub fn with_capacity(max_requests: usize, time_window: Duration, max_keys: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: max_requests.max(1),
            time_window,
            max_keys: max_keys.max(1),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_capacity(config.max_requests, config.time_window(), config.max_keys)
    }

    /// Admit or reject a request without waiting.
    ///
    /// Records the admission instant when the request is admitted.
    pub fn check_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        if !self.windows.contains_key(key) {
            self.make_room(now);
        }

        let mut window = self.windows.entry(key.to_string()).or_default();
        window.prune(now, self.time_window);

        if window.admitted.len() < self.max_requests {
            window.admitted.push_back(now);
            true
        } else {
            false
        }
    }

    /// Time until the oldest admission in a full window ages out.
    ///
    /// `None` when the key has room right now.
    pub fn time_until_reset(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut window = self.windows.get_mut(key)?;
        window.prune(now, self.time_window);

        if window.admitted.len() < self.max_requests {
            return None;
        }
        let oldest = *window.admitted.front()?;
        Some((oldest + self.time_window).saturating_duration_since(now))
    }

    /// Wait until the oldest admission for `key` falls outside the window.
    ///
    /// Returns immediately when the window has room. Does not admit.
    pub async fn wait_for_reset(&self, key: &str) {
        if let Some(wait) = self.time_until_reset(key) {
            tracing::debug!(key = %key, wait = ?wait, "Rate limit reached, waiting for window reset");
            tokio::time::sleep(wait).await;
        }
    }

    /// Wait until `key` admits a request, then record it.
    pub async fn acquire(&self, key: &str) {
        let mut throttled = false;
        while !self.check_limit(key) {
            if !throttled {
                metrics::record_rate_limited(key);
                throttled = true;
            }
            self.wait_for_reset(key).await;
        }
    }

    /// Forget the window for `key`.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    /// Keep the key count below `max_keys` before a new key is inserted.
    fn make_room(&self, now: Instant) {
        if self.windows.len() < self.max_keys {
            return;
        }

        let span = self.time_window;
        self.windows.retain(|_, window| {
            window.prune(now, span);
            !window.admitted.is_empty()
        });

        if self.windows.len() < self.max_keys {
            return;
        }

        // Prefer a window with spare capacity; evicting a full one re-admits its key early
        let max_requests = self.max_requests;
        let stalest = |saturated: bool| {
            self.windows
                .iter()
                .filter(|entry| (entry.value().admitted.len() >= max_requests) == saturated)
                .min_by_key(|entry| entry.value().newest())
                .map(|entry| entry.key().clone())
        };

        if let Some(key) = stalest(false) {
            tracing::debug!(key = %key, "Evicting rate limit window");
            self.windows.remove(&key);
        } else if let Some(key) = stalest(true) {
            tracing::warn!(key = %key, max_keys = self.max_keys, "Evicting saturated rate limit window");
            self.windows.remove(&key);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
