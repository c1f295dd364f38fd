//! TTL-bounded response cache.

use std::time::Duration;

use dashmap::DashMap;
use reqwest::Method;
use tokio::time::Instant;
use url::Url;

use crate::config::CacheConfig;
use crate::http::response::ApiResponse;
use crate::observability::metrics;

/// Cache key: request method plus the full URL, query included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
}

impl CacheKey {
    pub fn new(method: Method, url: &Url) -> Self {
        Self {
            method,
            url: url.as_str().to_string(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A cached response and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: ApiResponse,
    pub timestamp: Instant,
}

impl CacheEntry {
    /// Fresh while `now - timestamp <= ttl`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.timestamp) <= ttl
    }
}

/// A thread-safe, size-bounded TTL cache for successful responses.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries)
    }

    /// Return a fresh entry, removing it if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<ApiResponse> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                metrics::record_cache_event("hit");
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            let ttl = self.ttl;
            self.entries.remove_if(key, |_, entry| !entry.is_fresh(now, ttl));
            tracing::debug!(key = %key, "Cache entry expired");
            metrics::record_cache_event("expired");
            metrics::record_cache_size(self.entries.len());
        } else {
            metrics::record_cache_event("miss");
        }
        None
    }

    /// Store `data` under `key`, stamped with the current instant.
    pub fn set(&self, key: CacheKey, data: ApiResponse) {
        let now = Instant::now();
        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }
        self.entries.insert(key, CacheEntry { data, timestamp: now });
        metrics::record_cache_size(self.entries.len());
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        metrics::record_cache_size(self.entries.len());
        removed
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
        metrics::record_cache_size(0);
        tracing::debug!("Response cache cleared");
    }

    /// Drop all expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        let removed = before.saturating_sub(self.entries.len());
        metrics::record_cache_size(self.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn make_room(&self, now: Instant) {
        if self.entries.len() < self.max_entries {
            return;
        }

        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.is_fresh(now, ttl));
        if self.entries.len() < self.max_entries {
            return;
        }

        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().timestamp)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            metrics::record_cache_event("evicted");
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::ResponseBody;
    use std::collections::BTreeMap;

    fn response(n: i64) -> ApiResponse {
        ApiResponse {
            data: ResponseBody::Json(serde_json::json!({ "n": n })),
            status: 200,
            headers: BTreeMap::new(),
            request_id: format!("req-{n}"),
        }
    }

    fn key(path: &str) -> CacheKey {
        CacheKey::new(Method::GET, &Url::parse(&format!("http://api.test{path}")).unwrap())
    }

    #[test]
    fn test_cache_operations() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10);
        assert!(cache.get(&key("/users")).is_none());

        cache.set(key("/users"), response(1));
        assert_eq!(cache.get(&key("/users")).unwrap().request_id, "req-1");
        assert_eq!(cache.len(), 1);

        cache.set(key("/users"), response(2));
        assert_eq!(cache.get(&key("/users")).unwrap().request_id, "req-2");
        assert_eq!(cache.len(), 1);

        assert!(cache.invalidate(&key("/users")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_includes_method_and_query() {
        let url = Url::parse("http://api.test/users?page=2").unwrap();
        assert_ne!(CacheKey::new(Method::GET, &url), CacheKey::new(Method::POST, &url));
        assert_ne!(key("/users?page=1"), key("/users?page=2"));
        assert_eq!(key("/users").to_string(), "GET http://api.test/users");
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed_on_read() {
        let cache = ResponseCache::new(Duration::from_millis(30), 10);
        cache.set(key("/users"), response(1));
        assert!(cache.get(&key("/users")).is_some());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get(&key("/users")).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = ResponseCache::new(Duration::from_millis(30), 10);
        cache.set(key("/a"), response(1));
        cache.set(key("/b"), response(2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.set(key("/c"), response(3));

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key("/c")).is_some());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.set(key("/a"), response(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.set(key("/b"), response(2));
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.set(key("/c"), response(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("/a")).is_none());
        assert!(cache.get(&key("/b")).is_some());
        assert!(cache.get(&key("/c")).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::default();
        cache.set(key("/a"), response(1));
        cache.set(key("/b"), response(2));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.ttl(), Duration::from_secs(300));
    }
}
