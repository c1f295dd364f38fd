//! Request construction.
//!
//! # Responsibilities
//! - Resolve endpoints against the base URL (absolute URLs pass through)
//! - Merge default, caller and bearer-token headers
//! - Attach a unique request ID
//! - Freeze everything into an immutable [`RequestDescriptor`]

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::cache::CacheKey;
use crate::error::{TransportError, TransportResult};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Per-call overrides supplied by the caller.
///
/// Unset toggles fall back to the configured request defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub retry: Option<bool>,
    pub rate_limit: Option<bool>,
    pub cache: Option<bool>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, enabled: bool) -> Self {
        self.retry = Some(enabled);
        self
    }

    pub fn rate_limit(mut self, enabled: bool) -> Self {
        self.rate_limit = Some(enabled);
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }
}

/// Everything needed to execute one logical call. Built fresh per call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    /// Endpoint as given by the caller; the rate-limit key.
    pub endpoint: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    pub timeout: Duration,
    pub retry: bool,
    pub rate_limit: bool,
    pub cache: bool,
    pub request_id: String,
}

impl RequestDescriptor {
    /// Only GET requests with caching enabled touch the cache.
    pub fn is_cacheable(&self) -> bool {
        self.cache && self.method == Method::GET
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.method.clone(), &self.url)
    }

    /// Label used in logs and retry metrics, e.g. `GET /users`.
    pub fn context(&self) -> String {
        format!("{} {}", self.method, self.endpoint)
    }
}

/// Resolve `endpoint` against `base_url` and append query parameters.
///
/// `http://` and `https://` endpoints are used as-is; anything else is
/// appended to the base URL with exactly one `/` between them.
pub fn build_url(base_url: &str, endpoint: &str, query: &[(String, String)]) -> TransportResult<Url> {
    let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    };

    let mut url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))?;
    if !query.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    Ok(url)
}

/// Parse a list of `(name, value)` pairs into a header map.
pub fn parse_headers<'a, I>(pairs: I) -> TransportResult<HeaderMap>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidHeader(format!("{}: {e}", name.as_str())))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Layer caller headers over defaults, then add the bearer token and request ID.
///
/// A caller-supplied `Authorization` header is left untouched.
pub fn merge_headers(
    defaults: &HeaderMap,
    caller: &[(String, String)],
    token: Option<&str>,
    request_id: &str,
) -> TransportResult<HeaderMap> {
    let mut headers = defaults.clone();

    let overrides = parse_headers(caller.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    for (name, value) in overrides.iter() {
        headers.insert(name.clone(), value.clone());
    }

    if let Some(token) = token.filter(|t| !t.is_empty()) {
        if !headers.contains_key(AUTHORIZATION) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::InvalidHeader(format!("authorization: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
    }

    let request_id = HeaderValue::from_str(request_id)
        .map_err(|e| TransportError::InvalidHeader(format!("{X_REQUEST_ID}: {e}")))?;
    headers.insert(X_REQUEST_ID, request_id);

    Ok(headers)
}
