//! The API transport.
//!
//! # Responsibilities
//! - Turn `(method, endpoint, body, options)` into a [`RequestDescriptor`]
//! - Run it through the pipeline (cache → rate limit → retry → timeout → HTTP)
//! - Emit one structured event and one request metric per call
//!
//! Construct one transport per process or session and pass it to consumers.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::http::endpoint::HttpEndpoint;
use crate::http::request::{build_url, merge_headers, parse_headers, RequestDescriptor, RequestOptions};
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::pipeline::{CacheStage, Endpoint, Pipeline, RateLimitStage, RetryStage, Stage, TimeoutStage};
use crate::resilience::{RateLimiter, RetryExecutor, RetryPolicy, TimeoutGuard};
use crate::session::{FileSessionStore, MemorySessionStore, SessionStore};

/// Resilient HTTP API client.
pub struct ApiTransport {
    config: TransportConfig,
    default_headers: HeaderMap,
    session: Arc<dyn SessionStore>,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    pipeline: Pipeline,
}

impl ApiTransport {
    /// Build a transport with the HTTP endpoint and the configured session store.
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: TransportConfig) -> ApiTransportBuilder {
        ApiTransportBuilder {
            config,
            session: None,
            endpoint: None,
            extra_stages: Vec::new(),
        }
    }

    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> TransportResult<ApiResponse> {
        self.request(Method::GET, endpoint, None, options).await
    }

    pub async fn post<B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> TransportResult<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = to_body(body)?;
        self.request(Method::POST, endpoint, body, options).await
    }

    pub async fn put<B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> TransportResult<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = to_body(body)?;
        self.request(Method::PUT, endpoint, body, options).await
    }

    pub async fn patch<B>(&self, endpoint: &str, body: &B, options: RequestOptions) -> TransportResult<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = to_body(body)?;
        self.request(Method::PATCH, endpoint, body, options).await
    }

    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> TransportResult<ApiResponse> {
        self.request(Method::DELETE, endpoint, None, options).await
    }

    /// Execute one logical call with an explicit method.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> TransportResult<ApiResponse> {
        let start = Instant::now();

        let request = match self.describe(method.clone(), endpoint, body, options) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, method = %method, error = %e, "Failed to build API request");
                metrics::record_request(method.as_str(), 0, e.kind(), start);
                return Err(e);
            }
        };

        let result = self.pipeline.execute(&request).await;
        report(&request, &result, start);
        result
    }

    /// Build the immutable descriptor for one call.
    pub fn describe(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> TransportResult<RequestDescriptor> {
        let request_id = Uuid::new_v4().to_string();
        let url = build_url(&self.config.api.base_url, endpoint, &options.query)?;
        let token = self.token();
        let headers = merge_headers(&self.default_headers, &options.headers, token.as_deref(), &request_id)?;
        let defaults = &self.config.defaults;

        Ok(RequestDescriptor {
            method,
            url,
            endpoint: endpoint.to_string(),
            headers,
            body,
            timeout: options.timeout.unwrap_or_else(|| self.config.timeouts.request()),
            retry: options.retry.unwrap_or(defaults.retry),
            rate_limit: options.rate_limit.unwrap_or(defaults.rate_limit),
            cache: options.cache.unwrap_or(defaults.cache),
            request_id,
        })
    }

    /// Current bearer token from the session store.
    pub fn token(&self) -> Option<String> {
        self.session.get(&self.config.auth.token_key)
    }

    /// Store the bearer token sent on subsequent calls.
    pub fn set_token(&self, token: &str) -> TransportResult<()> {
        self.session
            .set(&self.config.auth.token_key, token)
            .map_err(TransportError::Session)
    }

    pub fn clear_token(&self) -> TransportResult<()> {
        self.session
            .remove(&self.config.auth.token_key)
            .map_err(TransportError::Session)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn session(&self) -> &dyn SessionStore {
        self.session.as_ref()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl std::fmt::Debug for ApiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTransport")
            .field("base_url", &self.config.api.base_url)
            .field("pipeline", &self.pipeline)
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// Builder for [`ApiTransport`] with replaceable collaborators.
pub struct ApiTransportBuilder {
    config: TransportConfig,
    session: Option<Arc<dyn SessionStore>>,
    endpoint: Option<Arc<dyn Endpoint>>,
    extra_stages: Vec<Arc<dyn Stage>>,
}

impl ApiTransportBuilder {
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    /// Replace the HTTP endpoint.
    pub fn endpoint(mut self, endpoint: Arc<dyn Endpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Add a stage after the built-in ones, directly in front of the endpoint.
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.extra_stages.push(stage);
        self
    }

    pub fn build(self) -> TransportResult<ApiTransport> {
        let config = self.config;

        let mut pairs: Vec<(&str, &str)> = vec![(CONTENT_TYPE.as_str(), "application/json")];
        pairs.extend(
            config
                .api
                .default_headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        let default_headers = parse_headers(pairs)?;

        let session: Arc<dyn SessionStore> = match (self.session, &config.auth.session_file) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileSessionStore::load_from_file(path).map_err(TransportError::Session)?),
            (None, None) => Arc::new(MemorySessionStore::new()),
        };

        let endpoint: Arc<dyn Endpoint> = match self.endpoint {
            Some(endpoint) => endpoint,
            None => Arc::new(HttpEndpoint::new(&config)?),
        };

        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let cache = Arc::new(ResponseCache::from_config(&config.cache));
        let executor = RetryExecutor::new(RetryPolicy::from_config(&config.retries));
        let guard = TimeoutGuard::new(config.retries.retry_on_timeout);

        let mut pipeline = Pipeline::new(endpoint)
            .with_stage(Arc::new(CacheStage::new(cache.clone())))
            .with_stage(Arc::new(RateLimitStage::new(rate_limiter.clone())))
            .with_stage(Arc::new(RetryStage::new(executor)))
            .with_stage(Arc::new(TimeoutStage::new(guard)));
        for stage in self.extra_stages {
            pipeline.push(stage);
        }

        tracing::debug!(
            base_url = %config.api.base_url,
            stages = ?pipeline.stage_names(),
            "API transport initialized"
        );

        Ok(ApiTransport {
            config,
            default_headers,
            session,
            rate_limiter,
            cache,
            pipeline,
        })
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> TransportResult<Option<Value>> {
    let value = serde_json::to_value(body).map_err(TransportError::Serialize)?;
    Ok(match value {
        Value::Null => None,
        other => Some(other),
    })
}

/// Structured per-call event plus request metric.
fn report(request: &RequestDescriptor, result: &TransportResult<ApiResponse>, start: Instant) {
    let method = request.method.as_str();
    match result {
        Ok(response) => {
            tracing::info!(
                request_id = %request.request_id,
                method = %method,
                url = %request.url,
                status = response.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "API request completed"
            );
            metrics::record_request(method, response.status, "success", start);
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request.request_id,
                method = %method,
                url = %request.url,
                status = ?e.status(),
                error = %e,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "API request failed"
            );
            metrics::record_request(method, e.status().unwrap_or(0), e.kind(), start);
        }
    }
}
