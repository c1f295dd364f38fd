//! Built-in pipeline stages.

use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::http::request::RequestDescriptor;
use crate::pipeline::{Next, Stage, StageFuture};
use crate::resilience::{RateLimiter, RetryExecutor, TimeoutGuard};

/// Serves fresh GET responses from the cache and stores successful ones.
///
/// A hit carries the current call's request ID. Requests that are not
/// cacheable pass straight through.
pub struct CacheStage {
    cache: Arc<ResponseCache>,
}

impl CacheStage {
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self { cache }
    }
}

impl Stage for CacheStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn handle<'a>(&'a self, request: &'a RequestDescriptor, next: Next<'a>) -> StageFuture<'a> {
        Box::pin(async move {
            if !request.is_cacheable() {
                return next.run(request).await;
            }

            let key = request.cache_key();
            if let Some(mut cached) = self.cache.get(&key) {
                tracing::debug!(key = %key, request_id = %request.request_id, "Serving response from cache");
                cached.request_id = request.request_id.clone();
                return Ok(cached);
            }

            let response = next.run(request).await?;
            self.cache.set(key, response.clone());
            Ok(response)
        })
    }
}

/// Waits for sliding-window admission keyed by endpoint.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn handle<'a>(&'a self, request: &'a RequestDescriptor, next: Next<'a>) -> StageFuture<'a> {
        Box::pin(async move {
            if request.rate_limit {
                self.limiter.acquire(&request.endpoint).await;
            }
            next.run(request).await
        })
    }
}

/// Re-runs the rest of the pipeline on retryable failures.
pub struct RetryStage {
    executor: RetryExecutor,
}

impl RetryStage {
    pub fn new(executor: RetryExecutor) -> Self {
        Self { executor }
    }
}

impl Stage for RetryStage {
    fn name(&self) -> &'static str {
        "retry"
    }

    fn handle<'a>(&'a self, request: &'a RequestDescriptor, next: Next<'a>) -> StageFuture<'a> {
        Box::pin(async move {
            if !request.retry {
                return next.run(request).await;
            }
            let context = request.context();
            self.executor.execute(move || next.run(request), &context).await
        })
    }
}

/// Applies the request's deadline to each attempt.
pub struct TimeoutStage {
    guard: TimeoutGuard,
}

impl TimeoutStage {
    pub fn new(guard: TimeoutGuard) -> Self {
        Self { guard }
    }
}

impl Stage for TimeoutStage {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn handle<'a>(&'a self, request: &'a RequestDescriptor, next: Next<'a>) -> StageFuture<'a> {
        Box::pin(async move { self.guard.run(request.timeout, next.run(request)).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::TransportError;
    use crate::http::response::{ApiResponse, ResponseBody};
    use crate::pipeline::{Endpoint, Pipeline};
    use crate::resilience::RetryPolicy;
    use reqwest::header::HeaderMap;
    use reqwest::Method;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    /// Fails with the given statuses in order, then succeeds.
    struct ScriptedEndpoint {
        failures: Vec<u16>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl ScriptedEndpoint {
        fn new(failures: Vec<u16>) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Endpoint for ScriptedEndpoint {
        fn send<'a>(&'a self, request: &'a RequestDescriptor) -> StageFuture<'a> {
            Box::pin(async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                match self.failures.get(n) {
                    Some(&status) => Err(TransportError::Http {
                        status,
                        message: format!("status {status}"),
                        body: None,
                    }),
                    None => Ok(ApiResponse {
                        data: ResponseBody::Text(format!("call {}", n + 1)),
                        status: 200,
                        headers: BTreeMap::new(),
                        request_id: request.request_id.clone(),
                    }),
                }
            })
        }
    }

    fn request(method: Method) -> RequestDescriptor {
        RequestDescriptor {
            method,
            url: url::Url::parse("http://api.test/users").unwrap(),
            endpoint: "/users".into(),
            headers: HeaderMap::new(),
            body: None,
            timeout: Duration::from_secs(5),
            retry: true,
            rate_limit: true,
            cache: true,
            request_id: "req".into(),
        }
    }

    fn fast_retry() -> RetryExecutor {
        RetryExecutor::new(RetryPolicy::from_config(&RetryConfig {
            initial_delay_ms: 5,
            max_delay_ms: 20,
            ..RetryConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_cache_stage_serves_second_get() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![]));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(60), 10));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(CacheStage::new(cache.clone())));

        let first = pipeline.execute(&request(Method::GET)).await.unwrap();
        let second = pipeline.execute(&request(Method::GET)).await.unwrap();

        assert_eq!(endpoint.calls(), 1);
        assert_eq!(first.data, second.data);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_carries_current_request_id() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![]));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(60), 10));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(CacheStage::new(cache)));

        let mut first = request(Method::GET);
        first.request_id = "req-1".into();
        let mut second = request(Method::GET);
        second.request_id = "req-2".into();

        assert_eq!(pipeline.execute(&first).await.unwrap().request_id, "req-1");
        let hit = pipeline.execute(&second).await.unwrap();
        assert_eq!(hit.request_id, "req-2");
        assert_eq!(hit.data, ResponseBody::Text("call 1".into()));
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_stage_ignores_post() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![]));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(60), 10));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(CacheStage::new(cache.clone())));

        pipeline.execute(&request(Method::POST)).await.unwrap();
        pipeline.execute(&request(Method::POST)).await.unwrap();

        assert_eq!(endpoint.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_stage_does_not_store_failures() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![404]));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(60), 10));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(CacheStage::new(cache.clone())));

        assert!(pipeline.execute(&request(Method::GET)).await.is_err());
        assert!(cache.is_empty());
        assert!(pipeline.execute(&request(Method::GET)).await.is_ok());
        assert_eq!(endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_stage_recovers() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![503, 503]));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(RetryStage::new(fast_retry())));

        let response = pipeline.execute(&request(Method::GET)).await.unwrap();
        assert_eq!(response.data, ResponseBody::Text("call 3".into()));
        assert_eq!(endpoint.calls(), 3);
    }

    #[tokio::test]
    async fn test_retry_stage_respects_request_toggle() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![503]));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(RetryStage::new(fast_retry())));

        let mut req = request(Method::GET);
        req.retry = false;
        let err = pipeline.execute(&req).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_inside_retry_applies_per_attempt() {
        let mut endpoint = ScriptedEndpoint::new(vec![]);
        endpoint.delay = Duration::from_millis(200);
        let endpoint = Arc::new(endpoint);

        let pipeline = Pipeline::new(endpoint.clone())
            .with_stage(Arc::new(RetryStage::new(fast_retry())))
            .with_stage(Arc::new(TimeoutStage::new(TimeoutGuard::new(false))));

        let mut req = request(Method::GET);
        req.timeout = Duration::from_millis(30);
        let err = pipeline.execute(&req).await.unwrap_err();

        assert!(err.is_timeout());
        // Plain timeouts are not retried
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_stage_waits() {
        let endpoint = Arc::new(ScriptedEndpoint::new(vec![]));
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(80)));
        let pipeline = Pipeline::new(endpoint.clone()).with_stage(Arc::new(RateLimitStage::new(limiter)));

        let start = Instant::now();
        pipeline.execute(&request(Method::POST)).await.unwrap();
        pipeline.execute(&request(Method::POST)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(70));
        assert_eq!(endpoint.calls(), 2);
    }
}
