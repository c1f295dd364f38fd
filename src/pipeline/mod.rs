//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → CacheStage      (GET hit returns early; success stored)
//!     → RateLimitStage  (sliding-window admission per endpoint)
//!     → RetryStage      (re-runs everything below on retryable failure)
//!     → TimeoutStage    (deadline per attempt)
//!     → Endpoint        (network call + body parsing)
//! ```
//!
//! Each [`Stage`] receives the request and a [`Next`] handle for the rest of
//! the pipeline, in the same shape as an axum `middleware::Next`. A stage
//! may call `next.run` zero, one or many times.

pub mod stages;

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::TransportResult;
use crate::http::request::RequestDescriptor;
use crate::http::response::ApiResponse;

pub use stages::{CacheStage, RateLimitStage, RetryStage, TimeoutStage};

/// Future returned by stages and endpoints.
pub type StageFuture<'a> = BoxFuture<'a, TransportResult<ApiResponse>>;

/// Terminal element of the pipeline: performs the actual call.
pub trait Endpoint: Send + Sync {
    fn send<'a>(&'a self, request: &'a RequestDescriptor) -> StageFuture<'a>;
}

/// One middleware element wrapping the rest of the pipeline.
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle<'a>(&'a self, request: &'a RequestDescriptor, next: Next<'a>) -> StageFuture<'a>;
}

/// The remainder of the pipeline after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Run the remaining stages, ending at the endpoint.
    pub fn run(self, request: &'a RequestDescriptor) -> StageFuture<'a> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                request,
                Next {
                    stages: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => self.endpoint.send(request),
        }
    }
}

/// Ordered list of stages in front of an endpoint.
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    endpoint: Arc<dyn Endpoint>,
}

impl Pipeline {
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self {
            stages: Vec::new(),
            endpoint,
        }
    }

    /// Append a stage; it runs after every stage added before it.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn push(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn execute(&self, request: &RequestDescriptor) -> TransportResult<ApiResponse> {
        let next = Next {
            stages: self.stages.as_slice(),
            endpoint: self.endpoint.as_ref(),
        };
        next.run(request).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
