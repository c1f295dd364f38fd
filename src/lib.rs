//! Resilient HTTP API transport.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──▶ ApiTransport::request
//!                    │
//!                    ▼
//!            ┌───────────────┐    ┌──────────────┐    ┌─────────────┐    ┌──────────────┐
//!            │  CacheStage   │───▶│RateLimitStage│───▶│ RetryStage  │───▶│ TimeoutStage │──▶ HttpEndpoint ──▶ API
//!            │ (GET, TTL)    │    │(per endpoint)│    │(backoff)    │    │(per attempt) │
//!            └───────────────┘    └──────────────┘    └─────────────┘    └──────────────┘
//!
//!     Cross-cutting: config (TOML + env), session (bearer token),
//!                    observability (tracing + metrics facade)
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod resilience;
pub mod session;
pub mod transport;

pub use config::schema::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use http::{ApiResponse, RequestOptions, ResponseBody};
pub use transport::{ApiTransport, ApiTransportBuilder};
