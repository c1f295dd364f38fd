//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! One logical API call:
//!     → rate_limit.rs (wait for sliding-window admission)
//!     → retries.rs (re-run failed attempts with backoff.rs delays)
//!     → timeouts.rs (deadline per attempt, abort on expiry)
//! ```
//!
//! Each piece is usable on its own and is wired into the transport as a
//! pipeline stage.

pub mod backoff;
pub mod rate_limit;
pub mod retries;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use rate_limit::RateLimiter;
pub use retries::{RetryExecutor, RetryPolicy, RetryableError};
pub use timeouts::TimeoutGuard;
