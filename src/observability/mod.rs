//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stderr via tracing-subscriber (binary)
//!     → whatever recorder / subscriber the embedding application installs
//! ```
//!
//! Every call outcome is logged with URL, method, request id and status or
//! error. These events stand in for the per-request analytics hook.

pub mod logging;
pub mod metrics;
