//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint + RequestOptions
//!     → request.rs (URL join, header merge, request ID → RequestDescriptor)
//!     → [pipeline stages]
//!     → endpoint.rs (reqwest send, full body read)
//!     → response.rs (status check, Content-Type parsing → ApiResponse)
//! ```

pub mod endpoint;
pub mod request;
pub mod response;

pub use endpoint::HttpEndpoint;
pub use request::{RequestDescriptor, RequestOptions, X_REQUEST_ID};
pub use response::{ApiResponse, ResponseBody};
