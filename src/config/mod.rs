//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → TransportConfig (validated, immutable)
//!     → consumed once by ApiTransport::new
//! ```
//!
//! All fields have defaults, so a minimal file (or no file) is enough.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    ApiConfig, AuthConfig, CacheConfig, ObservabilityConfig, RateLimitConfig, RequestDefaults,
    RetryConfig, TimeoutConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
