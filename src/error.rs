//! Transport error definitions.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::resilience::retries::RetryableError;

/// Errors that can occur while executing an API call.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request failed before any response was received.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// The attempt exceeded its deadline and was aborted.
    #[error("Request aborted after {timeout_ms} ms timeout")]
    Timeout { timeout_ms: u64, retryable: bool },

    /// The body did not match its declared content type.
    #[error("Failed to parse {content_type} response: {source}")]
    Parse {
        content_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// The request body could not be serialized.
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The session store could not be opened.
    #[error("Session store error: {0}")]
    Session(#[source] std::io::Error),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Build an HTTP error from a non-2xx status and its raw body.
    ///
    /// The message is the `message` field of a JSON body when present,
    /// otherwise the status line (e.g. `503 Service Unavailable`).
    pub fn from_error_body(status: StatusCode, text: &str) -> Self {
        let body = serde_json::from_str::<Value>(text).ok();
        let message = body
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| status.to_string());

        TransportError::Http {
            status: status.as_u16(),
            message,
            body,
        }
    }

    /// HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            TransportError::Timeout { retryable: true, .. } => Some(StatusCode::REQUEST_TIMEOUT.as_u16()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "network",
            TransportError::Http { .. } => "http",
            TransportError::Timeout { .. } => "timeout",
            TransportError::Parse { .. } => "parse",
            TransportError::Serialize(_) => "serialize",
            TransportError::InvalidUrl(_) => "invalid_url",
            TransportError::InvalidHeader(_) => "invalid_header",
            TransportError::Session(_) => "session",
        }
    }
}

impl RetryableError for TransportError {
    fn status(&self) -> Option<u16> {
        TransportError::status(self)
    }

    fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) | TransportError::Http { .. } => true,
            TransportError::Timeout { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
