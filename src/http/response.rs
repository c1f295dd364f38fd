//! Response handling.
//!
//! # Responsibilities
//! - Map non-2xx responses to structured errors
//! - Parse success bodies by `Content-Type` (JSON vs text)
//! - Wrap the result as `{data, status, headers, request_id}`

use std::collections::BTreeMap;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::http::request::X_REQUEST_ID;

/// Parsed response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

/// A successful API response.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub data: ResponseBody,
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: BTreeMap<String, String>,
    /// Server-echoed `x-request-id`, else the ID sent; cache hits carry the
    /// ID of the call that read them.
    pub request_id: String,
}

impl ApiResponse {
    /// Read a `reqwest` response to completion.
    ///
    /// The request ID is taken from the `x-request-id` response header,
    /// falling back to the one that was sent.
    pub async fn from_response(response: reqwest::Response, sent_request_id: &str) -> TransportResult<Self> {
        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let text = response.text().await.map_err(TransportError::Network)?;

        if !status.is_success() {
            return Err(TransportError::from_error_body(status, &text));
        }

        let content_type = headers.get(CONTENT_TYPE.as_str()).map(String::as_str);
        let data = parse_body(content_type, text)?;
        let request_id = headers
            .get(X_REQUEST_ID)
            .cloned()
            .unwrap_or_else(|| sent_request_id.to_string());

        Ok(Self {
            data,
            status: status.as_u16(),
            headers,
            request_id,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Deserialize the body into `T`.
    ///
    /// Text bodies are parsed as JSON; an empty body is treated as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        let content_type = self.header(CONTENT_TYPE.as_str()).unwrap_or("").to_string();
        let result = match &self.data {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Text(text) => serde_json::from_str(text),
            ResponseBody::Empty => T::deserialize(&Value::Null),
        };
        result.map_err(|source| TransportError::Parse { content_type, source })
    }

    /// The body as text; JSON values are re-serialized.
    pub fn text(&self) -> String {
        match &self.data {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Empty => String::new(),
        }
    }
}

/// Whether a `Content-Type` value declares JSON.
pub fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

/// Parse a success body according to its declared content type.
pub fn parse_body(content_type: Option<&str>, text: String) -> TransportResult<ResponseBody> {
    if text.is_empty() {
        return Ok(ResponseBody::Empty);
    }

    match content_type {
        Some(ct) if is_json_content_type(ct) => serde_json::from_str(&text)
            .map(ResponseBody::Json)
            .map_err(|source| TransportError::Parse {
                content_type: ct.to_string(),
                source,
            }),
        _ => Ok(ResponseBody::Text(text)),
    }
}
