//! Network endpoint backed by `reqwest`.

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::http::request::RequestDescriptor;
use crate::http::response::ApiResponse;
use crate::pipeline::{Endpoint, StageFuture};

/// Sends requests over HTTP and reads the full response body.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
}

impl HttpEndpoint {
    pub fn new(config: &TransportConfig) -> TransportResult<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .user_agent(config.api.user_agent.clone());
        if config.api.no_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(TransportError::Network)?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Endpoint for HttpEndpoint {
    fn send<'a>(&'a self, request: &'a RequestDescriptor) -> StageFuture<'a> {
        Box::pin(async move {
            tracing::debug!(
                request_id = %request.request_id,
                method = %request.method,
                url = %request.url,
                "Sending request"
            );

            let mut builder = self
                .client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone());
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(TransportError::Network)?;
            ApiResponse::from_response(response, &request.request_id).await
        })
    }
}
