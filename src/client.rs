//! HTTP transport for payload delivery with configurable timeouts.
//!
//! Posts serialized documents to the single configured endpoint and
//! categorizes transport errors for per-item failure reporting.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::{
    error::{DispatchError, Result},
    transport::{DeliveryResponse, DeliveryTransport},
};

/// Configuration for the HTTP delivery transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Destination URL every payload is posted to.
    pub endpoint_url: String,
    /// Timeout for each HTTP request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
    /// Content type sent with each payload.
    pub content_type: String,
}

impl ClientConfig {
    /// Creates a config for the given endpoint with default timeouts.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "Pacer-Dispatch/1.0".to_string(),
            max_redirects: 3,
            content_type: "application/json".to_string(),
        }
    }
}

/// HTTP transport backed by a pooled reqwest client.
///
/// Each delivery is one POST of the payload to the configured endpoint.
/// Deliveries are fully independent: the client is shared for connection
/// pooling, but a failed request never affects another in flight.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Creates a new HTTP transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Configuration` if the underlying HTTP client
    /// cannot be built with the provided settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()
            .map_err(|e| {
                DispatchError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Returns the configuration this transport was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl DeliveryTransport for HttpTransport {
    async fn deliver(&self, payload: Bytes) -> Result<DeliveryResponse> {
        let start = std::time::Instant::now();
        let delivery_id = Uuid::new_v4();

        let span = info_span!(
            "request_delivery",
            delivery_id = %delivery_id,
            url = %self.config.endpoint_url,
            bytes = payload.len()
        );

        async move {
            let response = match self
                .client
                .post(&self.config.endpoint_url)
                .header("content-type", &self.config.content_type)
                .header("X-Pacer-Delivery-Id", delivery_id.to_string())
                .body(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let duration = start.elapsed();
                    tracing::warn!(duration_ms = duration.as_millis() as u64, "request failed: {e}");

                    if e.is_timeout() {
                        return Err(DispatchError::timeout(self.config.timeout.as_secs()));
                    }
                    if e.is_connect() {
                        return Err(DispatchError::network(format!("connection failed: {e}")));
                    }
                    return Err(DispatchError::network(e.to_string()));
                },
            };

            let duration = start.elapsed();
            let status_code = response.status().as_u16();
            let is_success = response.status().is_success();

            match status_code {
                200..=299 => tracing::debug!(status = status_code, "payload delivered"),
                400..=499 => tracing::warn!(status = status_code, "client error response"),
                500..=599 => tracing::warn!(status = status_code, "server error response"),
                _ => tracing::warn!(status = status_code, "unexpected status code"),
            }

            let body = read_body(response).await;

            Ok(DeliveryResponse { status_code, body, duration, is_success })
        }
        .instrument(span)
        .await
    }
}

/// Reads the response body, truncating oversized payloads.
async fn read_body(response: reqwest::Response) -> String {
    const MAX_RESPONSE_BODY_SIZE: usize = 64 * 1024;

    match response.bytes().await {
        Ok(bytes) if bytes.len() > MAX_RESPONSE_BODY_SIZE => {
            let truncated = String::from_utf8_lossy(&bytes[..MAX_RESPONSE_BODY_SIZE]);
            format!("{truncated}... (truncated)")
        },
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("failed to read response body: {e}");
            format!("[failed to read response body: {e}]")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("https://api.example.com/documents");

        assert_eq!(config.endpoint_url, "https://api.example.com/documents");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.content_type, "application/json");
        assert_eq!(config.max_redirects, 3);
    }

    #[test]
    fn transport_builds_from_config() {
        let transport = HttpTransport::new(ClientConfig::new("http://localhost:8080/ingest"));
        assert!(transport.is_ok());
    }
}
