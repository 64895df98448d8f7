//! Transport abstraction for payload delivery.
//!
//! Separates the dispatcher core from the wire so delivery logic can be
//! tested against deterministic doubles. Production code uses the
//! reqwest-backed [`HttpTransport`](crate::client::HttpTransport).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Delivers one serialized payload to the fixed remote target.
///
/// An `Ok` response means the remote endpoint answered, whatever the HTTP
/// status; an `Err` means the payload never produced a response (connection
/// failure, timeout, cancellation). Implementations must keep each call
/// independent: one failed delivery must not affect another.
#[async_trait]
pub trait DeliveryTransport: Send + Sync + std::fmt::Debug {
    /// Sends the payload and waits for the remote response.
    async fn deliver(&self, payload: Bytes) -> Result<DeliveryResponse>;
}

/// Response received for one delivered payload.
#[derive(Debug, Clone)]
pub struct DeliveryResponse {
    /// HTTP status code returned by the endpoint.
    pub status_code: u16,
    /// Response body (truncated if oversized).
    pub body: String,
    /// Total duration of the request.
    pub duration: Duration,
    /// Whether the endpoint reported success (2xx status).
    pub is_success: bool,
}
