//! Integration tests for the HTTP delivery transport.
//!
//! Runs against a local wiremock server to verify request shape, response
//! capture, and transport error classification. Any HTTP response counts as
//! a completed delivery; only connect failures and timeouts are errors.

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use pacer::{ClientConfig, DeliveryTransport, DispatchError, Dispatcher, DispatcherConfig, HttpTransport};
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn payload() -> Bytes {
    Bytes::from_static(br#"{"id":1,"sku":"SKU-0001","quantity":2}"#)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
        )
        .with_test_writer()
        .try_init();
}

fn build_transport(config: ClientConfig) -> Result<HttpTransport> {
    init_tracing();
    Ok(HttpTransport::new(config)?)
}

#[tokio::test]
async fn delivers_payload_and_captures_response() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/ingest"))
        .and(matchers::header("content-type", "application/json"))
        .and(matchers::header_exists("X-Pacer-Delivery-Id"))
        .and(matchers::body_string_contains("SKU-0001"))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .expect(1)
        .mount(&server)
        .await;

    let transport = build_transport(ClientConfig::new(format!("{}/ingest", server.uri())))?;
    let response = transport.deliver(payload()).await?;

    assert_eq!(response.status_code, 200);
    assert!(response.is_success);
    assert_eq!(response.body, "accepted");

    Ok(())
}

#[tokio::test]
async fn non_success_status_is_still_a_delivered_response() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let transport = build_transport(ClientConfig::new(server.uri()))?;
    let response = transport.deliver(payload()).await?;

    assert_eq!(response.status_code, 503);
    assert!(!response.is_success);
    assert_eq!(response.body, "busy");

    Ok(())
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() -> Result<()> {
    // Discard port: nothing is listening.
    let mut config = ClientConfig::new("http://127.0.0.1:9/ingest");
    config.timeout = Duration::from_secs(2);
    let transport = build_transport(config)?;

    let err = transport.deliver(payload()).await.unwrap_err();
    assert!(err.is_transport_failure());

    Ok(())
}

#[tokio::test]
async fn slow_endpoint_times_out() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let mut config = ClientConfig::new(server.uri());
    config.timeout = Duration::from_millis(200);
    let transport = build_transport(config)?;

    let err = transport.deliver(payload()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Timeout { .. }));
    assert!(err.is_transport_failure());

    Ok(())
}

#[tokio::test]
async fn dispatcher_delivers_queued_documents_over_http() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(5)
        .mount(&server)
        .await;

    init_tracing();
    let config =
        DispatcherConfig::new(2, Duration::from_millis(100), format!("{}/documents", server.uri()));
    let dispatcher = Dispatcher::<serde_json::Value>::new(config)?;

    for id in 0..5 {
        dispatcher.submit(&serde_json::json!({ "id": id }))?;
    }

    // Three ticks (t=0, 100ms, 200ms) cover all five documents; poll
    // rather than assume exact timing under load.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let received = server.received_requests().await.map_or(0, |requests| requests.len());
        if received >= 5 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "only {received} of 5 deliveries arrived before the deadline"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let undelivered = dispatcher.shutdown()?;
    assert!(undelivered.is_empty());
    server.verify().await;

    Ok(())
}
