//! Retry, cancellation and metrics behaviour of the resilient client.

use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use identity_gate::http::ClientError;
use identity_gate::Metrics;

mod common;

#[tokio::test]
async fn test_retries_server_errors_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&server)
        .await;

    let client = common::client(&server.uri(), 2, 10, Metrics::noop());
    let response = client.get("/flaky", HeaderMap::new(), None).await.unwrap();

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), "done");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_final_failure_is_returned_after_max_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let client = common::client(&server.uri(), 2, 5, Metrics::noop());
    let response = client.get("/down", HeaderMap::new(), None).await.unwrap();
    assert_eq!(response.status_code(), 503);
}

#[tokio::test]
async fn test_no_retry_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server.uri(), 0, 10, Metrics::noop());
    let response = client.get("/", HeaderMap::new(), None).await.unwrap();
    assert_eq!(response.status_code(), 500);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = common::client(&server.uri(), 3, 5, Metrics::noop());
    let response = client.get("/missing", HeaderMap::new(), None).await.unwrap();
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_cancel_stops_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = common::client(&server.uri(), 5, 10_000, Metrics::noop());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .get("/", HeaderMap::new(), Some(&cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_interrupts_in_flight_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = common::client(&server.uri(), 0, 0, Metrics::noop());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .get("/slow", HeaderMap::new(), Some(&cancel))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_transport_errors_are_retried() {
    let url = common::closed_port_url().await;
    let (metrics, handle) = Metrics::prometheus().unwrap();
    let client = common::client(&url, 2, 5, metrics);

    let err = client.get("/", HeaderMap::new(), None).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));

    let rendered = handle.render();
    let total = rendered
        .lines()
        .find(|line| line.starts_with("http_outbound_requests_total{"))
        .unwrap();
    assert!(total.ends_with(" 3"), "{total}");
    assert!(rendered.contains("http_outbound_requests_error_total{"));
}

#[tokio::test]
async fn test_default_headers_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("x-client", "gate"))
        .and(header("x-trace", "per-call"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = identity_gate::config::ClientConfig::with_url(server.uri());
    config.default_headers.insert("x-client".into(), "gate".into());
    config.default_headers.insert("x-trace".into(), "default".into());
    let client = identity_gate::ResilientClient::new(&config, Metrics::noop()).unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-trace", HeaderValue::from_static("per-call"));
    let response = client
        .post("/token", headers, Bytes::from_static(b"payload"), None)
        .await
        .unwrap();

    assert_eq!(response.status_code(), 201);
    assert_eq!(response.request.url.path(), "/token");
    assert_eq!(response.request.headers["x-client"], "gate");
}

#[tokio::test]
async fn test_status_metrics_carry_code_label() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (metrics, handle) = Metrics::prometheus().unwrap();
    let client = common::client(&server.uri(), 0, 0, metrics);
    client.delete("/item", HeaderMap::new(), None).await.unwrap();

    let rendered = handle.render();
    assert!(rendered.contains("http_outbound_requests_status_total{"));
    assert!(rendered.contains("code=\"204\""));
    assert!(rendered.contains("method=\"delete\""));
    assert!(rendered.contains("http_outbound_request_duration_seconds_bucket{"));
}
