//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use identity_gate::auth::enrichment::{BUSINESS_LINE_PATH, BUSINESS_UNIT_PATH};
use identity_gate::auth::exchange::TOKEN_PATH;
use identity_gate::config::{ClientConfig, GateConfig};
use identity_gate::health::Readiness;
use identity_gate::{AuthorizationGate, HttpServer, Metrics, ResilientClient};

/// Client pointed at `url` with the given retry policy.
pub fn client(url: &str, max_retry: u32, retry_delay_ms: u64, metrics: Metrics) -> ResilientClient {
    let config = ClientConfig {
        max_retry,
        retry_delay_ms,
        timeout_ms: 5_000,
        ..ClientConfig::with_url(url)
    };
    ResilientClient::new(&config, metrics).unwrap()
}

/// Gate whose login and reference-data clients never retry.
pub fn gate(login: &MockServer, reference: &MockServer) -> AuthorizationGate {
    AuthorizationGate::from_clients(
        client(&login.uri(), 0, 0, Metrics::noop()),
        client(&reference.uri(), 0, 0, Metrics::noop()),
    )
}

/// The full server router with the gate mounted.
pub fn server_router(login: &MockServer, reference: &MockServer) -> Router {
    let gate = gate(login, reference);
    let readiness = Readiness::new().with_check(std::sync::Arc::new(gate.login().clone()));
    HttpServer::new(
        GateConfig::default(),
        Metrics::noop(),
        None,
        Some(gate),
        readiness,
    )
    .router()
}

/// A URL on which nothing listens.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub async fn mount_login_user(server: &MockServer, user: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(user))
        .mount(server)
        .await;
}

pub async fn mount_reference(server: &MockServer, lines: serde_json::Value, units: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(BUSINESS_LINE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(lines))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(BUSINESS_UNIT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(units))
        .mount(server)
        .await;
}

/// Drive `router` in process.
pub async fn call(router: Router, uri: &str, authorization: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(value) = authorization {
        request = request.header("authorization", value);
    }
    router.oneshot(request.body(Body::empty()).unwrap()).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
