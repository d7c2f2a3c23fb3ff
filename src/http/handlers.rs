//! Operational endpoints and the identity echo behind the gate.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::auth::rejection::ErrorBody;
use crate::auth::user::{Info, User};
use crate::health::Readiness;
use crate::observability::Metrics;

/// State shared by the operational handlers.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Metrics,
    pub prometheus: Option<PrometheusHandle>,
    pub readiness: Readiness,
    pub started: Instant,
    pub debug: bool,
}

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub debug: bool,
}

/// Identity as seen by a protected handler.
#[derive(Debug, Serialize)]
pub struct IdentityView {
    #[serde(rename = "userInfo")]
    pub info: Vec<Info>,
    #[serde(rename = "expTime")]
    pub expiry: i64,
    #[serde(rename = "chpRoles")]
    pub roles: Vec<String>,
    #[serde(rename = "businessLines")]
    pub business_lines: Vec<String>,
    #[serde(rename = "businessUnits")]
    pub business_units: Vec<i64>,
}

impl From<User> for IdentityView {
    fn from(user: User) -> Self {
        Self {
            info: user.info,
            expiry: user.expiry,
            roles: user.roles,
            business_lines: user.business_lines,
            business_units: user.business_units,
        }
    }
}

pub async fn health() -> Html<&'static str> {
    Html("OK")
}

pub async fn info(State(state): State<AppState>) -> Json<BuildInfo> {
    Json(BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        debug: state.debug,
    })
}

pub async fn ready(State(state): State<AppState>) -> Response {
    match state.readiness.check_all().await {
        Ok(()) => Html("OK").into_response(),
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody { error: &reason }),
        )
            .into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn me(request: Request<Body>) -> Json<IdentityView> {
    Json(User::from_extensions(request.extensions()).into())
}
