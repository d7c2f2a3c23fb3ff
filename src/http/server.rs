//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the operational handlers
//! - Mount protected routes behind the authorization gate
//! - Wire up middleware (panic recovery, CORS, limits, timeout, request ID,
//!   tracing, inbound metrics)
//! - Serve on a bound listener until shutdown is triggered

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::{authorize, AuthorizationGate};
use crate::config::GateConfig;
use crate::health::Readiness;
use crate::http::handlers::{self, AppState};
use crate::observability::Metrics;

/// HTTP server fronting the protected routes.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// `/v1/me` is mounted only when a gate is supplied, `/metrics` only
    /// when a Prometheus handle is.
    pub fn new(
        config: GateConfig,
        metrics: Metrics,
        prometheus: Option<PrometheusHandle>,
        gate: Option<AuthorizationGate>,
        readiness: Readiness,
    ) -> Self {
        let state = AppState {
            metrics,
            prometheus,
            readiness,
            started: Instant::now(),
            debug: config.observability.debug,
        };

        let router = Self::build_router(&config, state, gate);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState, gate: Option<AuthorizationGate>) -> Router {
        let mut router = Router::new()
            .route("/health", get(handlers::health))
            .route("/info", get(handlers::info))
            .route("/ready", get(handlers::ready));

        if state.prometheus.is_some() {
            router = router.route("/metrics", get(handlers::metrics));
        }

        if let Some(gate) = gate {
            let protected = Router::new()
                .route("/v1/me", get(handlers::me))
                .route_layer(middleware::from_fn_with_state(gate, authorize));
            router = router.merge(protected);
        }

        let metrics = state.metrics.clone();
        router
            .with_state(state)
            .layer(middleware::from_fn_with_state(metrics, track_requests))
            .layer(CatchPanicLayer::new())
            .layer(CorsLayer::permissive())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal is broadcast.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

/// Inbound request metrics, labelled by matched route.
async fn track_requests(State(metrics): State<Metrics>, req: Request<Body>, next: Next) -> Response {
    let handler = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().as_str().to_owned();

    let _in_flight = metrics.inbound_started();
    let started = Instant::now();
    let response = next.run(req).await;
    metrics.inbound_finished(&handler, &method, response.status().as_u16(), started.elapsed());
    response
}
