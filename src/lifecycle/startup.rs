//! Startup orchestration.
//!
//! # Order
//! metrics registry → authorization gate → readiness checks → listener →
//! server. Any failure before the listener is bound is fatal.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::auth::AuthorizationGate;
use crate::config::GateConfig;
use crate::health::{ReadyCheck, Readiness};
use crate::http::{ClientBuildError, HttpServer};
use crate::lifecycle::Shutdown;
use crate::observability::Metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to set up metrics: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] ClientBuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Assemble the server from configuration without binding anything.
pub fn build_server(config: GateConfig) -> Result<HttpServer, StartupError> {
    let (metrics, prometheus) = if config.observability.metrics_enabled {
        let (metrics, handle) = Metrics::prometheus()?;
        (metrics, Some(handle))
    } else {
        (Metrics::noop(), None)
    };

    let gate = config
        .auth
        .as_ref()
        .map(|auth| AuthorizationGate::new(auth, metrics.clone()))
        .transpose()?;

    let login_check = gate
        .as_ref()
        .map(|gate| Arc::new(gate.login().clone()) as Arc<dyn ReadyCheck>);
    let readiness = Readiness::new().with_optional(login_check);

    match &gate {
        Some(_) => tracing::info!("authorization gate enabled"),
        None => tracing::warn!("no auth section configured, protected routes are not mounted"),
    }

    Ok(HttpServer::new(config, metrics, prometheus, gate, readiness))
}

/// Build, bind and serve until Ctrl-C or SIGTERM.
pub async fn run(config: GateConfig) -> Result<(), StartupError> {
    let address = config.listener.bind_address.clone();
    let server = build_server(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, receiver).await.map_err(StartupError::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}
