//! Identity gate
//!
//! Fronts protected routes with bearer-token authorization.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                IDENTITY GATE                 │
//!                         │                                              │
//!   Client Request        │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ──────────────────────┼─▶│  http    │──▶│  auth    │──▶│ handler  │  │
//!                         │  │  server  │   │  gate    │   │          │  │
//!                         │  └──────────┘   └────┬─────┘   └──────────┘  │
//!                         │                      │                       │
//!                         │          ┌───────────┴───────────┐           │
//!                         │          ▼                       ▼           │
//!                         │   ┌─────────────┐        ┌──────────────┐    │
//!                         │   │ login       │        │ reference    │    │
//!                         │   │ exchange    │        │ data fan-out │    │
//!                         │   └──────┬──────┘        └──────┬───────┘    │
//!                         │          └────── resilient ─────┘            │
//!                         │                  client                      │──▶ upstreams
//!                         │                                              │
//!                         │  config · observability · health · lifecycle │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use identity_gate::config::{load_config, GateConfig};
use identity_gate::lifecycle::startup;
use identity_gate::observability::logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "identity-gate", version, about = "Bearer-token authorization gate")]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(
        service = %config.observability.service_name,
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.listener.request_timeout_secs,
        auth = config.auth.is_some(),
        "Configuration loaded"
    );

    startup::run(config).await?;
    Ok(())
}
