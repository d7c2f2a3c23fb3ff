//! Structured logging.
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to
//! this crate and `tower_http`.

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter for the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(config))
}

/// Filter from `log_level` alone. Unparseable levels fall back to `error`.
fn configured_filter(config: &ObservabilityConfig) -> EnvFilter {
    let level = parse_level(&config.log_level)
        .unwrap_or(Level::ERROR)
        .as_str()
        .to_ascii_lowercase();
    EnvFilter::new(format!("identity_gate={level},tower_http={level}"))
}

fn parse_level(raw: &str) -> Option<Level> {
    raw.trim().parse().ok()
}

/// Must pass the `error` fallback filter, so it is emitted at `error`.
fn report_level_fallback(config: &ObservabilityConfig) {
    if parse_level(&config.log_level).is_none() {
        tracing::error!(
            log_level = %config.log_level,
            "unable to parse log level, logging level is set to error"
        );
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(config: &ObservabilityConfig) {
    let installed = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        report_level_fallback(config);
    }
}
