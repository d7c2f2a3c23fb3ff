//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the identity gate service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Inbound listener settings.
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Login service and reference-data clients.
    ///
    /// When absent the protected routes and the login readiness probe
    /// are not registered.
    pub auth: Option<AuthConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Total time allowed for an inbound request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name reported by `/info` and attached to log lines.
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Debug mode, reported by `/info`.
    pub debug: bool,

    /// Expose the `/metrics` endpoint.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "identity-gate".to_string(),
            log_level: "info".to_string(),
            debug: false,
            metrics_enabled: true,
        }
    }
}

/// Remote services the authorization middleware talks to.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuthConfig {
    /// Token exchange endpoint owner.
    pub login_service: ClientConfig,

    /// Reference-data service serving business lines and units.
    pub member_wrapper: ClientConfig,
}

/// Outbound HTTP client configuration.
///
/// Zero values mean "no limit" for the timeout and pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every relative request path is resolved against.
    pub url: String,

    /// Overall call timeout in milliseconds, including reading the body.
    pub timeout_ms: u64,

    /// How long an idle keep-alive connection stays pooled, in milliseconds.
    pub idle_connection_timeout_ms: u64,

    /// Accept any server certificate and host name.
    pub insecure_skip_verify: bool,

    /// Concurrent connections allowed per host. Callers wait when reached.
    pub max_connections_per_host: usize,

    /// Idle connections kept across all hosts.
    pub max_idle_connections: usize,

    /// Idle connections kept per host.
    pub max_idle_connections_per_host: usize,

    /// Headers merged into every call. Per-call headers win.
    pub default_headers: BTreeMap<String, String>,

    /// Retries after the first attempt for retryable outcomes.
    pub max_retry: u32,

    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,

    /// PEM bundles of additional trusted roots.
    pub root_cas: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost".to_string(),
            timeout_ms: 10_000,
            idle_connection_timeout_ms: 90_000,
            insecure_skip_verify: false,
            max_connections_per_host: 0,
            max_idle_connections: 100,
            max_idle_connections_per_host: 10,
            default_headers: BTreeMap::new(),
            max_retry: 0,
            retry_delay_ms: 0,
            root_cas: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Convenience constructor used by tests and tooling.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        non_zero_millis(self.timeout_ms)
    }

    pub fn idle_connection_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.idle_connection_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
