//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem found, not just the first.

use std::net::SocketAddr;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{ClientConfig, GateConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address '{}'", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "listener.request_timeout_secs",
            "must be greater than zero",
        ));
    }

    if let Some(auth) = &config.auth {
        validate_client("auth.login_service", &auth.login_service, &mut errors);
        validate_client("auth.member_wrapper", &auth.member_wrapper, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_client(prefix: &str, client: &ClientConfig, errors: &mut Vec<ValidationError>) {
    match Url::parse(&client.url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            format!("{prefix}.url"),
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            format!("{prefix}.url"),
            format!("invalid url '{}': {}", client.url, e),
        )),
    }

    for (name, value) in &client.default_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("{prefix}.default_headers"),
                format!("invalid header name '{name}'"),
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                format!("{prefix}.default_headers.{name}"),
                "invalid header value",
            ));
        }
    }

    if client.root_cas.iter().any(|path| path.trim().is_empty()) {
        errors.push(ValidationError::new(
            format!("{prefix}.root_cas"),
            "empty CA bundle path",
        ));
    }
}
