//! Resilient outbound HTTP client.
//!
//! # Responsibilities
//! - Resolve relative paths against a configured base URL
//! - Merge default headers into every call (per-call headers win)
//! - Retry transport failures and 5xx responses with a fixed delay
//! - Honour caller cancellation during attempts and between them
//! - Record per-attempt metrics on the injected registry
//!
//! # Design Decisions
//! - Bodies are fully buffered; callers receive a [`Response`], never a stream
//! - Request bodies are `Bytes`, so every attempt resends the original payload
//! - The pooled transport is shared by clones; clones are cheap

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Method};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::ClientConfig;
use crate::http::response::{RequestSummary, Response};
use crate::observability::Metrics;
use crate::resilience::retries::{is_retryable, RetryPolicy};

/// Errors raised while constructing a client.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("invalid base url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("invalid default header '{name}'")]
    InvalidHeader { name: String },

    #[error("unable to read ca bundle '{path}': {source}")]
    CaBundleRead {
        path: String,
        source: std::io::Error,
    },

    #[error("unable to add ca bundle '{path}'")]
    CaBundleInvalid { path: String },

    #[error("unable to build http transport: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors raised by a single call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid request path '{path}': {source}")]
    InvalidUrl {
        path: String,
        source: url::ParseError,
    },

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("request canceled")]
    Cancelled,
}

impl ClientError {
    /// Transport failures retry unless the deadline expired.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(e) => !e.is_timeout(),
            ClientError::InvalidUrl { .. } | ClientError::Cancelled => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(e) if e.is_timeout())
    }
}

/// Per-host connection cap. Zero means unlimited.
#[derive(Debug, Default)]
struct HostLimits {
    per_host: usize,
    semaphores: DashMap<String, Arc<Semaphore>>,
}

impl HostLimits {
    fn new(per_host: usize) -> Self {
        Self {
            per_host,
            semaphores: DashMap::new(),
        }
    }

    /// Waits while the host is at its cap.
    async fn acquire(&self, host: &str) -> Option<OwnedSemaphorePermit> {
        if self.per_host == 0 {
            return None;
        }
        let semaphore = self
            .semaphores
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .clone();
        semaphore.acquire_owned().await.ok()
    }
}

/// HTTP client with pooling, retries, cancellation and metrics.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    http: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    retry: RetryPolicy,
    limits: Arc<HostLimits>,
    metrics: Metrics,
}

impl ResilientClient {
    /// Build a client from configuration.
    ///
    /// Every configured CA bundle must be readable and contain at least one
    /// certificate.
    pub fn new(config: &ClientConfig, metrics: Metrics) -> Result<Self, ClientBuildError> {
        let base_url = Url::parse(&config.url).map_err(|source| ClientBuildError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;
        let default_headers = header_map(&config.default_headers)?;

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .pool_idle_timeout(config.idle_connection_timeout())
            .pool_max_idle_per_host(idle_per_host(config));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        for certificate in load_root_cas(&config.root_cas)? {
            builder = builder.add_root_certificate(certificate);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            default_headers,
            retry: RetryPolicy::new(config.max_retry, config.retry_delay()),
            limits: Arc::new(HostLimits::new(config.max_connections_per_host)),
            metrics,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers merged into every call.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Issue a call, retrying per the client's policy.
    ///
    /// A fired `cancel` token ends the call promptly with
    /// [`ClientError::Cancelled`] and no further attempts.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<Bytes>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| ClientError::InvalidUrl {
                path: path.to_string(),
                source,
            })?;
        let headers = self.merge_headers(headers);

        let mut outcome = self.attempt(&method, &url, &headers, body.as_ref(), cancel).await;
        let mut retries = 0;
        while self.retry.allows(retries, &outcome) {
            if retries == 0 {
                let (code, error) = describe(&outcome);
                tracing::warn!(url = %url, code = ?code, error = ?error, "Error with request. Retrying...");
            }
            with_cancel(cancel, tokio::time::sleep(self.retry.delay)).await?;
            retries += 1;
            outcome = self.attempt(&method, &url, &headers, body.as_ref(), cancel).await;
        }

        if retries > 0 && is_retryable(&outcome) {
            let (code, error) = describe(&outcome);
            tracing::warn!(url = %url, code = ?code, error = ?error, retries, "Max retries reached");
        }
        outcome
    }

    pub async fn get(
        &self,
        path: &str,
        headers: HeaderMap,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        self.send(Method::GET, path, headers, None, cancel).await
    }

    pub async fn head(
        &self,
        path: &str,
        headers: HeaderMap,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        self.send(Method::HEAD, path, headers, None, cancel).await
    }

    pub async fn delete(
        &self,
        path: &str,
        headers: HeaderMap,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        self.send(Method::DELETE, path, headers, None, cancel).await
    }

    pub async fn post(
        &self,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        self.send(Method::POST, path, headers, Some(body), cancel).await
    }

    pub async fn put(
        &self,
        path: &str,
        headers: HeaderMap,
        body: Bytes,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        self.send(Method::PUT, path, headers, Some(body), cancel).await
    }

    fn merge_headers(&self, mut headers: HeaderMap) -> HeaderMap {
        for (name, value) in &self.default_headers {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Bytes>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response, ClientError> {
        with_cancel(cancel, self.round_trip(method, url, headers, body)).await?
    }

    async fn round_trip(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Bytes>,
    ) -> Result<Response, ClientError> {
        let host = host_label(url);
        let verb = method.as_str();
        let _permit = self.limits.acquire(&host).await;
        let _in_flight = self.metrics.outbound_started(verb, &host);

        let start = Instant::now();
        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(body) = body {
            request = request.body(body.clone());
        }

        tracing::debug!(method = %method, url = %url, "sending outbound request");
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.outbound_error(verb, &host);
                return Err(ClientError::Transport(e));
            }
        };

        let status = response.status();
        self.metrics.outbound_status(verb, &host, status.as_u16());
        let version = response.version();
        let response_headers = response.headers().clone();
        let content_length = response.content_length();

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                self.metrics.outbound_error(verb, &host);
                return Err(ClientError::Transport(e));
            }
        };
        let duration = start.elapsed();
        self.metrics.outbound_duration(verb, &host, duration);

        Ok(Response {
            status,
            version,
            headers: response_headers,
            body,
            content_length,
            duration,
            request: RequestSummary {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
            },
        })
    }
}

/// Run `fut` unless `cancel` fires first.
async fn with_cancel<F: Future>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> Result<F::Output, ClientError> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled),
            output = fut => Ok(output),
        },
        None => Ok(fut.await),
    }
}

fn describe(outcome: &Result<Response, ClientError>) -> (Option<u16>, Option<String>) {
    match outcome {
        Ok(response) => (Some(response.status_code()), None),
        Err(e) => (None, Some(e.to_string())),
    }
}

/// `host[:port]` as used in metric labels.
fn host_label(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

fn idle_per_host(config: &ClientConfig) -> usize {
    let limit = |n: usize| if n == 0 { usize::MAX } else { n };
    limit(config.max_idle_connections_per_host).min(limit(config.max_idle_connections))
}

fn header_map(raw: &BTreeMap<String, String>) -> Result<HeaderMap, ClientBuildError> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let invalid = || ClientBuildError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

fn load_root_cas(paths: &[String]) -> Result<Vec<Certificate>, ClientBuildError> {
    let mut certificates = Vec::new();
    for path in paths.iter().filter(|p| !p.is_empty()) {
        let invalid = || ClientBuildError::CaBundleInvalid { path: path.clone() };
        let pem = std::fs::read(path).map_err(|source| ClientBuildError::CaBundleRead {
            path: path.clone(),
            source,
        })?;
        let ders = rustls_pemfile::certs(&mut pem.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        if ders.is_empty() {
            return Err(invalid());
        }
        for der in ders {
            certificates.push(Certificate::from_der(der.as_ref()).map_err(|_| invalid())?);
        }
    }
    Ok(certificates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(config: &ClientConfig) -> ResilientClient {
        ResilientClient::new(config, Metrics::noop()).unwrap()
    }

    #[test]
    fn test_invalid_base_url_fails_construction() {
        let err = ResilientClient::new(&ClientConfig::with_url("::nope"), Metrics::noop()).unwrap_err();
        assert!(matches!(err, ClientBuildError::InvalidUrl { .. }));
    }

    #[test]
    fn test_unreadable_ca_bundle_fails_construction() {
        let mut config = ClientConfig::with_url("https://login.test");
        config.root_cas = vec!["/definitely/missing/ca.pem".to_string()];
        let err = ResilientClient::new(&config, Metrics::noop()).unwrap_err();
        assert!(matches!(err, ClientBuildError::CaBundleRead { .. }));
    }

    #[test]
    fn test_ca_bundle_without_certificates_fails_construction() {
        let path = std::env::temp_dir().join(format!("identity-gate-ca-{}.pem", std::process::id()));
        std::fs::write(&path, "not a certificate\n").unwrap();

        let mut config = ClientConfig::with_url("https://login.test");
        config.root_cas = vec![path.display().to_string()];
        let err = ResilientClient::new(&config, Metrics::noop()).unwrap_err();
        let _ = std::fs::remove_file(&path);

        assert_eq!(
            err.to_string(),
            format!("unable to add ca bundle '{}'", path.display())
        );
    }

    #[test]
    fn test_per_call_headers_win_over_defaults() {
        let mut config = ClientConfig::with_url("http://login.test");
        config.default_headers.insert("x-client".into(), "gate".into());
        config.default_headers.insert("accept".into(), "application/json".into());
        let client = client(&config);

        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("text/plain"));
        let merged = client.merge_headers(headers);

        assert_eq!(merged["accept"], "text/plain");
        assert_eq!(merged["x-client"], "gate");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_host_label_keeps_explicit_port() {
        assert_eq!(host_label(&Url::parse("http://refdata:8080/v2").unwrap()), "refdata:8080");
        assert_eq!(host_label(&Url::parse("https://refdata/v2").unwrap()), "refdata");
    }

    #[test]
    fn test_idle_limits_take_the_tighter_bound() {
        let mut config = ClientConfig::with_url("http://login.test");
        config.max_idle_connections = 4;
        config.max_idle_connections_per_host = 10;
        assert_eq!(idle_per_host(&config), 4);
        config.max_idle_connections = 0;
        config.max_idle_connections_per_host = 0;
        assert_eq!(idle_per_host(&config), usize::MAX);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let client = client(&ClientConfig::with_url("http://127.0.0.1:1"));
        let token = CancellationToken::new();
        token.cancel();
        let err = client
            .get("/token", HeaderMap::new(), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
    }

    #[tokio::test]
    async fn test_host_limit_blocks_at_cap() {
        let limits = HostLimits::new(1);
        let held = limits.acquire("refdata").await;
        assert!(held.is_some());
        let waiting = tokio::time::timeout(std::time::Duration::from_millis(20), limits.acquire("refdata")).await;
        assert!(waiting.is_err());
        drop(held);
        assert!(limits.acquire("refdata").await.is_some());
    }

    #[tokio::test]
    async fn test_queued_call_is_not_in_flight() {
        let (metrics, handle) = Metrics::prometheus().unwrap();
        let mut config = ClientConfig::with_url("http://127.0.0.1:1");
        config.max_connections_per_host = 1;
        let client = ResilientClient::new(&config, metrics).unwrap();

        let held = client.limits.acquire("127.0.0.1:1").await;
        assert!(held.is_some());

        let queued = tokio::spawn({
            let client = client.clone();
            async move { client.get("/token", HeaderMap::new(), None).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let rendered = handle.render();
        assert!(
            !rendered.contains("http_outbound_requests_in_flight{"),
            "{rendered}"
        );
        assert!(!rendered.contains("http_outbound_requests_total{"));

        queued.abort();
        drop(held);
    }
}
