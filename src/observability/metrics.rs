//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_outbound_requests_in_flight` (gauge): outbound calls in progress
//! - `http_outbound_requests_total` (counter): outbound attempts
//! - `http_outbound_requests_status_total` (counter): attempts by status code
//! - `http_outbound_requests_error_total` (counter): transport failures
//! - `http_outbound_request_duration_seconds` (histogram): attempt latency
//! - `http_requests_in_flight` (gauge): inbound requests in progress
//! - `http_requests_total` (counter): inbound requests by handler, code, method
//! - `http_request_duration_seconds` (histogram): inbound latency
//!
//! # Design Decisions
//! - The registry is an explicit value handed to clients and the server;
//!   no process-wide recorder is installed
//! - Tests use the no-op registry or a private Prometheus recorder

use std::sync::Arc;
use std::time::Duration;

use metrics::{Counter, Gauge, Histogram, Key, Label, Level, Metadata, NoopRecorder, Recorder};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const OUTBOUND_IN_FLIGHT: &str = "http_outbound_requests_in_flight";
pub const OUTBOUND_TOTAL: &str = "http_outbound_requests_total";
pub const OUTBOUND_STATUS: &str = "http_outbound_requests_status_total";
pub const OUTBOUND_ERRORS: &str = "http_outbound_requests_error_total";
pub const OUTBOUND_DURATION: &str = "http_outbound_request_duration_seconds";

pub const INBOUND_IN_FLIGHT: &str = "http_requests_in_flight";
pub const INBOUND_TOTAL: &str = "http_requests_total";
pub const INBOUND_DURATION: &str = "http_request_duration_seconds";

/// Histogram buckets shared by inbound and outbound latency.
pub const LATENCY_BUCKETS: [f64; 11] = [0.01, 0.05, 0.1, 0.2, 0.4, 1.0, 3.0, 8.0, 20.0, 60.0, 120.0];

/// Metrics registry handed to every component that records.
#[derive(Clone)]
pub struct Metrics {
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl Metrics {
    pub fn new<R>(recorder: R) -> Self
    where
        R: Recorder + Send + Sync + 'static,
    {
        let metrics = Self {
            recorder: Arc::new(recorder),
        };
        metrics.describe();
        metrics
    }

    /// Registry that discards everything.
    pub fn noop() -> Self {
        Self::new(NoopRecorder)
    }

    /// Prometheus-backed registry plus the handle used to render it.
    pub fn prometheus() -> Result<(Self, PrometheusHandle), BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("_duration_seconds".to_string()), &LATENCY_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();
        Ok((Self::new(recorder), handle))
    }

    fn describe(&self) {
        let help = [
            (OUTBOUND_TOTAL, "Counter of Outbound HTTP requests."),
            (OUTBOUND_STATUS, "Counter of Outbound HTTP requests by status code."),
            (OUTBOUND_ERRORS, "Counter of Outbound HTTP requests errors."),
            (INBOUND_TOTAL, "Counter of HTTP requests."),
        ];
        for (name, text) in help {
            self.recorder.describe_counter(name.into(), None, text.into());
        }
        self.recorder.describe_gauge(
            OUTBOUND_IN_FLIGHT.into(),
            None,
            "In Flight Outbound HTTP requests.".into(),
        );
        self.recorder
            .describe_gauge(INBOUND_IN_FLIGHT.into(), None, "In Flight HTTP requests.".into());
        self.recorder.describe_histogram(
            OUTBOUND_DURATION.into(),
            None,
            "Histogram of latencies for Outbound HTTP requests.".into(),
        );
        self.recorder.describe_histogram(
            INBOUND_DURATION.into(),
            None,
            "Histogram of latencies for HTTP requests.".into(),
        );
    }

    fn counter(&self, name: &'static str, labels: Vec<Label>) -> Counter {
        self.recorder
            .register_counter(&Key::from_parts(name, labels), &metadata())
    }

    fn gauge(&self, name: &'static str, labels: Vec<Label>) -> Gauge {
        self.recorder
            .register_gauge(&Key::from_parts(name, labels), &metadata())
    }

    fn histogram(&self, name: &'static str, labels: Vec<Label>) -> Histogram {
        self.recorder
            .register_histogram(&Key::from_parts(name, labels), &metadata())
    }

    /// Record the start of one outbound attempt.
    ///
    /// The in-flight gauge is decremented when the returned guard drops.
    pub fn outbound_started(&self, method: &str, host: &str) -> InFlight {
        let labels = outbound_labels(method, host);
        self.counter(OUTBOUND_TOTAL, labels.clone()).increment(1);
        InFlight::enter(self.gauge(OUTBOUND_IN_FLIGHT, labels))
    }

    pub fn outbound_status(&self, method: &str, host: &str, code: u16) {
        let mut labels = outbound_labels(method, host);
        labels.push(Label::new("code", code.to_string()));
        self.counter(OUTBOUND_STATUS, labels).increment(1);
    }

    pub fn outbound_error(&self, method: &str, host: &str) {
        self.counter(OUTBOUND_ERRORS, outbound_labels(method, host))
            .increment(1);
    }

    pub fn outbound_duration(&self, method: &str, host: &str, elapsed: Duration) {
        self.histogram(OUTBOUND_DURATION, outbound_labels(method, host))
            .record(elapsed.as_secs_f64());
    }

    /// Record the start of one inbound request.
    pub fn inbound_started(&self) -> InFlight {
        InFlight::enter(self.gauge(INBOUND_IN_FLIGHT, Vec::new()))
    }

    pub fn inbound_finished(&self, handler: &str, method: &str, code: u16, elapsed: Duration) {
        let labels = vec![
            Label::new("handler", handler.to_string()),
            Label::new("code", code.to_string()),
            Label::new("method", method.to_ascii_lowercase()),
        ];
        self.counter(INBOUND_TOTAL, labels.clone()).increment(1);
        self.histogram(INBOUND_DURATION, labels)
            .record(elapsed.as_secs_f64());
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

fn outbound_labels(method: &str, host: &str) -> Vec<Label> {
    vec![
        Label::new("method", method.to_ascii_lowercase()),
        Label::new("host", host.to_string()),
    ]
}

/// Gauge guard; decrements on drop.
pub struct InFlight {
    gauge: Gauge,
}

impl InFlight {
    fn enter(gauge: Gauge) -> Self {
        gauge.increment(1.0);
        Self { gauge }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.decrement(1.0);
    }
}
