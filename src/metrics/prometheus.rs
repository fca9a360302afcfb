//! Prometheus pull sink
//!
//! Owns a private registry; the admin listener calls [`Metrics::scrape`] to
//! render the text exposition format.

use std::time::Duration;

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry,
};
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder,
};

use super::{Metrics, Op, Outcome};

pub struct PrometheusMetrics {
    registry: Registry,
    request_total: IntCounterVec,
    request_duration: HistogramVec,
    backend_total: IntCounterVec,
    backend_duration: HistogramVec,
    connections_opened: IntCounter,
    connections_closed: IntCounter,
    connections_errors: IntCounter,
    extra_ttl_seconds: IntGauge,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_total = register_int_counter_vec_with_registry!(
            "request_total",
            "Completed cache requests by operation and outcome.",
            &["op", "outcome"],
            registry
        )?;

        let request_duration = register_histogram_vec_with_registry!(
            "request_duration_seconds",
            "Cache request latency in seconds.",
            &["op"],
            registry
        )?;

        let backend_total = register_int_counter_vec_with_registry!(
            "backend_total",
            "Backend calls by operation and outcome.",
            &["op", "outcome"],
            registry
        )?;

        let backend_duration = register_histogram_vec_with_registry!(
            "backend_duration_seconds",
            "Backend call latency in seconds.",
            &["op"],
            registry
        )?;

        let connections_opened = register_int_counter_with_registry!(
            "connections_opened",
            "Connections accepted by the cache listener.",
            registry
        )?;

        let connections_closed = register_int_counter_with_registry!(
            "connections_closed",
            "Connections closed by the cache listener.",
            registry
        )?;

        let connections_errors = register_int_counter_with_registry!(
            "connections_errors",
            "Connections that ended in a server-side error.",
            registry
        )?;

        let extra_ttl_seconds = register_int_gauge_with_registry!(
            "extra_ttl_seconds",
            "Configured extra TTL in seconds.",
            registry
        )?;

        Ok(Self {
            registry,
            request_total,
            request_duration,
            backend_total,
            backend_duration,
            connections_opened,
            connections_closed,
            connections_errors,
            extra_ttl_seconds,
        })
    }
}

impl Metrics for PrometheusMetrics {
    fn record_request(&self, op: Op, outcome: Outcome, elapsed: Duration) {
        self.request_total
            .with_label_values(&[op.as_str(), outcome.as_str()])
            .inc();
        self.request_duration
            .with_label_values(&[op.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    fn record_backend_call(&self, op: Op, outcome: Outcome, elapsed: Duration) {
        self.backend_total
            .with_label_values(&[op.as_str(), outcome.as_str()])
            .inc();
        self.backend_duration
            .with_label_values(&[op.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    fn record_connection_opened(&self) {
        self.connections_opened.inc();
    }

    fn record_connection_closed(&self) {
        self.connections_closed.inc();
    }

    fn record_connection_error(&self) {
        self.connections_errors.inc();
    }

    fn set_extra_ttl_seconds(&self, seconds: u64) {
        self.extra_ttl_seconds.set(seconds as i64);
    }

    fn scrape(&self) -> Option<(String, Vec<u8>)> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!(error = %e, "Failed to encode metrics");
            return None;
        }
        Some((encoder.format_type().to_string(), buffer))
    }
}
