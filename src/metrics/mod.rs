//! Metrics facade
//!
//! A small capability trait over counters, latency timers and gauges, so the
//! rest of the service never sees a concrete metrics client. Three sinks:
//! `none` (no-op, also used by tests), `prometheus` (pull — scraped from the
//! admin listener), and `influx` (statsd-style UDP push).

pub mod prometheus;
pub mod statsd;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::core::config::{MetricsConfig, MetricsSinkType};
use crate::data::error::CacheError;

/// Cache operation being measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Put,
    Get,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Put => "put",
            Op::Get => "get",
        }
    }
}

/// Outcome label shared by request and backend metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    BadRequest,
    NotFound,
    Exists,
    RateLimited,
    BackendError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::BadRequest => "bad_request",
            Outcome::NotFound => "not_found",
            Outcome::Exists => "exists",
            Outcome::RateLimited => "rate_limited",
            Outcome::BackendError => "backend_error",
        }
    }

    pub fn from_error(error: &CacheError) -> Self {
        match error {
            CacheError::KeyNotFound => Outcome::NotFound,
            CacheError::RecordExists => Outcome::Exists,
            CacheError::RateLimited => Outcome::RateLimited,
            CacheError::MissingKey
            | CacheError::MalformedRequest(_)
            | CacheError::UnauthorizedKey
            | CacheError::TooMany(_)
            | CacheError::TooLarge(_)
            | CacheError::NegativeTtl => Outcome::BadRequest,
            CacheError::PutInternal(_)
            | CacheError::GetInternal(_)
            | CacheError::Marshal(_)
            | CacheError::MalformedRecord => Outcome::BackendError,
        }
    }
}

/// Metric sink capability
pub trait Metrics: Send + Sync {
    /// One completed HTTP cache request
    fn record_request(&self, op: Op, outcome: Outcome, elapsed: Duration);

    /// One completed backend call, as seen outside the rate limiter
    fn record_backend_call(&self, op: Op, outcome: Outcome, elapsed: Duration);

    fn record_connection_opened(&self);
    fn record_connection_closed(&self);
    fn record_connection_error(&self);

    /// Deployment-configured extra TTL, reported once at startup
    fn set_extra_ttl_seconds(&self, seconds: u64);

    /// Render the exposition payload, for pull sinks only.
    fn scrape(&self) -> Option<(String, Vec<u8>)> {
        None
    }
}

/// Sink that drops everything
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn record_request(&self, _op: Op, _outcome: Outcome, _elapsed: Duration) {}
    fn record_backend_call(&self, _op: Op, _outcome: Outcome, _elapsed: Duration) {}
    fn record_connection_opened(&self) {}
    fn record_connection_closed(&self) {}
    fn record_connection_error(&self) {}
    fn set_extra_ttl_seconds(&self, _seconds: u64) {}
}

/// Build the configured metrics sink.
pub fn build_metrics(config: &MetricsConfig) -> anyhow::Result<Arc<dyn Metrics>> {
    let metrics: Arc<dyn Metrics> = match config.sink {
        MetricsSinkType::None => Arc::new(NoopMetrics),
        MetricsSinkType::Prometheus => Arc::new(
            prometheus::PrometheusMetrics::new()
                .context("Failed to initialize Prometheus metrics")?,
        ),
        MetricsSinkType::Influx => Arc::new(
            statsd::StatsdMetrics::new(&config.influx)
                .context("Failed to initialize statsd metrics")?,
        ),
    };

    tracing::debug!(sink = %config.sink, "Metrics sink initialized");
    Ok(metrics)
}
