//! Statsd-style push sink
//!
//! Pushes dot-delimited keys over UDP via cadence, matching the
//! telegraf/Influx agent convention. Sends are buffered and best-effort; a
//! dropped datagram never affects a cache request.

use std::net::UdpSocket;
use std::time::Duration;

use cadence::{BufferedUdpMetricSink, Counted, Gauged, StatsdClient, Timed};

use super::{Metrics, Op, Outcome};
use crate::core::config::InfluxConfig;

pub struct StatsdMetrics {
    client: StatsdClient,
}

impl StatsdMetrics {
    pub fn new(config: &InfluxConfig) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;

        let sink = BufferedUdpMetricSink::from((config.host.as_str(), config.port), socket)
            .map_err(std::io::Error::other)?;
        let client = StatsdClient::from_sink(&config.prefix, sink);

        tracing::debug!(
            host = %config.host,
            port = config.port,
            prefix = %config.prefix,
            "Statsd metrics sink connected"
        );
        Ok(Self { client })
    }
}

fn request_key(op: Op, outcome: Outcome) -> String {
    format!("request.{}.{}", op.as_str(), outcome.as_str())
}

fn backend_key(op: Op, outcome: Outcome) -> String {
    format!("backend.{}.{}", op.as_str(), outcome.as_str())
}

impl Metrics for StatsdMetrics {
    fn record_request(&self, op: Op, outcome: Outcome, elapsed: Duration) {
        let _ = self.client.count(request_key(op, outcome).as_str(), 1_i64);
        let _ = self
            .client
            .time(format!("request.{}.duration", op.as_str()).as_str(), elapsed);
    }

    fn record_backend_call(&self, op: Op, outcome: Outcome, elapsed: Duration) {
        let _ = self.client.count(backend_key(op, outcome).as_str(), 1_i64);
        let _ = self
            .client
            .time(format!("backend.{}.duration", op.as_str()).as_str(), elapsed);
    }

    fn record_connection_opened(&self) {
        let _ = self.client.count("connections.opened", 1_i64);
    }

    fn record_connection_closed(&self) {
        let _ = self.client.count("connections.closed", 1_i64);
    }

    fn record_connection_error(&self) {
        let _ = self.client.count("connections.errors", 1_i64);
    }

    fn set_extra_ttl_seconds(&self, seconds: u64) {
        let _ = self.client.gauge("extra_ttl_seconds", seconds);
    }
}
