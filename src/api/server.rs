//! HTTP server assembly
//!
//! Two listeners: the cache listener serves `/cache`, `/status` and
//! `/version`; the admin listener serves only the metrics scrape path. Both
//! share the shutdown signal. A catch-panic layer sits at the handler
//! boundary so a panicking driver surfaces as a plain 500 instead of tearing
//! down the connection task.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use super::routes::cache::CacheService;
use super::routes::{cache, status};
use crate::core::config::AppConfig;
use crate::core::shutdown::ShutdownService;
use crate::metrics::Metrics;

pub struct ApiServer {
    config: AppConfig,
    service: Arc<CacheService>,
    metrics: Arc<dyn Metrics>,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        service: Arc<CacheService>,
        metrics: Arc<dyn Metrics>,
        shutdown: ShutdownService,
    ) -> Self {
        Self {
            config,
            service,
            metrics,
            shutdown,
        }
    }

    /// Bind both listeners and serve until shutdown.
    pub async fn start(self) -> Result<()> {
        let host: std::net::IpAddr = self
            .config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid bind host {}", self.config.server.host))?;

        let cache_router = cache::routes(self.service)
            .route("/status", get(status::status))
            .route("/version", get(status::version))
            .layer(CatchPanicLayer::new())
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.metrics),
                connection_metrics,
            ));

        let admin_router = Router::new()
            .route(&normalize_path(&self.config.metrics.prometheus.path), get(scrape))
            .with_state(Arc::clone(&self.metrics));

        let cache_addr = SocketAddr::new(host, self.config.server.port);
        let cache_listener = TcpListener::bind(cache_addr)
            .await
            .with_context(|| format!("Failed to bind cache listener on {cache_addr}"))?;

        let admin_addr = SocketAddr::new(host, self.config.server.admin_port);
        let admin_listener = TcpListener::bind(admin_addr)
            .await
            .with_context(|| format!("Failed to bind admin listener on {admin_addr}"))?;

        tracing::info!(cache = %cache_addr, admin = %admin_addr, "Listening");

        let cache_server = axum::serve(cache_listener, cache_router)
            .with_graceful_shutdown(self.shutdown.wait());
        let admin_server = axum::serve(admin_listener, admin_router)
            .with_graceful_shutdown(self.shutdown.wait());

        tokio::try_join!(
            async move { cache_server.await },
            async move { admin_server.await },
        )
        .context("Server error")?;

        tracing::info!("Listeners drained");
        Ok(())
    }
}

/// Per-connection counters around request handling.
async fn connection_metrics(
    State(metrics): State<Arc<dyn Metrics>>,
    request: Request,
    next: Next,
) -> Response {
    metrics.record_connection_opened();
    let response = next.run(request).await;
    if response.status().is_server_error() {
        metrics.record_connection_error();
    }
    metrics.record_connection_closed();
    response
}

/// Render the pull-sink exposition; push-only sinks have nothing to scrape.
async fn scrape(State(metrics): State<Arc<dyn Metrics>>) -> Response {
    match metrics.scrape() {
        Some((content_type, body)) => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/metrics"), "/metrics");
        assert_eq!(normalize_path("metrics"), "/metrics");
    }
}
