//! Core application
//!
//! Bootstrap wiring: CLI → config → logging → metrics → backend (decorated)
//! → HTTP listeners. Everything the handlers share is created here once and
//! injected; any failure before the listeners bind aborts the process with a
//! non-zero exit.

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::api::routes::cache::CacheService;
use crate::core::cli::{self, CliConfig};
use crate::core::config::{AppConfig, LogConfig, LogFormat};
use crate::core::constants::ENV_LOG;
use crate::core::shutdown::ShutdownService;
use crate::data::backend::build_backend;
use crate::data::decorator;
use crate::data::rate_limiter::RateLimiter;
use crate::metrics::{Metrics, build_metrics};

pub struct CoreApp {
    config: AppConfig,
    service: Arc<CacheService>,
    metrics: Arc<dyn Metrics>,
    shutdown: ShutdownService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        app.start().await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        init_logging(&config.log);

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            backend = %config.backend.backend_type,
            metrics = %config.metrics.sink,
            "Starting bidcache"
        );

        let metrics = build_metrics(&config.metrics)?;
        metrics.set_extra_ttl_seconds(config.ttl.extra_ttl_seconds);

        let driver = build_backend(&config.backend).await?;
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.enabled,
            config.rate_limit.num_requests,
        ));
        if limiter.is_enabled() {
            tracing::debug!(
                num_requests = config.rate_limit.num_requests,
                "Put rate limiter enabled"
            );
        }

        let backend = decorator::decorate(driver, limiter, Arc::clone(&metrics));
        let service = Arc::new(CacheService::new(&config, backend, Arc::clone(&metrics)));

        Ok(Self {
            config,
            service,
            metrics,
            shutdown: ShutdownService::new(),
        })
    }

    async fn start(self) -> Result<()> {
        self.shutdown.install_signal_handlers();

        let server = ApiServer::new(
            self.config,
            self.service,
            self.metrics,
            self.shutdown.clone(),
        );
        server.start().await
    }
}

fn init_logging(config: &LogConfig) {
    let filter = std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| config.level.clone());

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter);

    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
