use std::path::PathBuf;

use clap::Parser;

use super::config::{parse_log_format, parse_metrics_sink, LogFormat, MetricsSinkType};
use super::constants::{
    ENV_ADMIN_PORT, ENV_ALLOW_KEYS, ENV_API_KEY, ENV_BACKEND_TYPE, ENV_CONFIG, ENV_HOST,
    ENV_MAX_NUM_VALUES, ENV_MAX_SIZE_BYTES, ENV_MAX_TTL_SECONDS, ENV_METRICS_TYPE, ENV_PORT,
    ENV_RATE_LIMIT_ENABLED, ENV_RATE_LIMIT_NUM_REQUESTS, ENV_REDIS_URL,
};
use crate::data::backend::{parse_backend_type, BackendType};

#[derive(Parser)]
#[command(name = "bidcache")]
#[command(version, about = "HTTP key/value cache for auction payloads", long_about = None)]
pub struct Cli {
    /// Path to config file (defaults to ./bidcache.json when present)
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Bind host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Cache listener port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Admin listener port (metrics scrape)
    #[arg(long, env = ENV_ADMIN_PORT)]
    pub admin_port: Option<u16>,

    /// Storage backend (memory, redis, memcache, aerospike, cassandra,
    /// ignite, composite)
    #[arg(long, env = ENV_BACKEND_TYPE, value_parser = parse_backend_type)]
    pub backend: Option<BackendType>,

    /// Redis connection URL (when using the redis backend)
    #[arg(long, env = ENV_REDIS_URL)]
    pub redis_url: Option<String>,

    /// Metrics sink (none, prometheus, influx)
    #[arg(long, env = ENV_METRICS_TYPE, value_parser = parse_metrics_sink)]
    pub metrics: Option<MetricsSinkType>,

    /// Enable or disable the put rate limiter
    #[arg(long, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// Rate limiter refill rate in puts per second
    #[arg(long, env = ENV_RATE_LIMIT_NUM_REQUESTS)]
    pub rate_limit_num_requests: Option<u64>,

    /// Accept caller-chosen keys from authorized writers
    #[arg(long, env = ENV_ALLOW_KEYS)]
    pub allow_keys: Option<bool>,

    /// Write-authorization secret gating caller-chosen keys
    #[arg(long, env = ENV_API_KEY)]
    pub api_key: Option<String>,

    /// Maximum elements per put envelope
    #[arg(long, env = ENV_MAX_NUM_VALUES)]
    pub max_num_values: Option<usize>,

    /// Maximum serialized payload size in bytes
    #[arg(long, env = ENV_MAX_SIZE_BYTES)]
    pub max_size_bytes: Option<usize>,

    /// Cap on requested TTLs in seconds (0 = unbounded)
    #[arg(long, env = ENV_MAX_TTL_SECONDS)]
    pub max_ttl_seconds: Option<u64>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format (compact, json)
    #[arg(long, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub admin_port: Option<u16>,
    pub backend: Option<BackendType>,
    pub redis_url: Option<String>,
    pub metrics: Option<MetricsSinkType>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_num_requests: Option<u64>,
    pub allow_keys: Option<bool>,
    pub api_key: Option<String>,
    pub max_num_values: Option<usize>,
    pub max_size_bytes: Option<usize>,
    pub max_ttl_seconds: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

/// Parse CLI arguments into a config overlay
pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    CliConfig {
        config: cli.config,
        host: cli.host,
        port: cli.port,
        admin_port: cli.admin_port,
        backend: cli.backend,
        redis_url: cli.redis_url,
        metrics: cli.metrics,
        rate_limit_enabled: cli.rate_limit_enabled,
        rate_limit_num_requests: cli.rate_limit_num_requests,
        allow_keys: cli.allow_keys,
        api_key: cli.api_key,
        max_num_values: cli.max_num_values,
        max_size_bytes: cli.max_size_bytes,
        max_ttl_seconds: cli.max_ttl_seconds,
        log_level: cli.log_level,
        log_format: cli.log_format,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "bidcache",
            "--port",
            "8000",
            "--backend",
            "redis",
            "--metrics",
            "prometheus",
            "--allow-keys",
            "true",
            "--api-key",
            "s3cr3t",
        ]);
        assert_eq!(cli.port, Some(8000));
        assert_eq!(cli.backend, Some(BackendType::Redis));
        assert_eq!(cli.metrics, Some(MetricsSinkType::Prometheus));
        assert_eq!(cli.allow_keys, Some(true));
        assert_eq!(cli.api_key.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn test_cli_rejects_unknown_backend() {
        let result = Cli::try_parse_from(["bidcache", "--backend", "mongodb"]);
        assert!(result.is_err());
    }
}
