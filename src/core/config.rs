//! Application configuration
//!
//! Configuration is layered: built-in defaults, then the JSON config file
//! (`bidcache.json` in the working directory, or the `--config` path), then
//! CLI flags with their env-var fallbacks. File sections deserialize into
//! `*FileConfig` structs whose fields are all optional; `AppConfig::load`
//! resolves the layers into fully-populated structs and validates the result.
//! Validation failures abort startup.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_ADMIN_PORT, DEFAULT_AEROSPIKE_NAMESPACE, DEFAULT_AEROSPIKE_SET,
    DEFAULT_CASSANDRA_KEYSPACE, DEFAULT_CASSANDRA_TABLE, DEFAULT_HOST, DEFAULT_IGNITE_CACHE_NAME,
    DEFAULT_IGNITE_PORT, DEFAULT_IGNITE_SCHEME, DEFAULT_MAX_NUM_VALUES, DEFAULT_MAX_SIZE_BYTES,
    DEFAULT_MAX_TTL_SECONDS, DEFAULT_MEMCACHE_HOST, DEFAULT_MEMORY_MAX_ENTRIES,
    DEFAULT_METRICS_PATH, DEFAULT_PORT, DEFAULT_RATE_LIMIT_NUM_REQUESTS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_REDIS_POOL_SIZE, DEFAULT_REDIS_URL, DEFAULT_STATSD_HOST, DEFAULT_STATSD_PORT,
    DEFAULT_STATSD_PREFIX, DEFAULT_WRITE_TIMEOUT_MS,
};
use crate::data::backend::BackendType;

// =============================================================================
// Metrics Sink Enum
// =============================================================================

/// Metrics sink type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSinkType {
    #[default]
    None,
    Prometheus,
    Influx,
}

impl fmt::Display for MetricsSinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsSinkType::None => write!(f, "none"),
            MetricsSinkType::Prometheus => write!(f, "prometheus"),
            MetricsSinkType::Influx => write!(f, "influx"),
        }
    }
}

/// Parse a metrics sink type from a CLI/env string.
pub fn parse_metrics_sink(s: &str) -> std::result::Result<MetricsSinkType, String> {
    match s.to_lowercase().as_str() {
        "none" => Ok(MetricsSinkType::None),
        "prometheus" => Ok(MetricsSinkType::Prometheus),
        "influx" => Ok(MetricsSinkType::Influx),
        _ => Err(format!(
            "Invalid metrics sink '{}'. Valid options: none, prometheus, influx",
            s
        )),
    }
}

// =============================================================================
// Log Format Enum
// =============================================================================

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Parse a log format from a CLI/env string.
pub fn parse_log_format(s: &str) -> std::result::Result<LogFormat, String> {
    match s.to_lowercase().as_str() {
        "compact" => Ok(LogFormat::Compact),
        "json" => Ok(LogFormat::Json),
        _ => Err(format!(
            "Invalid log format '{}'. Valid options: compact, json",
            s
        )),
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Server section: listeners, request limits, write authorization
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub admin_port: u16,
    /// Backend-call deadline on the read path
    pub read_timeout: Duration,
    /// Backend-call deadline on the write path
    pub write_timeout: Duration,
    pub max_num_values: usize,
    pub max_size_bytes: usize,
    /// Whether caller-chosen keys are accepted at all
    pub allow_keys: bool,
    /// Shared secret authorizing caller-chosen keys
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
            max_num_values: DEFAULT_MAX_NUM_VALUES,
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            allow_keys: false,
            api_key: None,
        }
    }
}

/// TTL section
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
    /// Cap applied to requested TTLs; 0 = unbounded
    pub max_ttl_seconds: u64,
    /// Reported via the metrics gauge only
    pub extra_ttl_seconds: u64,
}

/// Rate limiter section
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Token refill rate in puts per second
    pub num_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_requests: DEFAULT_RATE_LIMIT_NUM_REQUESTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_entries: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            pool_size: DEFAULT_REDIS_POOL_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemcacheConfig {
    pub hosts: Vec<String>,
}

impl Default for MemcacheConfig {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_MEMCACHE_HOST.to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct AerospikeConfig {
    pub hosts: Vec<String>,
    pub namespace: String,
    pub set: String,
}

impl Default for AerospikeConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:3000".to_string()],
            namespace: DEFAULT_AEROSPIKE_NAMESPACE.to_string(),
            set: DEFAULT_AEROSPIKE_SET.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CassandraConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub table: String,
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: DEFAULT_CASSANDRA_KEYSPACE.to_string(),
            table: DEFAULT_CASSANDRA_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IgniteConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub cache_name: String,
    /// Issue `getorcreate` at startup; failure is fatal
    pub create_on_start: bool,
    /// Skip TLS certificate verification. Deployment escape hatch only.
    pub insecure_tls: bool,
}

impl Default for IgniteConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_IGNITE_SCHEME.to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_IGNITE_PORT,
            cache_name: DEFAULT_IGNITE_CACHE_NAME.to_string(),
            create_on_start: false,
            insecure_tls: false,
        }
    }
}

/// Composite tier selection; connection details come from the per-backend
/// sections above
#[derive(Debug, Clone)]
pub struct CompositeConfig {
    pub primary: BackendType,
    pub secondary: BackendType,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            primary: BackendType::Memory,
            secondary: BackendType::Redis,
        }
    }
}

/// Backend section
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub backend_type: BackendType,
    pub memory: MemoryConfig,
    pub redis: RedisConfig,
    pub memcache: MemcacheConfig,
    pub aerospike: AerospikeConfig,
    pub cassandra: CassandraConfig,
    pub ignite: IgniteConfig,
    pub composite: CompositeConfig,
}

#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    /// Scrape path on the admin listener
    pub path: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub host: String,
    pub port: u16,
    pub prefix: String,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_STATSD_HOST.to_string(),
            port: DEFAULT_STATSD_PORT,
            prefix: DEFAULT_STATSD_PREFIX.to_string(),
        }
    }
}

/// Metrics section
#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    pub sink: MetricsSinkType,
    pub prometheus: PrometheusConfig,
    pub influx: InfluxConfig,
}

/// Logging section
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ttl: TtlConfig,
    pub rate_limit: RateLimitConfig,
    pub backend: BackendConfig,
    pub metrics: MetricsConfig,
    pub log: LogConfig,
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub admin_port: Option<u16>,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub max_num_values: Option<usize>,
    pub max_size_bytes: Option<usize>,
    pub allow_keys: Option<bool>,
    pub api_key: Option<String>,
}

/// TTL configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RequestFileConfig {
    pub max_ttl_seconds: Option<u64>,
    pub extra_ttl_seconds: Option<u64>,
}

/// Rate limiter configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimiterFileConfig {
    pub enabled: Option<bool>,
    pub num_requests: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MemoryFileConfig {
    pub max_entries: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RedisFileConfig {
    pub url: Option<String>,
    pub pool_size: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct MemcacheFileConfig {
    pub hosts: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AerospikeFileConfig {
    pub hosts: Option<Vec<String>>,
    pub namespace: Option<String>,
    pub set: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CassandraFileConfig {
    pub hosts: Option<Vec<String>>,
    pub keyspace: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct IgniteFileConfig {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cache_name: Option<String>,
    pub create_on_start: Option<bool>,
    pub insecure_tls: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CompositeFileConfig {
    pub primary: Option<BackendType>,
    pub secondary: Option<BackendType>,
}

/// Backend configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BackendFileConfig {
    #[serde(rename = "type")]
    pub backend_type: Option<BackendType>,
    pub memory: Option<MemoryFileConfig>,
    pub redis: Option<RedisFileConfig>,
    pub memcache: Option<MemcacheFileConfig>,
    pub aerospike: Option<AerospikeFileConfig>,
    pub cassandra: Option<CassandraFileConfig>,
    pub ignite: Option<IgniteFileConfig>,
    pub composite: Option<CompositeFileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PrometheusFileConfig {
    pub path: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct InfluxFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub prefix: Option<String>,
}

/// Metrics configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MetricsFileConfig {
    #[serde(rename = "type")]
    pub sink: Option<MetricsSinkType>,
    pub prometheus: Option<PrometheusFileConfig>,
    pub influx: Option<InfluxFileConfig>,
}

/// Logging configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LogFileConfig {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

/// Root of the JSON config file
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub request: Option<RequestFileConfig>,
    pub rate_limiter: Option<RateLimiterFileConfig>,
    pub backend: Option<BackendFileConfig>,
    pub metrics: Option<MetricsFileConfig>,
    pub log: Option<LogFileConfig>,
}

impl FileConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

// =============================================================================
// Loading and Validation
// =============================================================================

impl AppConfig {
    /// Load configuration from all sources.
    ///
    /// Priority (lowest to highest): defaults, config file, CLI arguments
    /// (which include env-var fallbacks via clap).
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file_config = match resolve_config_path(cli)? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                FileConfig::load_from_file(&path)?
            }
            None => FileConfig::default(),
        };

        let config = Self::resolve(cli, file_config);
        config.validate()?;
        Ok(config)
    }

    fn resolve(cli: &CliConfig, file: FileConfig) -> Self {
        let defaults = AppConfig::default();

        let file_server = file.server.unwrap_or_default();
        let file_request = file.request.unwrap_or_default();
        let file_rate = file.rate_limiter.unwrap_or_default();
        let file_backend = file.backend.unwrap_or_default();
        let file_metrics = file.metrics.unwrap_or_default();
        let file_log = file.log.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or(defaults.server.host),
            port: cli.port.or(file_server.port).unwrap_or(defaults.server.port),
            admin_port: cli
                .admin_port
                .or(file_server.admin_port)
                .unwrap_or(defaults.server.admin_port),
            read_timeout: file_server
                .read_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.server.read_timeout),
            write_timeout: file_server
                .write_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.server.write_timeout),
            max_num_values: cli
                .max_num_values
                .or(file_server.max_num_values)
                .unwrap_or(defaults.server.max_num_values),
            max_size_bytes: cli
                .max_size_bytes
                .or(file_server.max_size_bytes)
                .unwrap_or(defaults.server.max_size_bytes),
            allow_keys: cli
                .allow_keys
                .or(file_server.allow_keys)
                .unwrap_or(defaults.server.allow_keys),
            api_key: cli.api_key.clone().or(file_server.api_key),
        };

        let ttl = TtlConfig {
            max_ttl_seconds: cli
                .max_ttl_seconds
                .or(file_request.max_ttl_seconds)
                .unwrap_or(DEFAULT_MAX_TTL_SECONDS),
            extra_ttl_seconds: file_request.extra_ttl_seconds.unwrap_or(0),
        };

        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rate.enabled)
                .unwrap_or(defaults.rate_limit.enabled),
            num_requests: cli
                .rate_limit_num_requests
                .or(file_rate.num_requests)
                .unwrap_or(defaults.rate_limit.num_requests),
        };

        let file_memory = file_backend.memory.unwrap_or_default();
        let file_redis = file_backend.redis.unwrap_or_default();
        let file_memcache = file_backend.memcache.unwrap_or_default();
        let file_aerospike = file_backend.aerospike.unwrap_or_default();
        let file_cassandra = file_backend.cassandra.unwrap_or_default();
        let file_ignite = file_backend.ignite.unwrap_or_default();
        let file_composite = file_backend.composite.unwrap_or_default();

        let backend = BackendConfig {
            backend_type: cli
                .backend
                .or(file_backend.backend_type)
                .unwrap_or(defaults.backend.backend_type),
            memory: MemoryConfig {
                max_entries: file_memory
                    .max_entries
                    .unwrap_or(defaults.backend.memory.max_entries),
            },
            redis: RedisConfig {
                url: cli
                    .redis_url
                    .clone()
                    .or(file_redis.url)
                    .unwrap_or(defaults.backend.redis.url),
                pool_size: file_redis
                    .pool_size
                    .unwrap_or(defaults.backend.redis.pool_size),
            },
            memcache: MemcacheConfig {
                hosts: file_memcache
                    .hosts
                    .unwrap_or(defaults.backend.memcache.hosts),
            },
            aerospike: AerospikeConfig {
                hosts: file_aerospike
                    .hosts
                    .unwrap_or(defaults.backend.aerospike.hosts),
                namespace: file_aerospike
                    .namespace
                    .unwrap_or(defaults.backend.aerospike.namespace),
                set: file_aerospike.set.unwrap_or(defaults.backend.aerospike.set),
            },
            cassandra: CassandraConfig {
                hosts: file_cassandra
                    .hosts
                    .unwrap_or(defaults.backend.cassandra.hosts),
                keyspace: file_cassandra
                    .keyspace
                    .unwrap_or(defaults.backend.cassandra.keyspace),
                table: file_cassandra
                    .table
                    .unwrap_or(defaults.backend.cassandra.table),
            },
            ignite: IgniteConfig {
                scheme: file_ignite.scheme.unwrap_or(defaults.backend.ignite.scheme),
                host: file_ignite.host.unwrap_or(defaults.backend.ignite.host),
                port: file_ignite.port.unwrap_or(defaults.backend.ignite.port),
                cache_name: file_ignite
                    .cache_name
                    .unwrap_or(defaults.backend.ignite.cache_name),
                create_on_start: file_ignite
                    .create_on_start
                    .unwrap_or(defaults.backend.ignite.create_on_start),
                insecure_tls: file_ignite
                    .insecure_tls
                    .unwrap_or(defaults.backend.ignite.insecure_tls),
            },
            composite: CompositeConfig {
                primary: file_composite
                    .primary
                    .unwrap_or(defaults.backend.composite.primary),
                secondary: file_composite
                    .secondary
                    .unwrap_or(defaults.backend.composite.secondary),
            },
        };

        let metrics = MetricsConfig {
            sink: cli
                .metrics
                .or(file_metrics.sink)
                .unwrap_or(defaults.metrics.sink),
            prometheus: PrometheusConfig {
                path: file_metrics
                    .prometheus
                    .unwrap_or_default()
                    .path
                    .unwrap_or(defaults.metrics.prometheus.path),
            },
            influx: {
                let file_influx = file_metrics.influx.unwrap_or_default();
                InfluxConfig {
                    host: file_influx.host.unwrap_or(defaults.metrics.influx.host),
                    port: file_influx.port.unwrap_or(defaults.metrics.influx.port),
                    prefix: file_influx
                        .prefix
                        .unwrap_or(defaults.metrics.influx.prefix),
                }
            },
        };

        let log = LogConfig {
            level: cli
                .log_level
                .clone()
                .or(file_log.level)
                .unwrap_or(defaults.log.level),
            format: cli
                .log_format
                .or(file_log.format)
                .unwrap_or(defaults.log.format),
        };

        Self {
            server,
            ttl,
            rate_limit,
            backend,
            metrics,
            log,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.allow_keys
            && self.server.api_key.as_deref().unwrap_or("").is_empty()
        {
            anyhow::bail!("server.allow_keys requires server.api_key to be set");
        }

        if self.server.max_num_values == 0 {
            anyhow::bail!("server.max_num_values must be at least 1");
        }

        if self.server.max_size_bytes == 0 {
            anyhow::bail!("server.max_size_bytes must be at least 1");
        }

        if self.rate_limit.enabled && self.rate_limit.num_requests == 0 {
            anyhow::bail!("rate_limiter.num_requests must be at least 1 when enabled");
        }

        if self.server.port == self.server.admin_port {
            anyhow::bail!("server.port and server.admin_port must differ");
        }

        match self.backend.backend_type {
            BackendType::Redis if self.backend.redis.url.is_empty() => {
                anyhow::bail!("backend.redis.url must be set for the redis backend");
            }
            BackendType::Memcache if self.backend.memcache.hosts.is_empty() => {
                anyhow::bail!("backend.memcache.hosts must not be empty");
            }
            BackendType::Aerospike if self.backend.aerospike.hosts.is_empty() => {
                anyhow::bail!("backend.aerospike.hosts must not be empty");
            }
            BackendType::Cassandra if self.backend.cassandra.hosts.is_empty() => {
                anyhow::bail!("backend.cassandra.hosts must not be empty");
            }
            BackendType::Composite
                if self.backend.composite.primary == BackendType::Composite
                    || self.backend.composite.secondary == BackendType::Composite =>
            {
                anyhow::bail!("composite tiers may not themselves be composite");
            }
            _ => {}
        }

        Ok(())
    }
}

fn resolve_config_path(cli: &CliConfig) -> Result<Option<PathBuf>> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(Some(path.clone()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    Ok(local.exists().then_some(local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default());

        assert_eq!(config.server.port, 2424);
        assert_eq!(config.server.admin_port, 2525);
        assert_eq!(config.server.max_num_values, 10);
        assert_eq!(config.server.max_size_bytes, 10_240);
        assert!(!config.server.allow_keys);
        assert_eq!(config.ttl.max_ttl_seconds, 0);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.num_requests, 100);
        assert_eq!(config.backend.backend_type, BackendType::Memory);
        assert_eq!(config.metrics.sink, MetricsSinkType::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file: FileConfig = serde_json::from_str(
            r#"{
                "server": {"port": 9090, "max_num_values": 3},
                "backend": {"type": "ignite", "ignite": {"host": "ig1", "insecure_tls": true}},
                "metrics": {"type": "prometheus", "prometheus": {"path": "/m"}},
                "rate_limiter": {"enabled": false}
            }"#,
        )
        .unwrap();
        let config = AppConfig::resolve(&CliConfig::default(), file);

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.max_num_values, 3);
        assert_eq!(config.backend.backend_type, BackendType::Ignite);
        assert_eq!(config.backend.ignite.host, "ig1");
        assert!(config.backend.ignite.insecure_tls);
        assert_eq!(config.metrics.sink, MetricsSinkType::Prometheus);
        assert_eq!(config.metrics.prometheus.path, "/m");
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig =
            serde_json::from_str(r#"{"server": {"port": 9090}}"#).unwrap();
        let cli = CliConfig {
            port: Some(7070),
            backend: Some(BackendType::Redis),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, file);

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.backend.backend_type, BackendType::Redis);
    }

    #[test]
    fn test_allow_keys_requires_api_key() {
        let cli = CliConfig {
            allow_keys: Some(true),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_err());

        let cli = CliConfig {
            allow_keys: Some(true),
            api_key: Some("s3cr3t".into()),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rate_limiter_needs_nonzero_rate() {
        let cli = CliConfig {
            rate_limit_num_requests: Some(0),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ports_must_differ() {
        let cli = CliConfig {
            port: Some(2525),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_composite_rejected() {
        let file: FileConfig = serde_json::from_str(
            r#"{"backend": {"type": "composite", "composite": {"primary": "composite"}}}"#,
        )
        .unwrap();
        let config = AppConfig::resolve(&CliConfig::default(), file);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_metrics_sink() {
        assert_eq!(parse_metrics_sink("none"), Ok(MetricsSinkType::None));
        assert_eq!(
            parse_metrics_sink("Prometheus"),
            Ok(MetricsSinkType::Prometheus)
        );
        assert_eq!(parse_metrics_sink("influx"), Ok(MetricsSinkType::Influx));
        assert!(parse_metrics_sink("graphite").is_err());
    }

    #[test]
    fn test_timeouts_from_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{"server": {"read_timeout_ms": 100, "write_timeout_ms": 250}}"#,
        )
        .unwrap();
        let config = AppConfig::resolve(&CliConfig::default(), file);
        assert_eq!(config.server.read_timeout, Duration::from_millis(100));
        assert_eq!(config.server.write_timeout, Duration::from_millis(250));
    }
}
