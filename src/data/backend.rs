//! Storage backend contract and construction
//!
//! Every backend — driver or decorator — implements the same two-operation
//! capability: `get` and put-if-absent `put`. Drivers are selected by
//! configuration at bootstrap and handed to the handlers as a trait object;
//! nothing downstream knows which store is behind it.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::aerospike::AerospikeBackend;
use super::cassandra::CassandraBackend;
use super::composite::CompositeBackend;
use super::error::CacheError;
use super::ignite::IgniteBackend;
use super::memcached::MemcachedBackend;
use super::memory::MemoryBackend;
use super::redis::RedisBackend;
use crate::core::config::BackendConfig;

/// Storage backend capability.
///
/// `put` has put-if-absent semantics: it succeeds only when it creates the
/// binding, and returns [`CacheError::RecordExists`] when the key is already
/// bound. `ttl_seconds == 0` means the backend's own default expiry.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the opaque stored record for `key`.
    ///
    /// A missing binding is [`CacheError::KeyNotFound`], never an empty
    /// success.
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Bind `key` to `value` if and only if no binding exists.
    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Selectable backend variants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    #[default]
    Memory,
    Redis,
    Memcache,
    Aerospike,
    Cassandra,
    Ignite,
    Composite,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendType::Memory => "memory",
            BackendType::Redis => "redis",
            BackendType::Memcache => "memcache",
            BackendType::Aerospike => "aerospike",
            BackendType::Cassandra => "cassandra",
            BackendType::Ignite => "ignite",
            BackendType::Composite => "composite",
        };
        write!(f, "{name}")
    }
}

/// Parse a backend type from a CLI/env string.
pub fn parse_backend_type(s: &str) -> Result<BackendType, String> {
    match s.to_lowercase().as_str() {
        "memory" => Ok(BackendType::Memory),
        "redis" => Ok(BackendType::Redis),
        "memcache" | "memcached" => Ok(BackendType::Memcache),
        "aerospike" => Ok(BackendType::Aerospike),
        "cassandra" => Ok(BackendType::Cassandra),
        "ignite" => Ok(BackendType::Ignite),
        "composite" => Ok(BackendType::Composite),
        _ => Err(format!(
            "Invalid backend '{}'. Valid options: memory, redis, memcache, \
             aerospike, cassandra, ignite, composite",
            s
        )),
    }
}

/// Build the configured backend driver.
///
/// Bootstrap-only: failures here (unreachable store, bad driver config) are
/// fatal and abort startup.
pub async fn build_backend(config: &BackendConfig) -> anyhow::Result<Arc<dyn Backend>> {
    let backend = build_driver(config.backend_type, config).await?;

    tracing::info!(backend = backend.name(), "Storage backend initialized");
    Ok(backend)
}

async fn build_driver(
    backend_type: BackendType,
    config: &BackendConfig,
) -> anyhow::Result<Arc<dyn Backend>> {
    let backend: Arc<dyn Backend> = match backend_type {
        BackendType::Memory => Arc::new(MemoryBackend::new(config.memory.max_entries)),
        BackendType::Redis => Arc::new(
            RedisBackend::new(&config.redis)
                .await
                .context("Failed to initialize Redis backend")?,
        ),
        BackendType::Memcache => Arc::new(
            MemcachedBackend::new(&config.memcache)
                .context("Failed to initialize memcached backend")?,
        ),
        BackendType::Aerospike => Arc::new(
            AerospikeBackend::new(&config.aerospike)
                .await
                .context("Failed to initialize Aerospike backend")?,
        ),
        BackendType::Cassandra => Arc::new(
            CassandraBackend::new(&config.cassandra)
                .await
                .context("Failed to initialize Cassandra backend")?,
        ),
        BackendType::Ignite => Arc::new(
            IgniteBackend::new(&config.ignite)
                .await
                .context("Failed to initialize Ignite backend")?,
        ),
        BackendType::Composite => {
            let tiers = &config.composite;
            if tiers.primary == BackendType::Composite
                || tiers.secondary == BackendType::Composite
            {
                anyhow::bail!("Composite backend tiers may not themselves be composite");
            }
            let primary = Box::pin(build_driver(tiers.primary, config)).await?;
            let secondary = Box::pin(build_driver(tiers.secondary, config)).await?;
            Arc::new(CompositeBackend::new(primary, secondary))
        }
    };

    Ok(backend)
}
