//! Memcached driver
//!
//! Uses the `add` verb, which only stores when the key is absent, so the
//! put-if-absent contract is native here. The client library is synchronous
//! and internally pooled; every call is isolated on the blocking thread pool
//! to keep the request tasks responsive.

use std::sync::Arc;

use async_trait::async_trait;
use memcache::{Client, CommandError, MemcacheError};

use super::backend::Backend;
use super::error::CacheError;
use crate::core::config::MemcacheConfig;

pub struct MemcachedBackend {
    client: Arc<Client>,
}

fn build_urls(hosts: &[String]) -> Vec<String> {
    hosts
        .iter()
        .map(|host| {
            if host.contains("://") {
                host.clone()
            } else {
                // Binary protocol gives a distinct key-exists status on add
                format!("memcache://{host}?protocol=binary&timeout=5")
            }
        })
        .collect()
}

impl MemcachedBackend {
    pub fn new(config: &MemcacheConfig) -> Result<Self, CacheError> {
        let client = Client::connect(build_urls(&config.hosts))
            .map_err(|e| CacheError::PutInternal(format!("memcached connect failed: {e}")))?;

        tracing::debug!(hosts = ?config.hosts, "Memcached backend connected");
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl Backend for MemcachedBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let client = Arc::clone(&self.client);
        let key = key.to_string();

        let value: Option<Vec<u8>> = tokio::task::spawn_blocking(move || client.get(&key))
            .await
            .map_err(|e| CacheError::GetInternal(e.to_string()))?
            .map_err(|e| CacheError::GetInternal(e.to_string()))?;

        value.ok_or(CacheError::KeyNotFound)
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        let client = Arc::clone(&self.client);
        let key = key.to_string();
        let value = value.to_vec();
        let expiration = u32::try_from(ttl_seconds).unwrap_or(u32::MAX);

        let result = tokio::task::spawn_blocking(move || {
            client.add(&key, value.as_slice(), expiration)
        })
        .await
        .map_err(|e| CacheError::PutInternal(e.to_string()))?;

        match result {
            Ok(()) => Ok(()),
            Err(MemcacheError::CommandError(CommandError::KeyExists)) => {
                Err(CacheError::RecordExists)
            }
            Err(e) => Err(CacheError::PutInternal(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "memcache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_hosts_get_binary_protocol_urls() {
        let urls = build_urls(&["10.0.0.1:11211".to_string()]);
        assert_eq!(
            urls,
            vec!["memcache://10.0.0.1:11211?protocol=binary&timeout=5".to_string()]
        );
    }

    #[test]
    fn test_full_urls_pass_through() {
        let urls = build_urls(&["memcache://cache.internal:11211?protocol=ascii".to_string()]);
        assert_eq!(
            urls,
            vec!["memcache://cache.internal:11211?protocol=ascii".to_string()]
        );
    }
}
