//! Two-tier composite backend
//!
//! Reads consult the primary tier first and fall back to the secondary on a
//! miss; a secondary hit is opportunistically written through to the primary
//! so the next read is local. The fill is fire-and-forget — read latency must
//! not depend on primary write health — and fill errors are logged and
//! swallowed.
//!
//! Writes go to the secondary first, then the primary, and both must
//! succeed: the primary is the authoritative presence check, so it is bound
//! last.

use std::sync::Arc;

use async_trait::async_trait;

use super::backend::Backend;
use super::error::CacheError;

pub struct CompositeBackend {
    primary: Arc<dyn Backend>,
    secondary: Arc<dyn Backend>,
}

impl CompositeBackend {
    pub fn new(primary: Arc<dyn Backend>, secondary: Arc<dyn Backend>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Backend for CompositeBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        match self.primary.get(key).await {
            Ok(value) => Ok(value),
            Err(CacheError::KeyNotFound) => {
                let value = self.secondary.get(key).await?;

                // Fill the primary in the background; remaining TTL is
                // unknown here, so the fill uses the primary's default expiry
                let primary = Arc::clone(&self.primary);
                let fill_key = key.to_string();
                let fill_value = value.clone();
                tokio::spawn(async move {
                    match primary.put(&fill_key, &fill_value, 0).await {
                        Ok(()) | Err(CacheError::RecordExists) => {}
                        Err(e) => {
                            tracing::warn!(key = %fill_key, error = %e, "Primary fill failed");
                        }
                    }
                });

                Ok(value)
            }
            Err(other) => Err(other),
        }
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        self.secondary.put(key, value, ttl_seconds).await?;
        self.primary.put(key, value, ttl_seconds).await
    }

    fn name(&self) -> &'static str {
        "composite"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::data::memory::MemoryBackend;

    fn two_tier() -> (Arc<MemoryBackend>, Arc<MemoryBackend>, CompositeBackend) {
        let primary = Arc::new(MemoryBackend::new(16));
        let secondary = Arc::new(MemoryBackend::new(16));
        let composite = CompositeBackend::new(
            Arc::clone(&primary) as Arc<dyn Backend>,
            Arc::clone(&secondary) as Arc<dyn Backend>,
        );
        (primary, secondary, composite)
    }

    #[tokio::test]
    async fn test_put_writes_both_tiers() {
        let (primary, secondary, composite) = two_tier();

        composite.put("k", b"v", 60).await.unwrap();
        assert_eq!(primary.get("k").await.unwrap(), b"v".to_vec());
        assert_eq!(secondary.get("k").await.unwrap(), b"v".to_vec());
    }

    #[tokio::test]
    async fn test_get_prefers_primary() {
        let (primary, _secondary, composite) = two_tier();

        primary.put("k", b"from-primary", 60).await.unwrap();
        assert_eq!(composite.get("k").await.unwrap(), b"from-primary".to_vec());
    }

    #[tokio::test]
    async fn test_secondary_hit_fills_primary() {
        let (primary, secondary, composite) = two_tier();

        secondary.put("k", b"v", 60).await.unwrap();
        assert_eq!(composite.get("k").await.unwrap(), b"v".to_vec());

        // The fill runs on a spawned task
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(primary.get("k").await.unwrap(), b"v".to_vec());
    }

    #[tokio::test]
    async fn test_miss_in_both_tiers() {
        let (_primary, _secondary, composite) = two_tier();
        assert_eq!(composite.get("nope").await, Err(CacheError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_put_conflict_in_secondary_stops_early() {
        let (primary, secondary, composite) = two_tier();

        secondary.put("dup", b"old", 60).await.unwrap();
        assert_eq!(
            composite.put("dup", b"new", 60).await,
            Err(CacheError::RecordExists)
        );
        // Primary was never written
        assert_eq!(primary.get("dup").await, Err(CacheError::KeyNotFound));
    }
}
