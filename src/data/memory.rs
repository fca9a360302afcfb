//! In-process backend for small deployments and tests
//!
//! A single mutex guards an LRU map with a configured entry bound. Expiry is
//! lazy: each entry carries its own deadline, checked on access, and the LRU
//! may evict live entries when the bound is hit. Because every operation runs
//! under the one lock, put-if-absent is exact here rather than best-effort.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use super::backend::Backend;
use super::error::CacheError;

struct StoredEntry {
    value: Vec<u8>,
    /// None = no deadline; the entry lives until the LRU pushes it out
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

pub struct MemoryBackend {
    entries: Mutex<LruCache<String, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new(max_entries: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(max_entries.max(1)).unwrap();
        tracing::debug!(max_entries = capacity.get(), "Using in-memory backend");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.pop(key);
                Err(CacheError::KeyNotFound)
            }
            Some(entry) => Ok(entry.value.clone()),
            None => Err(CacheError::KeyNotFound),
        }
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        if let Some(existing) = entries.get(key) {
            if !existing.is_expired(now) {
                return Err(CacheError::RecordExists);
            }
            entries.pop(key);
        }

        let expires_at = (ttl_seconds > 0).then(|| now + Duration::from_secs(ttl_seconds));
        entries.put(
            key.to_string(),
            StoredEntry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let backend = MemoryBackend::new(16);

        backend.put("k1", b"\x00{}", 60).await.unwrap();
        assert_eq!(backend.get("k1").await.unwrap(), b"\x00{}".to_vec());
    }

    #[tokio::test]
    async fn test_get_unknown_key() {
        let backend = MemoryBackend::new(16);
        assert_eq!(backend.get("nope").await, Err(CacheError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_put_if_absent_conflict() {
        let backend = MemoryBackend::new(16);

        backend.put("dup", b"first", 60).await.unwrap();
        assert_eq!(
            backend.put("dup", b"second", 60).await,
            Err(CacheError::RecordExists)
        );
        // Loser did not overwrite
        assert_eq!(backend.get("dup").await.unwrap(), b"first".to_vec());
    }

    #[tokio::test]
    async fn test_lazy_expiry() {
        let backend = MemoryBackend::new(16);

        backend.put("short", b"v", 1).await.unwrap();
        assert!(backend.get("short").await.is_ok());

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(backend.get("short").await, Err(CacheError::KeyNotFound));

        // An expired binding can be re-created
        backend.put("short", b"v2", 1).await.unwrap();
        assert_eq!(backend.get("short").await.unwrap(), b"v2".to_vec());
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_no_deadline() {
        let backend = MemoryBackend::new(16);

        backend.put("forever", b"v", 0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(backend.get("forever").await.is_ok());
    }

    #[tokio::test]
    async fn test_lru_bound_evicts_oldest() {
        let backend = MemoryBackend::new(2);

        backend.put("a", b"1", 60).await.unwrap();
        backend.put("b", b"2", 60).await.unwrap();
        backend.put("c", b"3", 60).await.unwrap();

        assert_eq!(backend.get("a").await, Err(CacheError::KeyNotFound));
        assert!(backend.get("b").await.is_ok());
        assert!(backend.get("c").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_put_single_winner() {
        use std::sync::Arc;

        let backend = Arc::new(MemoryBackend::new(64));
        let mut handles = Vec::new();
        for i in 0..16 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                backend.put("contended", format!("{i}").as_bytes(), 60).await
            }));
        }

        let mut wins = 0;
        let mut exists = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(CacheError::RecordExists) => exists += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(exists, 15);
    }
}
