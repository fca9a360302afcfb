//! Backend decorators
//!
//! Decorators implement the same two-operation capability as the drivers and
//! compose by plain nesting. The fixed order is metrics → rate limiter →
//! driver, so the metrics wrapper observes limiter denials exactly like any
//! other outcome.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::backend::Backend;
use super::error::CacheError;
use super::rate_limiter::RateLimiter;
use crate::metrics::{Metrics, Op, Outcome};

/// Records count, latency and outcome for every backend call.
pub struct InstrumentedBackend {
    inner: Arc<dyn Backend>,
    metrics: Arc<dyn Metrics>,
}

impl InstrumentedBackend {
    pub fn new(inner: Arc<dyn Backend>, metrics: Arc<dyn Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl Backend for InstrumentedBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let started = Instant::now();
        let result = self.inner.get(key).await;

        let outcome = match &result {
            Ok(_) => Outcome::Ok,
            Err(e) => Outcome::from_error(e),
        };
        self.metrics
            .record_backend_call(Op::Get, outcome, started.elapsed());

        result
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        let started = Instant::now();
        let result = self.inner.put(key, value, ttl_seconds).await;

        let outcome = match &result {
            Ok(()) => Outcome::Ok,
            Err(e) => Outcome::from_error(e),
        };
        self.metrics
            .record_backend_call(Op::Put, outcome, started.elapsed());

        result
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Gates writes on the process-wide token bucket. Reads pass through
/// untouched.
pub struct RateLimitedBackend {
    inner: Arc<dyn Backend>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedBackend {
    pub fn new(inner: Arc<dyn Backend>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl Backend for RateLimitedBackend {
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), CacheError> {
        if !self.limiter.allow() {
            return Err(CacheError::RateLimited);
        }
        self.inner.put(key, value, ttl_seconds).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Wrap a driver in the standard decorator pipeline.
pub fn decorate(
    driver: Arc<dyn Backend>,
    limiter: Arc<RateLimiter>,
    metrics: Arc<dyn Metrics>,
) -> Arc<dyn Backend> {
    let limited = Arc::new(RateLimitedBackend::new(driver, limiter));
    Arc::new(InstrumentedBackend::new(limited, metrics))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Driver stub that counts calls
    struct CountingBackend {
        puts: AtomicUsize,
        gets: AtomicUsize,
    }

    impl CountingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                puts: AtomicUsize::new(0),
                gets: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Backend for CountingBackend {
        async fn get(&self, _key: &str) -> Result<Vec<u8>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::KeyNotFound)
        }

        async fn put(&self, _key: &str, _value: &[u8], _ttl: u64) -> Result<(), CacheError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    /// Metrics stub that records backend-call outcomes
    #[derive(Default)]
    struct RecordingMetrics {
        backend_calls: Mutex<Vec<(Op, Outcome)>>,
    }

    impl Metrics for RecordingMetrics {
        fn record_request(&self, _op: Op, _outcome: Outcome, _elapsed: Duration) {}
        fn record_backend_call(&self, op: Op, outcome: Outcome, _elapsed: Duration) {
            self.backend_calls.lock().unwrap().push((op, outcome));
        }
        fn record_connection_opened(&self) {}
        fn record_connection_closed(&self) {}
        fn record_connection_error(&self) {}
        fn set_extra_ttl_seconds(&self, _seconds: u64) {}
    }

    #[tokio::test]
    async fn test_denied_put_never_reaches_driver() {
        let driver = CountingBackend::new();
        let limiter = Arc::new(RateLimiter::new(true, 1));
        let limited = RateLimitedBackend::new(
            Arc::clone(&driver) as Arc<dyn Backend>,
            Arc::clone(&limiter),
        );

        // Drain the bucket, then one more attempt
        while limiter.allow() {}
        assert_eq!(
            limited.put("k", b"v", 0).await,
            Err(CacheError::RateLimited)
        );
        assert_eq!(driver.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_gets_are_never_rate_limited() {
        let driver = CountingBackend::new();
        let limiter = Arc::new(RateLimiter::new(true, 1));
        while limiter.allow() {}

        let limited =
            RateLimitedBackend::new(Arc::clone(&driver) as Arc<dyn Backend>, limiter);
        for _ in 0..50 {
            let _ = limited.get("k").await;
        }
        assert_eq!(driver.gets.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_metrics_observe_limiter_denials() {
        let driver = CountingBackend::new();
        let limiter = Arc::new(RateLimiter::new(true, 1));
        while limiter.allow() {}

        let metrics = Arc::new(RecordingMetrics::default());
        let backend = decorate(
            Arc::clone(&driver) as Arc<dyn Backend>,
            limiter,
            Arc::clone(&metrics) as Arc<dyn Metrics>,
        );

        let _ = backend.put("k", b"v", 0).await;
        let calls = metrics.backend_calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(Op::Put, Outcome::RateLimited)]);
    }

    #[tokio::test]
    async fn test_metrics_record_successes_and_misses() {
        let driver = CountingBackend::new();
        let metrics = Arc::new(RecordingMetrics::default());
        let backend = decorate(
            Arc::clone(&driver) as Arc<dyn Backend>,
            Arc::new(RateLimiter::disabled()),
            Arc::clone(&metrics) as Arc<dyn Metrics>,
        );

        backend.put("k", b"v", 0).await.unwrap();
        let _ = backend.get("k").await;

        let calls = metrics.backend_calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[(Op::Put, Outcome::Ok), (Op::Get, Outcome::NotFound)]
        );
    }

    #[tokio::test]
    async fn test_name_passes_through() {
        let driver = CountingBackend::new();
        let backend = decorate(
            driver as Arc<dyn Backend>,
            Arc::new(RateLimiter::disabled()),
            Arc::new(crate::metrics::NoopMetrics),
        );
        assert_eq!(backend.name(), "counting");
    }
}
