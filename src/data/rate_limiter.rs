//! Process-wide token bucket for the write path
//!
//! One bucket per process, refilled continuously over wall time at the
//! configured rate and holding at most one second's worth of tokens. Every
//! put attempt spends one token; an empty bucket denies immediately, there is
//! no queueing. State lives in two atomics, so checks never block; under
//! extreme contention the accounting may be off by a single token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Micro-tokens per token. Refill math stays in integer space: a rate of
/// `r` tokens/second is exactly `r` micro-tokens per microsecond of elapsed
/// wall time.
const TOKEN: u64 = 1_000_000;

pub struct RateLimiter {
    enabled: bool,
    /// Refill rate in tokens per second
    rate: u64,
    /// Bucket bound in micro-tokens (one second of refill)
    capacity: u64,
    /// Available micro-tokens
    tokens: AtomicU64,
    /// Microseconds since `origin` at the last refill
    last_refill: AtomicU64,
    origin: Instant,
}

impl RateLimiter {
    /// Create a limiter refilling `num_requests` tokens per second.
    pub fn new(enabled: bool, num_requests: u64) -> Self {
        let rate = num_requests.max(1);
        let capacity = rate * TOKEN;
        Self {
            enabled,
            rate,
            capacity,
            tokens: AtomicU64::new(capacity),
            last_refill: AtomicU64::new(0),
            origin: Instant::now(),
        }
    }

    /// Create a limiter that always allows.
    pub fn disabled() -> Self {
        Self::new(false, 1)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Try to spend one token. Returns false when the bucket is empty.
    pub fn allow(&self) -> bool {
        if !self.enabled {
            return true;
        }

        let now = self.origin.elapsed().as_micros() as u64;
        let last = self.last_refill.swap(now, Ordering::AcqRel);
        let elapsed = now.saturating_sub(last);
        if elapsed > 0 {
            let refill = elapsed.saturating_mul(self.rate);
            let capacity = self.capacity;
            let _ = self.tokens.fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(refill).min(capacity))
            });
        }

        self.tokens
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| t.checked_sub(TOKEN))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_disabled_always_allows() {
        let limiter = RateLimiter::disabled();
        for _ in 0..10_000 {
            assert!(limiter.allow());
        }
    }

    #[test]
    fn test_burst_drains_bucket() {
        let limiter = RateLimiter::new(true, 5);

        let allowed = (0..20).filter(|_| limiter.allow()).count();
        // Full bucket holds one second of tokens; nothing refills in a tight loop.
        assert!(allowed >= 5, "expected at least the burst, got {allowed}");
        assert!(allowed <= 6, "expected ~burst size, got {allowed}");

        assert!(!limiter.allow());
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let limiter = RateLimiter::new(true, 10);
        while limiter.allow() {}

        tokio::time::sleep(Duration::from_millis(250)).await;

        // ~2.5 tokens refilled at 10/s
        let allowed = (0..10).filter(|_| limiter.allow()).count();
        assert!((1..=4).contains(&allowed), "got {allowed}");
    }

    #[tokio::test]
    async fn test_rate_one_allows_about_one_per_second() {
        let limiter = RateLimiter::new(true, 1);

        let first_window = (0..20).filter(|_| limiter.allow()).count();
        assert_eq!(first_window, 1);

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        let second_window = (0..20).filter(|_| limiter.allow()).count();
        assert_eq!(second_window, 1);
    }

    #[test]
    fn test_concurrent_spends_stay_bounded() {
        let limiter = Arc::new(RateLimiter::new(true, 100));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(std::thread::spawn(move || {
                (0..1_000).filter(|_| limiter.allow()).count()
            }));
        }

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // Initial burst plus a sliver of refill while the threads run; one
        // token of slack is tolerated by design.
        assert!(allowed >= 100, "got {allowed}");
        assert!(allowed <= 150, "got {allowed}");
    }
}
