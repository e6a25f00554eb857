//! Per-resolver token-bucket rate limiting.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use crate::types::RateLimiterStat;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Capacity equals the per-second rate.
    fn refill(&mut self, rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = elapsed.mul_add(rate, self.tokens).min(rate);
        self.last_refill = now;
    }
}

/// Token-bucket limiter keyed by resolver identity.
///
/// Buckets are created lazily on first use and start full. Each bucket sits
/// behind its own FIFO async mutex, so waiters on one key are admitted in
/// arrival order while other keys proceed independently.
pub struct RateLimiter {
    rate: u32,
    buckets: Mutex<HashMap<String, Arc<Mutex<TokenBucket>>>>,
}

impl RateLimiter {
    /// `rate_per_sec == 0` disables limiting.
    pub fn new(rate_per_sec: u32) -> Self {
        Self {
            rate: rate_per_sec,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub const fn rate_limit(&self) -> u32 {
        self.rate
    }

    async fn bucket(&self, key: &str) -> Arc<Mutex<TokenBucket>> {
        let capacity = f64::from(self.rate);
        let mut buckets = self.buckets.lock().await;
        Arc::clone(
            buckets
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::full(capacity)))),
        )
    }

    /// Wait until a token for `key` is available and take it.
    pub async fn acquire(&self, key: &str) {
        if self.rate == 0 {
            return;
        }

        let rate = f64::from(self.rate);
        let bucket = self.bucket(key).await;
        let mut bucket = bucket.lock().await;

        bucket.refill(rate, Instant::now());
        if bucket.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / rate);
            log::debug!("Rate limit reached for resolver {key}, waiting {wait:?}");
            sleep(wait).await;
            bucket.refill(rate, Instant::now());
        }
        bucket.tokens = (bucket.tokens - 1.0).max(0.0);
    }

    /// Snapshot of every bucket created so far, sorted by key.
    ///
    /// A bucket currently held by a waiter is reported with zero tokens.
    pub async fn stats(&self) -> Vec<RateLimiterStat> {
        let rate = f64::from(self.rate);
        let buckets = self.buckets.lock().await;
        let mut stats: Vec<RateLimiterStat> = buckets
            .iter()
            .map(|(key, bucket)| {
                let available_tokens = bucket.try_lock().map_or(0.0, |mut b| {
                    b.refill(rate, Instant::now());
                    b.tokens
                });
                RateLimiterStat {
                    key: key.clone(),
                    rate_limit: self.rate,
                    available_tokens,
                }
            })
            .collect();
        stats.sort_by(|a, b| a.key.cmp(&b.key));
        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_initial_burst_equals_rate() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire("google").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_when_bucket_is_empty() {
        let limiter = RateLimiter::new(5);
        for _ in 0..5 {
            limiter.acquire("google").await;
        }
        let start = Instant::now();
        limiter.acquire("google").await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(190), "waited {waited:?}");
        assert!(waited <= Duration::from_millis(250), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_do_not_block_each_other() {
        let limiter = RateLimiter::new(2);
        limiter.acquire("google").await;
        limiter.acquire("google").await;

        let start = Instant::now();
        limiter.acquire("cloudflare").await;
        limiter.acquire("cloudflare").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquirers_share_rate() {
        let limiter = Arc::new(RateLimiter::new(10));
        let start = Instant::now();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.acquire("quad9").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // 10 from the initial burst, 10 more at 10/s
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(950), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(1100), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_on_one_key_are_granted_in_arrival_order() {
        let limiter = Arc::new(RateLimiter::new(1));
        limiter.acquire("google").await;

        let start = Instant::now();
        let granted = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for index in 0..5_u64 {
            let limiter = Arc::clone(&limiter);
            let granted = Arc::clone(&granted);
            handles.push(tokio::spawn(async move {
                limiter.acquire("google").await;
                granted.lock().await.push((index, start.elapsed().as_secs()));
            }));
            // let this waiter reach the bucket lock before the next one spawns
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let granted = granted.lock().await.clone();
        assert_eq!(granted, (0..5).map(|i| (i, i + 1)).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_disables_limiting() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        for _ in 0..1000 {
            limiter.acquire("system").await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(limiter.stats().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_reports_buckets_sorted() {
        let limiter = RateLimiter::new(30);
        limiter.acquire("quad9").await;
        limiter.acquire("cloudflare").await;
        limiter.acquire("cloudflare").await;

        let stats = limiter.stats().await;
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].key, "cloudflare");
        assert_eq!(stats[0].rate_limit, 30);
        assert!((stats[0].available_tokens - 28.0).abs() < 1e-6);
        assert_eq!(stats[1].key, "quad9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_refill_up_to_capacity() {
        let limiter = RateLimiter::new(4);
        for _ in 0..4 {
            limiter.acquire("opendns").await;
        }
        sleep(Duration::from_secs(10)).await;

        let stats = limiter.stats().await;
        assert!((stats[0].available_tokens - 4.0).abs() < 1e-6);
    }
}
