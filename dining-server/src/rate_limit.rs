//! Per-client token bucket rate limiter
//!
//! Each client identifier owns a bucket that starts full (`burst_size`
//! tokens) and refills continuously at `requests_per_second`. An allowed call
//! spends one token. Buckets idle for longer than `idle_timeout` are evicted
//! by a background sweep.

use crate::core::config::RateLimitConfig;
use crate::core::tasks::PeriodicTask;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(max_tokens: f64, now: Instant) -> Self {
        Self {
            tokens: max_tokens,
            max_tokens,
            last_refill: now,
        }
    }

    fn refill(&mut self, rate: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

type Buckets = Arc<RwLock<HashMap<String, TokenBucket>>>;

/// Token bucket limiter keyed by client identifier
///
/// Must be created inside a tokio runtime: construction spawns the idle
/// bucket sweep, which runs until [`RateLimiter::stop`] or drop.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Buckets,
    rate: f64,
    max_tokens: f64,
    sweeper: PeriodicTask,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let buckets: Buckets = Arc::new(RwLock::new(HashMap::new()));
        let idle_timeout = config.idle_timeout;

        let sweep_buckets = buckets.clone();
        let sweeper = PeriodicTask::spawn("rate_limit_sweep", config.cleanup_interval, move || {
            let evicted = sweep_idle(&sweep_buckets, idle_timeout, Instant::now());
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted idle rate limit buckets");
            }
        });

        tracing::info!(
            rps = config.requests_per_second,
            burst = config.burst_size,
            "Rate limiter started"
        );

        Self {
            buckets,
            rate: config.requests_per_second.max(0.0),
            max_tokens: f64::from(config.burst_size),
            sweeper,
        }
    }

    /// Spend one token for `identifier`; `false` when the bucket is empty
    pub fn allow(&self, identifier: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.write();

        let allowed = if let Some(bucket) = buckets.get_mut(identifier) {
            bucket.refill(self.rate, now);
            bucket.try_take()
        } else {
            let mut bucket = TokenBucket::full(self.max_tokens, now);
            let allowed = bucket.try_take();
            buckets.insert(identifier.to_string(), bucket);
            allowed
        };

        if !allowed {
            tracing::warn!(client = %identifier, "Rate limit exceeded");
        }
        allowed
    }

    /// Number of tracked client buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Halt the idle sweep (idempotent)
    pub fn stop(&self) {
        self.sweeper.stop();
    }

    #[cfg(test)]
    fn tokens(&self, identifier: &str) -> Option<f64> {
        self.buckets.read().get(identifier).map(|b| b.tokens)
    }
}

fn sweep_idle(buckets: &RwLock<HashMap<String, TokenBucket>>, idle_timeout: Duration, now: Instant) -> usize {
    let mut buckets = buckets.write();
    let before = buckets.len();
    buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) <= idle_timeout);
    before - buckets.len()
}
