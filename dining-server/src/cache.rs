//! In-memory TTL cache
//!
//! String-keyed entries expire after a time-to-live. Reads check expiry
//! themselves, so an expired entry is never returned even if the background
//! sweep has not removed it yet.
//!
//! Read-through callers use [`TtlCache::epoch`] and
//! [`TtlCache::set_if_unchanged`] so a value loaded before an invalidation is
//! never written back after it.

use crate::core::config::CacheConfig;
use crate::core::tasks::PeriodicTask;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

type Entries<V> = Arc<RwLock<HashMap<String, CacheEntry<V>>>>;

/// Longest accepted TTL; larger values are clamped
pub const MAX_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now)
}

/// Expiring key/value store with a background sweep
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Entries<V>,
    /// Bumped under the write lock by every `delete` and `clear`
    epoch: AtomicU64,
    default_ttl: Duration,
    sweeper: PeriodicTask,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        let entries: Entries<V> = Arc::new(RwLock::new(HashMap::new()));

        let sweep_entries = entries.clone();
        let sweeper = PeriodicTask::spawn("cache_sweep", config.cleanup_interval, move || {
            let removed = purge_expired(&sweep_entries, Instant::now());
            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            }
        });

        Self {
            entries,
            epoch: AtomicU64::new(0),
            default_ttl: config.default_ttl.min(MAX_TTL),
            sweeper,
        }
    }

    /// Live value for `key`, if any
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Store with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store with an explicit TTL, clamped to [`MAX_TTL`]
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: expiry(Instant::now(), ttl),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Current invalidation epoch
    ///
    /// Read it before loading a value from the source of truth.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Store with the default TTL unless a `delete` or `clear` ran since
    /// `epoch` was read; `false` when the value was dropped
    pub fn set_if_unchanged(&self, key: impl Into<String>, value: V, epoch: u64) -> bool {
        let mut entries = self.entries.write();
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        let entry = CacheEntry {
            value,
            expires_at: expiry(Instant::now(), self.default_ttl),
        };
        entries.insert(key.into(), entry);
        true
    }

    /// Remove `key`; `true` if an entry (live or expired) was present
    pub fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    /// Entry count, including expired entries not yet swept
    pub fn size(&self) -> usize {
        self.entries.read().len()
    }

    /// Halt the sweep (idempotent)
    pub fn stop(&self) {
        self.sweeper.stop();
    }
}

fn purge_expired<V>(entries: &RwLock<HashMap<String, CacheEntry<V>>>, now: Instant) -> usize {
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|_, e| e.is_live(now));
    before - entries.len()
}
