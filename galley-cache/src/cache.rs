//! In-memory TTL cache keyed by request fingerprint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use galley_core::constants::{
    DEFAULT_CACHE_CHECK_PERIOD_SECS, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS,
};

use crate::clock::{Clock, SystemClock};

/// Longest TTL an entry can get; longer requests are clamped to it.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cache entry with an absolute expiry.
#[derive(Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    /// Expiry is inclusive: at `expires_at` the entry is already gone.
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// TTL in seconds for writes that do not name one
    pub default_ttl_seconds: u64,
    /// Interval in seconds between background sweeps
    pub check_period_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            default_ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            check_period_seconds: DEFAULT_CACHE_CHECK_PERIOD_SECS,
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    reclaimed: AtomicU64,
}

/// Response cache keyed by request fingerprint.
///
/// Thread-safe. Every entry carries its own TTL fixed at write time. Lookups
/// never return an entry at or past its expiry; such entries are removed on
/// the spot. A background sweeper (see [`FingerprintCache::spawn_sweeper`])
/// reclaims entries that are never read again.
///
/// The lock is never held across an `.await`.
pub struct FingerprintCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl FingerprintCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            clock,
            counters: Counters::default(),
        }
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gets a cached value by fingerprint.
    ///
    /// Returns None if the key was never set or its entry has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();

        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired_at(now) => {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut entries = self.entries.write();
            // Re-check under the write lock; a concurrent set may have refreshed it.
            if entries.get(key).is_some_and(|e| e.is_expired_at(self.clock.now())) {
                entries.remove(key);
                self.counters.reclaimed.fetch_add(1, Ordering::Relaxed);
                trace!(key, "Dropped expired entry on lookup");
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Looks up a live entry without counting a hit or miss and without
    /// reclaiming it if expired.
    pub fn peek(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        self.entries
            .read()
            .get(key)
            .filter(|e| !e.is_expired_at(now))
            .map(|e| e.value.clone())
    }

    /// Stores a value, replacing any existing entry and restarting its expiry.
    ///
    /// `None` or a zero TTL falls back to the configured default. TTLs past
    /// a century are clamped. Always returns `true`.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) -> bool {
        let key = key.into();
        let ttl = ttl
            .filter(|t| !t.is_zero())
            .unwrap_or_else(|| Duration::from_secs(self.config.default_ttl_seconds));
        let now = self.clock.now();
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or_else(|| {
            warn!(ttl_secs = ttl.as_secs(), "TTL overflows the clock; storing without headroom");
            now
        });

        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired_at(now));
            let reclaimed = before - entries.len();
            self.counters.reclaimed.fetch_add(reclaimed as u64, Ordering::Relaxed);

            // Still full? Drop the entry closest to expiry.
            if entries.len() >= self.config.max_entries {
                if let Some(victim) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.expires_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&victim);
                    debug!(key = %victim, "Evicted entry at capacity");
                }
            }
        }

        entries.insert(key, CacheEntry {
            value,
            expires_at,
        });
        self.counters.sets.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Removes an entry. Returns the number removed (0 or 1).
    pub fn delete(&self, key: &str) -> usize {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        }
        usize::from(removed)
    }

    /// Clears all cached entries.
    pub fn flush(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries, returning how many were reclaimed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        let reclaimed = before - entries.len();
        self.counters.reclaimed.fetch_add(reclaimed as u64, Ordering::Relaxed);
        reclaimed
    }

    /// Starts a background task that sweeps expired entries every `period`.
    ///
    /// The task holds only a weak reference and stops once the cache is
    /// dropped. Abort the handle to stop it earlier. Must be called from
    /// within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Cache dropped, stopping sweeper");
                    break;
                };
                let reclaimed = cache.sweep_expired();
                if reclaimed > 0 {
                    debug!(reclaimed, remaining = cache.len(), "Swept expired cache entries");
                }
            }
        })
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.entries.read();
        let expired = entries.values().filter(|e| e.is_expired_at(now)).count();

        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len() - expired,
            capacity: self.config.max_entries,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            sets: self.counters.sets.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
            reclaimed: self.counters.reclaimed.load(Ordering::Relaxed),
        }
    }
}

impl Default for FingerprintCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    /// Total entries (including expired, not yet swept)
    pub total_entries: usize,
    /// Expired entries awaiting reclamation
    pub expired_entries: usize,
    /// Valid (non-expired) entries
    pub valid_entries: usize,
    /// Maximum capacity
    pub capacity: usize,
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned nothing
    pub misses: u64,
    /// Writes
    pub sets: u64,
    /// Explicit deletions that removed an entry
    pub deletes: u64,
    /// Expired entries removed by lookups, sweeps or capacity pressure
    pub reclaimed: u64,
}
