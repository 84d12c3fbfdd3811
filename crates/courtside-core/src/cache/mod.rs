// Two-tier result cache: a volatile in-process map in front of a durable
// store shared across processes.
//
// Reads check the volatile tier, then the durable tier (promoting fresh hits).
// Writes go to both tiers. Durable-tier failures are logged and swallowed;
// the volatile tier keeps the session correct.

pub mod entry;
pub mod keys;
pub mod policy;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub use entry::CacheEntry;
pub use keys::{CacheKey, Invalidation, Mutation};
pub use policy::{TtlCategory, TtlPolicy};

// ---------------------------------------------------------------------------
// Durable tier
// ---------------------------------------------------------------------------

/// Storage behind the volatile tier. Values travel as JSON text.
///
/// Implementations need no coordination between processes: last writer
/// wins, and every reader re-checks the TTL.
pub trait DurableTier: Send + Sync {
    fn load(&self, key: &str) -> anyhow::Result<Option<CacheEntry<String>>>;
    fn store(&self, key: &str, entry: &CacheEntry<String>) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
    /// Remove every key containing `pattern` as a plain substring.
    fn remove_matching(&self, pattern: &str) -> anyhow::Result<usize>;
    fn clear(&self) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Snapshot of cache activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub volatile_hits: u64,
    pub durable_hits: u64,
    pub misses: u64,
    pub durable_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    volatile_hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
    durable_errors: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// ResultCache
// ---------------------------------------------------------------------------

/// The cache service. Construct one per process and share it by reference
/// (or `Arc`); tests build isolated instances.
pub struct ResultCache {
    volatile: Mutex<HashMap<String, CacheEntry<Value>>>,
    durable: Option<Box<dyn DurableTier>>,
    policy: TtlPolicy,
    counters: Counters,
}

impl ResultCache {
    pub fn new(durable: Box<dyn DurableTier>, policy: TtlPolicy) -> Self {
        Self {
            volatile: Mutex::new(HashMap::new()),
            durable: Some(durable),
            policy,
            counters: Counters::default(),
        }
    }

    /// A cache with no durable tier; entries die with the process.
    pub fn volatile_only(policy: TtlPolicy) -> Self {
        Self {
            volatile: Mutex::new(HashMap::new()),
            durable: None,
            policy,
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            volatile_hits: self.counters.volatile_hits.load(Ordering::Relaxed),
            durable_hits: self.counters.durable_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            durable_errors: self.counters.durable_errors.load(Ordering::Relaxed),
        }
    }

    /// The volatile map is never left half-updated, so a poisoned lock is
    /// still safe to reuse.
    fn volatile(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.volatile.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up `key`, volatile tier first. Expired or unreadable entries are
    /// evicted from the tier they were found in and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let now = Utc::now();

        if let Some(value) = self.volatile_lookup(key.as_str(), now) {
            match serde_json::from_value::<T>(value) {
                Ok(v) => {
                    Counters::bump(&self.counters.volatile_hits);
                    debug!(key = %key, "cache hit (volatile)");
                    return Some(v);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "evicting unreadable volatile entry");
                    self.volatile().remove(key.as_str());
                }
            }
        }

        if let Some(v) = self.durable_lookup::<T>(key, now) {
            Counters::bump(&self.counters.durable_hits);
            debug!(key = %key, "cache hit (durable)");
            return Some(v);
        }

        Counters::bump(&self.counters.misses);
        debug!(key = %key, "cache miss");
        None
    }

    fn volatile_lookup(&self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        let mut map = self.volatile();
        let expired = map.get(key)?.is_expired_at(now);
        if expired {
            map.remove(key);
            return None;
        }
        map.get(key).map(|entry| entry.value.clone())
    }

    fn durable_lookup<T: DeserializeOwned>(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<T> {
        let durable = self.durable.as_ref()?;

        let entry = match durable.load(key.as_str()) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                Counters::bump(&self.counters.durable_errors);
                warn!(key = %key, error = %e, "durable cache read failed");
                return None;
            }
        };

        if entry.is_expired_at(now) {
            self.durable_remove(key.as_str());
            return None;
        }

        let decoded = serde_json::from_str::<Value>(&entry.value).and_then(|value| {
            let typed = serde_json::from_value::<T>(value.clone())?;
            Ok((value, typed))
        });
        match decoded {
            Ok((value, typed)) => {
                // Keep the original stamp so promotion never extends a lifetime.
                self.volatile()
                    .insert(key.as_str().to_string(), entry.map(|_| value));
                Some(typed)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "evicting corrupt durable entry");
                self.durable_remove(key.as_str());
                None
            }
        }
    }

    /// Write `value` under `key` with the TTL of `category`.
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T, category: TtlCategory) {
        self.set_with_ttl(key, value, self.policy.ttl(category));
    }

    /// Write `value` to both tiers stamped with the current time.
    ///
    /// A zero TTL is refused. A durable-tier failure is logged and the
    /// volatile write stands.
    pub fn set_with_ttl<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            warn!(key = %key, "refusing cache write with zero ttl");
            return;
        }

        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "value is not serializable, skipping cache write");
                return;
            }
        };
        let entry = CacheEntry::new(value, Utc::now(), ttl);

        if let Some(durable) = &self.durable {
            let stored = entry.clone().map(|value| value.to_string());
            if let Err(e) = durable.store(key.as_str(), &stored) {
                Counters::bump(&self.counters.durable_errors);
                warn!(key = %key, error = %e, "durable cache write failed");
            }
        }

        self.volatile().insert(key.as_str().to_string(), entry);
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "cache set");
    }

    /// Remove `key` from both tiers.
    pub fn invalidate(&self, key: &CacheKey) {
        self.volatile().remove(key.as_str());
        self.durable_remove(key.as_str());
        debug!(key = %key, "cache invalidate");
    }

    /// Remove every key in both tiers that contains `pattern` as a plain
    /// substring. Returns how many volatile entries were dropped.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let removed = {
            let mut map = self.volatile();
            let before = map.len();
            map.retain(|key, _| !key.contains(pattern));
            before - map.len()
        };

        if let Some(durable) = &self.durable {
            match durable.remove_matching(pattern) {
                Ok(n) => debug!(pattern, volatile = removed, durable = n, "cache invalidate pattern"),
                Err(e) => {
                    Counters::bump(&self.counters.durable_errors);
                    warn!(pattern, error = %e, "durable cache pattern invalidation failed");
                }
            }
        }

        removed
    }

    /// Apply every invalidation a raw-record mutation calls for.
    pub fn apply(&self, mutation: &Mutation) {
        for invalidation in mutation.invalidations() {
            match invalidation {
                Invalidation::Key(key) => self.invalidate(&key),
                Invalidation::Pattern(pattern) => {
                    self.invalidate_pattern(pattern);
                }
            }
        }
    }

    /// Empty both tiers.
    pub fn clear_all(&self) {
        self.volatile().clear();
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.clear() {
                Counters::bump(&self.counters.durable_errors);
                warn!(error = %e, "durable cache clear failed");
            }
        }
    }

    fn durable_remove(&self, key: &str) {
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.remove(key) {
                Counters::bump(&self.counters.durable_errors);
                warn!(key, error = %e, "durable cache remove failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
