//! In-memory content-addressed cache used by the fetcher (archive bytes)
//! and the catalog resolver (descriptor lists).
//!
//! Grounded on the teacher's `MultiLevelCache` (LRU L1 + TTL L2,
//! `CacheStats` atomics) but collapsed into a single tier: this cache sits
//! in front of network fetches measured in hundreds of milliseconds, so a
//! safe `RwLock<HashMap<_>>` with lazy TTL eviction costs nothing relative
//! to the original unsafe intrusive-pointer LRU, and keeps the workspace's
//! `unsafe_code = "deny"` lint intact. Request coalescing is preserved via
//! an in-flight map of `Notify` handles so concurrent callers for the same
//! key wait for the first fetch instead of duplicating it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify, RwLock};

/// Counters tracking cache effectiveness, mirroring the teacher's
/// `CacheStats` shape.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    coalesced: AtomicU64,
}

impl CacheStats {
    /// Number of `get` calls that found a live entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of `get` calls that found nothing or an expired entry.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of entries inserted via `put`.
    pub fn insertions(&self) -> u64 {
        self.insertions.load(Ordering::Relaxed)
    }

    /// Number of entries evicted for capacity or expiry.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Number of concurrent callers that waited on an in-flight fetch
    /// instead of issuing their own.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

struct Inflight {
    notify: Arc<Notify>,
}

/// A capacity-bounded, TTL-evicting cache keyed by an opaque string
/// (archive URL, or a descriptor-list cache key like `"owner/language"`).
///
/// The engine must behave correctly when this cache is disabled
/// (`EngineConfig::cache_enabled == false`): callers are expected to treat
/// a `None` from `get` identically whether it means "disabled", "miss", or
/// "expired".
pub struct ContentCache<V: Clone + Send + Sync + 'static> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    inflight: Mutex<HashMap<String, Inflight>>,
    capacity: usize,
    stats: CacheStats,
}

impl<V: Clone + Send + Sync + 'static> ContentCache<V> {
    /// Create a cache bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Look up `key`, returning `None` on miss or expiry. An expired entry
    /// found during lookup is lazily removed.
    pub async fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if !entry.is_expired() {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
            } else {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }
        // Entry existed but was expired; remove it under a write lock.
        let mut entries = self.entries.write().await;
        entries.remove(key);
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert `value` for `key` with the given TTL, evicting an arbitrary
    /// entry if the cache is at capacity.
    pub async fn put(&self, key: String, value: V, ttl: Duration) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(victim) = entries.keys().next().cloned() {
                entries.remove(&victim);
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
        self.stats.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Fetch-through with request coalescing: if `key` is cached and live,
    /// return it; otherwise run `fetch` to populate it, but only once per
    /// key even under concurrent callers — everyone else waits on the
    /// first caller's result.
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` returns on miss; propagates the error to
    /// every waiter coalesced onto this call.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }

        let notify = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(key) {
                let notify = existing.notify.clone();
                self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                Some(notify)
            } else {
                inflight.insert(
                    key.to_string(),
                    Inflight {
                        notify: Arc::new(Notify::new()),
                    },
                );
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            if let Some(hit) = self.get(key).await {
                return Ok(hit);
            }
            // The leader's fetch failed; fall through and try ourselves.
        }

        let result = fetch().await;
        if let Ok(value) = &result {
            self.put(key.to_string(), value.clone(), ttl).await;
        }
        if let Some(leader) = self.inflight.lock().await.remove(key) {
            leader.notify.notify_waiters();
        }
        result
    }

    /// Snapshot of effectiveness counters.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Remove all entries. Used by tests and by callers that want to force
    /// a cold run.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
