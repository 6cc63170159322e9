//! Route result cache
//!
//! Capacity-bounded, least-recently-used, with per-entry expiry. Each entry
//! also remembers the configuration hash it was computed under; a lookup
//! with a different hash treats the entry as stale and drops it.
//!
//! Both validated routes and rejected strategies are stored. Rejections
//! use a much shorter TTL so a transient failure only suppresses retries
//! briefly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use geofence_core::RouteResponse;
use parking_lot::Mutex;

/// What a cached strategy attempt produced
#[derive(Debug, Clone, PartialEq)]
pub enum CachedOutcome {
    /// A validated route
    Route(Arc<RouteResponse>),
    /// The strategy was rejected for this reason
    Rejected(String),
}

#[derive(Debug)]
struct Entry {
    config_hash: String,
    outcome: CachedOutcome,
    expires_at: Instant,
    tick: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// tick -> key, oldest first
    recency: BTreeMap<u64, String>,
    next_tick: u64,
}

impl Inner {
    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.recency.remove(&entry.tick);
        }
    }
}

#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl ResultCache {
    /// A capacity of zero disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up `key`, valid only under `config_hash` and before expiry
    pub fn get(&self, key: &str, config_hash: &str) -> Option<CachedOutcome> {
        self.get_at(key, config_hash, Instant::now())
    }

    fn get_at(&self, key: &str, config_hash: &str, now: Instant) -> Option<CachedOutcome> {
        let mut inner = self.inner.lock();

        let stale = {
            let entry = inner.entries.get(key)?;
            now >= entry.expires_at || entry.config_hash != config_hash
        };
        if stale {
            inner.remove(key);
            return None;
        }

        let tick = inner.bump();
        let Inner {
            entries, recency, ..
        } = &mut *inner;
        let entry = entries.get_mut(key)?;
        recency.remove(&entry.tick);
        entry.tick = tick;
        recency.insert(tick, key.to_string());
        Some(entry.outcome.clone())
    }

    pub fn insert(&self, key: String, outcome: CachedOutcome, config_hash: &str, ttl: Duration) {
        self.insert_at(key, outcome, config_hash, ttl, Instant::now());
    }

    fn insert_at(
        &self,
        key: String,
        outcome: CachedOutcome,
        config_hash: &str,
        ttl: Duration,
        now: Instant,
    ) {
        let mut inner = self.inner.lock();
        let tick = inner.bump();

        let entry = Entry {
            config_hash: config_hash.to_string(),
            outcome,
            expires_at: now + ttl,
            tick,
        };
        if let Some(old) = inner.entries.insert(key.clone(), entry) {
            inner.recency.remove(&old.tick);
        }
        inner.recency.insert(tick, key);

        while inner.entries.len() > self.capacity {
            let Some((_, lru)) = inner.recency.pop_first() else {
                break;
            };
            inner.entries.remove(&lru);
            tracing::trace!(key = %lru, "Evicted least recently used route");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    fn rejected(reason: &str) -> CachedOutcome {
        CachedOutcome::Rejected(reason.to_string())
    }

    #[test]
    fn test_hit_is_idempotent() {
        let cache = ResultCache::new(10);
        let t0 = Instant::now();
        cache.insert_at("k".into(), rejected("blocked"), "h1", TTL, t0);

        let first = cache.get_at("k", "h1", t0 + Duration::from_secs(1));
        let second = cache.get_at("k", "h1", t0 + Duration::from_secs(2));
        assert_eq!(first, Some(rejected("blocked")));
        assert_eq!(first, second);
    }

    #[test]
    fn test_expiry() {
        let cache = ResultCache::new(10);
        let t0 = Instant::now();
        cache.insert_at("k".into(), rejected("blocked"), "h1", Duration::from_secs(30), t0);

        assert!(cache.get_at("k", "h1", t0 + Duration::from_secs(29)).is_some());
        assert!(cache.get_at("k", "h1", t0 + Duration::from_secs(30)).is_none());
        // Stale entries are removed on access
        assert!(cache.is_empty());
    }

    #[test]
    fn test_config_hash_change_invalidates() {
        let cache = ResultCache::new(10);
        let t0 = Instant::now();
        cache.insert_at("k".into(), rejected("blocked"), "h1", TTL, t0);

        assert!(cache.get_at("k", "h2", t0).is_none());
        assert_eq!(cache.len(), 0);
        // Gone for the old hash too
        assert!(cache.get_at("k", "h1", t0).is_none());
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResultCache::new(2);
        let t0 = Instant::now();
        cache.insert_at("a".into(), rejected("a"), "h", TTL, t0);
        cache.insert_at("b".into(), rejected("b"), "h", TTL, t0);

        // Touch "a" so "b" becomes least recently used
        assert!(cache.get_at("a", "h", t0).is_some());
        cache.insert_at("c".into(), rejected("c"), "h", TTL, t0);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("b", "h", t0).is_none());
        assert!(cache.get_at("a", "h", t0).is_some());
        assert!(cache.get_at("c", "h", t0).is_some());
    }

    #[test]
    fn test_overwrite_refreshes() {
        let cache = ResultCache::new(2);
        let t0 = Instant::now();
        cache.insert_at("a".into(), rejected("old"), "h", Duration::from_secs(1), t0);
        cache.insert_at("b".into(), rejected("b"), "h", TTL, t0);
        cache.insert_at("a".into(), rejected("new"), "h", TTL, t0);
        cache.insert_at("c".into(), rejected("c"), "h", TTL, t0);

        let later = t0 + Duration::from_secs(5);
        assert_eq!(cache.get_at("a", "h", later), Some(rejected("new")));
        assert!(cache.get_at("b", "h", later).is_none());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = ResultCache::new(0);
        cache.insert("a".into(), rejected("a"), "h", TTL);
        assert!(cache.is_empty());
        assert!(cache.get("a", "h").is_none());
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(4);
        cache.insert("a".into(), rejected("a"), "h", TTL);
        cache.insert("b".into(), rejected("b"), "h", TTL);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_insert_and_get() {
        let cache = Arc::new(ResultCache::new(16));

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let cache = cache.clone();
                scope.spawn(move || {
                    for i in 0..500 {
                        let key = format!("k{}", (i * 7 + worker) % 64);
                        if i % 3 == 0 {
                            cache.get(&key, "h");
                        } else {
                            cache.insert(key, rejected("r"), "h", TTL);
                        }
                    }
                });
            }
        });

        assert!(cache.len() <= cache.capacity());
        let inner = cache.inner.lock();
        assert_eq!(inner.entries.len(), inner.recency.len());
        for (tick, key) in &inner.recency {
            assert_eq!(inner.entries[key].tick, *tick);
        }
    }
}
