//! Memoization cache with an explicit eviction policy, backed by moka.
//!
//! A new distinct key always creates a new entry. With `EvictionPolicy::Ttl`
//! an entry older than the window is no longer returned and is refreshed on the
//! next lookup; with `EvictionPolicy::Never` entries live as long as the cache.

use moka::sync::Cache as MokaCache;
use std::hash::Hash;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Entries go stale after the given freshness window.
    Ttl(Duration),
    /// Entries live until the cache is dropped.
    Never,
}

pub struct Cache<K, V> {
    inner: MokaCache<K, V>,
    hits: u64,
    misses: u64,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(policy: EvictionPolicy) -> Self {
        let builder = MokaCache::builder();
        let inner = match policy {
            EvictionPolicy::Ttl(window) => builder.time_to_live(window).build(),
            EvictionPolicy::Never => builder.build(),
        };
        Self {
            inner,
            hits: 0,
            misses: 0,
        }
    }

    /// Fresh cached value for `key`, if any. Does not touch hit/miss counters.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    /// Return the fresh value for `key`, or compute, store and return it.
    /// An error from `f` is propagated and nothing is cached.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.inner.get(&key) {
            self.hits += 1;
            log::debug!("cache hit ({} hits, {} misses)", self.hits, self.misses);
            return Ok(v);
        }
        self.misses += 1;
        log::debug!("cache miss ({} hits, {} misses)", self.hits, self.misses);
        let value = f()?;
        self.inner.insert(key, value.clone());
        Ok(value)
    }

    /// Apply pending evictions, expired entries included.
    pub fn purge_expired(&self) {
        self.inner.run_pending_tasks();
    }

    /// Live entries after pending evictions have run.
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        self.inner.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
