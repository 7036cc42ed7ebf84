/*
 * TTL + LRU cache store
 *
 * Lookup order: TTL expiry check first, then LRU promotion. Eviction is
 * least-recently-used once the entry ceiling is reached. All three named
 * caches hang off one coordinator; operations on each cache are serialized
 * through its own lock.
 */

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

use super::error::{CacheError, CacheResult};
use super::types::{CacheConfig, CacheEntry, CacheKind, CacheStats, CachedArtifact};

/// Single cache: LRU-bounded entries with TTL expiry on lookup
pub struct TtlLruCache {
    entries: LruCache<String, CacheEntry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl TtlLruCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    /// Lookup with TTL check; a hit bumps the access count and recency
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.inserted.elapsed() > self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };
        if expired {
            self.entries.pop(key);
            self.expirations += 1;
            self.misses += 1;
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_access = Instant::now();
        self.hits += 1;

        match &entry.value {
            CachedArtifact::Json(value) => Some(value.clone()),
            CachedArtifact::Compressed(bytes) => serde_json::from_slice(bytes).ok(),
        }
    }

    pub fn put(&mut self, key: String, value: Value) {
        let replacing = self.entries.contains(&key);
        if !replacing && self.entries.len() == self.entries.cap().get() {
            self.evictions += 1;
        }
        self.entries.push(key, CacheEntry::new(value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert rarely-accessed live entries to their compact serialized
    /// form. Repeat invocations are no-ops for already-compressed entries.
    pub fn compress_rare(&mut self, access_threshold: u64) -> usize {
        let mut compressed = 0;
        for (_, entry) in self.entries.iter_mut() {
            if entry.access_count >= access_threshold {
                continue;
            }
            if let CachedArtifact::Json(value) = &entry.value {
                if let Ok(bytes) = serde_json::to_vec(value) {
                    entry.value = CachedArtifact::Compressed(bytes);
                    compressed += 1;
                }
            }
        }
        compressed
    }

    /// Drop entries older than `age`
    pub fn evict_stale(&mut self, age: Duration) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted.elapsed() > age)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.entries.pop(key);
            self.evictions += 1;
        }
        stale.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            len: self.entries.len(),
        }
    }
}

/// Coordinator owning the three named caches.
///
/// Derived, rebuildable state only: clearing any cache is always safe.
pub struct AnalysisCaches {
    query: Mutex<TtlLruCache>,
    analysis: Mutex<TtlLruCache>,
    cpg: Mutex<TtlLruCache>,
    config: CacheConfig,
}

impl AnalysisCaches {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            query: Mutex::new(TtlLruCache::new(config.query_capacity, config.query_ttl)),
            analysis: Mutex::new(TtlLruCache::new(
                config.analysis_capacity,
                config.analysis_ttl,
            )),
            cpg: Mutex::new(TtlLruCache::new(config.cpg_capacity, config.cpg_ttl)),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn cache(&self, kind: CacheKind) -> &Mutex<TtlLruCache> {
        match kind {
            CacheKind::QueryResult => &self.query,
            CacheKind::Analysis => &self.analysis,
            CacheKind::Cpg => &self.cpg,
        }
    }

    pub fn get(&self, kind: CacheKind, key: &str) -> Option<Value> {
        self.cache(kind).lock().get(key)
    }

    pub fn put(&self, kind: CacheKind, key: impl Into<String>, value: Value) {
        self.cache(kind).lock().put(key.into(), value);
    }

    /// Serialize and store any model value
    pub fn put_serialized<T: serde::Serialize>(
        &self,
        kind: CacheKind,
        key: impl Into<String>,
        value: &T,
    ) -> CacheResult<()> {
        let json = serde_json::to_value(value).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        self.put(kind, key, json);
        Ok(())
    }

    pub fn clear(&self, kind: CacheKind) {
        debug!(cache = kind.as_str(), "clearing cache");
        self.cache(kind).lock().clear();
    }

    pub fn clear_all(&self) {
        for kind in CacheKind::all() {
            self.clear(kind);
        }
    }

    pub fn stats(&self, kind: CacheKind) -> CacheStats {
        self.cache(kind).lock().stats()
    }

    pub(crate) fn compress_rare(&self, kind: CacheKind) -> usize {
        self.cache(kind)
            .lock()
            .compress_rare(self.config.rare_access_threshold)
    }

    pub(crate) fn evict_stale(&self, kind: CacheKind) -> usize {
        self.cache(kind).lock().evict_stale(self.config.stale_age)
    }
}

impl Default for AnalysisCaches {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
