use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

use fontreq_core::{RequestKey, Typeface};

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Fixed-capacity LRU cache of resolved typefaces.
///
/// Not synchronized on its own: the loader keeps it behind the same lock as
/// the pending registry so hit/miss decisions and in-flight bookkeeping are
/// consistent.
pub struct ResultCache {
    cache: LruCache<RequestKey, Typeface>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a typeface, refreshing its recency on hit.
    pub fn get(&mut self, key: &RequestKey) -> Option<Typeface> {
        match self.cache.get(key) {
            Some(typeface) => {
                self.hits += 1;
                Some(typeface.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a typeface, evicting the least recently used entry when full.
    pub fn put(&mut self, key: RequestKey, typeface: Typeface) {
        if let Some((evicted, _)) = self.cache.push(key.clone(), typeface) {
            if evicted != key {
                debug!(key = %evicted, "evicted cached typeface");
            }
        }
    }

    /// Membership test that leaves recency and counters untouched.
    pub fn contains(&self, key: &RequestKey) -> bool {
        self.cache.contains(key)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.cache.len(),
            capacity: self.capacity(),
        }
    }
}
