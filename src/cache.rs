//! Bounded result cache with single-flight computation and full-flush
//! eviction.

use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::Result;

// Fixed seeds so keys are stable across processes and restarts.
const KEY_SEEDS: (u64, u64, u64, u64) = (
    0x9e37_79b9_7f4a_7c15,
    0x6c62_272e_07bb_0142,
    0x517c_c1b7_2722_0a95,
    0x2545_f491_4f6c_dd1d,
);

fn stable_hasher() -> impl Hasher {
    ahash::RandomState::with_seeds(KEY_SEEDS.0, KEY_SEEDS.1, KEY_SEEDS.2, KEY_SEEDS.3)
        .build_hasher()
}

/// Stable signature of an ordered context token sequence. Order matters;
/// context is directional, not a set.
pub fn context_signature(context: &[String]) -> u64 {
    let mut hasher = stable_hasher();
    for token in context {
        token.hash(&mut hasher);
    }
    hasher.finish()
}

/// Stable cache key for a query and its ordered context.
pub fn cache_key(query: &str, context: &[String]) -> u64 {
    let mut hasher = stable_hasher();
    query.hash(&mut hasher);
    for token in context {
        token.hash(&mut hasher);
    }
    hasher.finish()
}

#[derive(Debug)]
struct CacheSlot<V> {
    created_at: DateTime<Utc>,
    value: Mutex<Option<V>>,
}

impl<V> CacheSlot<V> {
    fn new() -> Self {
        CacheSlot {
            created_at: Utc::now(),
            value: Mutex::new(None),
        }
    }
}

/// Bounded, key-derived cache of computed results.
///
/// At most one computation runs per key at a time; concurrent callers of the
/// same key block on the in-flight computation and share its result. When an
/// insertion would exceed capacity the entire cache is cleared in one step
/// under the map lock, trading periodic cold-cache latency for O(1) eviction
/// with no per-entry bookkeeping.
#[derive(Debug)]
pub struct SuggestionCache<V> {
    capacity: usize,
    slots: Mutex<AHashMap<u64, Arc<CacheSlot<V>>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<V: Clone> SuggestionCache<V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        SuggestionCache {
            capacity,
            slots: Mutex::new(AHashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Return the cached value for `key`, or run `compute`, cache its result,
    /// and return it.
    ///
    /// A failed computation caches nothing; the next caller retries.
    pub fn get_or_compute<F>(&self, key: u64, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let slot = {
            let mut slots = self.slots.lock();
            match slots.get(&key) {
                Some(slot) => slot.clone(),
                None => {
                    if slots.len() >= self.capacity {
                        slots.clear();
                    }
                    let slot = Arc::new(CacheSlot::new());
                    slots.insert(key, slot.clone());
                    slot
                }
            }
        };

        let mut value = slot.value.lock();
        if let Some(cached) = value.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match compute() {
            Ok(computed) => {
                *value = Some(computed.clone());
                Ok(computed)
            }
            Err(e) => {
                drop(value);
                let mut slots = self.slots.lock();
                if let Some(current) = slots.get(&key)
                    && Arc::ptr_eq(current, &slot)
                {
                    slots.remove(&key);
                }
                Err(e)
            }
        }
    }

    /// Whether a completed result is cached for `key`.
    pub fn contains(&self, key: u64) -> bool {
        let slot = {
            let slots = self.slots.lock();
            slots.get(&key).cloned()
        };
        slot.is_some_and(|slot| slot.value.lock().is_some())
    }

    /// Creation time of the slot for `key`, if present.
    pub fn created_at(&self, key: u64) -> Option<DateTime<Utc>> {
        let slots = self.slots.lock();
        slots.get(&key).map(|slot| slot.created_at)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Number of entries, including in-flight computations.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            capacity: self.capacity,
        }
    }
}

/// Cache performance statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: usize,
    /// Number of cache misses.
    pub misses: usize,
    /// Current number of entries.
    pub entries: usize,
    /// Maximum number of entries.
    pub capacity: usize,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}
