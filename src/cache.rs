//! Memoized embedding cache
//!
//! Every repetition owns one cache. An item is embedded at most once per
//! cache; failed computations are not stored, so a later call retries.

use std::collections::HashMap;
use std::sync::Arc;

use crate::embedding::Embedding;
use crate::error::EvalResult;

/// Lazily populated `ItemId -> Embedding` store
pub trait EmbeddingCache {
    /// Return the cached embedding for `item_id`, computing and storing it on a miss.
    ///
    /// `compute` runs only on a miss. If it fails the error is returned and
    /// nothing is cached.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `compute`.
    fn get_or_compute<F>(&mut self, item_id: &str, compute: F) -> EvalResult<Arc<Embedding>>
    where
        F: FnOnce(&str) -> EvalResult<Embedding>;

    /// Cached embedding, if present
    fn get(&self, item_id: &str) -> Option<Arc<Embedding>>;

    /// Number of cached embeddings
    fn len(&self) -> usize;

    /// Whether the cache is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: usize,
    /// Lookups that invoked the compute function
    pub misses: usize,
    /// Misses whose compute function failed
    pub failures: usize,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Hash-map backed [`EmbeddingCache`] without eviction
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: HashMap<String, Arc<Embedding>>,
    stats: CacheStats,
}

impl MemoCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache sized for `capacity` items
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Hit/miss counters so far
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl EmbeddingCache for MemoCache {
    fn get_or_compute<F>(&mut self, item_id: &str, compute: F) -> EvalResult<Arc<Embedding>>
    where
        F: FnOnce(&str) -> EvalResult<Embedding>,
    {
        if let Some(hit) = self.entries.get(item_id) {
            self.stats.hits += 1;
            return Ok(Arc::clone(hit));
        }

        self.stats.misses += 1;
        let embedding = match compute(item_id) {
            Ok(embedding) => Arc::new(embedding),
            Err(e) => {
                self.stats.failures += 1;
                return Err(e);
            }
        };
        self.entries
            .insert(item_id.to_string(), Arc::clone(&embedding));
        Ok(embedding)
    }

    fn get(&self, item_id: &str) -> Option<Arc<Embedding>> {
        self.entries.get(item_id).cloned()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use std::cell::Cell;

    #[test]
    fn test_compute_once_per_id() {
        let calls = Cell::new(0);
        let mut cache = MemoCache::new();
        let compute = |_: &str| {
            calls.set(calls.get() + 1);
            Ok(Embedding::new(vec![1.0, 2.0]))
        };

        let first = cache.get_or_compute("utt-1", compute).expect("first");
        let second = cache.get_or_compute("utt-1", compute).expect("second");

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_distinct_ids_computed_separately() {
        let mut cache = MemoCache::new();
        cache
            .get_or_compute("a", |_| Ok(Embedding::new(vec![1.0])))
            .expect("a");
        cache
            .get_or_compute("b", |_| Ok(Embedding::new(vec![2.0])))
            .expect("b");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b").map(|e| e.vector()[0]), Some(2.0));
    }

    #[test]
    fn test_failure_not_cached() {
        let mut cache = MemoCache::new();
        let err = cache
            .get_or_compute("bad", |id| {
                Err(EvalError::EmbeddingCompute {
                    item_id: id.to_string(),
                    reason: "device lost".into(),
                })
            })
            .expect_err("compute fails");
        assert_eq!(err.item_id(), Some("bad"));
        assert!(cache.is_empty());
        assert!(cache.get("bad").is_none());

        let retried = cache
            .get_or_compute("bad", |_| Ok(Embedding::new(vec![0.5])))
            .expect("retry succeeds");
        assert_eq!(retried.vector(), &[0.5]);
        assert_eq!(cache.stats().failures, 1);
        assert_eq!(cache.stats().misses, 2);
    }
}
