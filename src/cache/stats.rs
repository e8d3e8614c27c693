//! Cache Statistics Module
//!
//! Tracks cache metrics including hits, misses, evictions and resident size.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of failed lookups (absent key, or refused while loading)
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Number of inserts that were dropped (invalid, duplicate, no room)
    pub rejected: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current aggregate payload size in bytes
    pub total_size: u64,
    /// Configured capacity in bytes
    pub capacity: u64,
    /// Whether the startup population is still running
    pub loading: bool,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Fill Ratio ==
    /// Fraction of capacity currently resident. May exceed 1.0 when an
    /// oversized entry was admitted.
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.total_size as f64 / self.capacity as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }
}
