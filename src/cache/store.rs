//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and
//! byte-based capacity accounting.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::config::{CacheConfig, EvictionMode, OversizedEntryPolicy};

// == Insert Outcome ==
/// Result of a single insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored, after evicting `evicted` older entries.
    Inserted { evicted: usize },
    /// Empty key or empty payload.
    InvalidInput,
    /// Key already present; the resident entry was kept.
    DuplicateKey,
    /// Payload exceeds capacity and the policy rejects it.
    Oversized,
    /// Rotation mode only: payload does not fit in the remaining space.
    NoRoom,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

// == Cache Store ==
/// Byte-bounded blob storage with LRU eviction.
///
/// The entry map, the recency index and the running size are only ever
/// mutated together inside one `&mut self` call, so callers that guard the
/// store with a single lock get all three updated atomically.
#[derive(Debug)]
pub struct CacheStore {
    /// Key to blob storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Running sum of entry sizes
    total_size: u64,
    /// Maximum aggregate size in bytes
    capacity: u64,
    eviction_mode: EvictionMode,
    oversized_policy: OversizedEntryPolicy,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new LRU store with the given byte capacity.
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            total_size: 0,
            capacity,
            eviction_mode: EvictionMode::Lru,
            oversized_policy: OversizedEntryPolicy::EvictAll,
            stats: CacheStats::new(),
        }
    }

    /// Creates a store with the capacity and policies of `config`.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            eviction_mode: config.eviction_mode,
            oversized_policy: config.oversized_policy,
            ..Self::new(config.capacity)
        }
    }

    // == Insert ==
    /// Stores a blob under a new key.
    ///
    /// Empty keys, empty payloads and existing keys are rejected without
    /// touching the store. In LRU mode the least recently used entries are
    /// evicted until the payload fits; a payload larger than the capacity
    /// either empties the whole store and is kept anyway, or is rejected,
    /// depending on the oversized policy. In rotation mode nothing is evicted
    /// and a payload that does not fit is rejected.
    pub fn insert(&mut self, key: String, payload: Vec<u8>) -> InsertOutcome {
        if key.is_empty() || payload.is_empty() {
            self.stats.record_rejection();
            return InsertOutcome::InvalidInput;
        }

        if self.entries.contains_key(&key) {
            self.stats.record_rejection();
            return InsertOutcome::DuplicateKey;
        }

        let entry = CacheEntry::new(payload);
        let size = entry.size();

        if size > self.capacity && self.oversized_policy == OversizedEntryPolicy::Reject {
            self.stats.record_rejection();
            return InsertOutcome::Oversized;
        }

        let mut evicted = 0;
        match self.eviction_mode {
            EvictionMode::Lru => {
                while !self.fits(size) && self.evict_oldest().is_some() {
                    evicted += 1;
                }
            }
            EvictionMode::Rotation { .. } => {
                if !self.fits(size) {
                    self.stats.record_rejection();
                    return InsertOutcome::NoRoom;
                }
            }
        }

        self.lru.touch(&key);
        self.entries.insert(key, entry);
        self.total_size += size;

        InsertOutcome::Inserted { evicted }
    }

    // == Get ==
    /// Returns a copy of the payload stored under `key`.
    ///
    /// Recency is left untouched; only `lift` and inserts reorder entries.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.copy_payload())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Contains ==
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Lift ==
    /// Marks `key` as most recently used. No-op if absent.
    pub fn lift(&mut self, key: &str) -> bool {
        self.lru.lift(key)
    }

    // == Remove ==
    /// Removes a single entry and returns its size.
    pub fn remove(&mut self, key: &str) -> Option<u64> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.total_size -= entry.size();
        Some(entry.size())
    }

    // == Evict Oldest ==
    /// Evicts the least recently used entry, returning its key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let key = self.lru.evict_oldest()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.total_size -= entry.size();
            debug!(key = %key, size = entry.size(), "evicted blob");
        }
        self.stats.record_eviction();
        Some(key)
    }

    // == Clear ==
    /// Drops every entry and resets the running size.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.total_size = 0;
    }

    /// Whether a payload of `size` bytes fits without eviction.
    pub fn fits(&self, size: u64) -> bool {
        self.total_size.saturating_add(size) <= self.capacity
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Counts a lookup that was refused before reaching the map.
    pub fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    /// Counts an insert that was refused before reaching the map.
    pub fn record_rejection(&mut self) {
        self.stats.record_rejection();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entries.len(),
            total_size: self.total_size,
            capacity: self.capacity,
            ..self.stats.clone()
        }
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &str> + '_ {
        self.lru.iter()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that the map, the recency index and the running size agree.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let sum: u64 = self.entries.values().map(CacheEntry::size).sum();
        sum == self.total_size
            && self.lru.len() == self.entries.len()
            && self.lru.iter().all(|key| self.entries.contains_key(key))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KIB: u64 = 1024;

    fn blob(size: u64, fill: u8) -> Vec<u8> {
        vec![fill; size as usize]
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_insert_and_get() {
        let mut store = CacheStore::new(100);

        let outcome = store.insert("key1".to_string(), vec![1, 2, 3]);
        assert_eq!(outcome, InsertOutcome::Inserted { evicted: 0 });

        assert_eq!(store.get("key1"), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 3);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(100);
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_rejects_invalid_input() {
        let mut store = CacheStore::new(100);

        assert_eq!(
            store.insert(String::new(), vec![1]),
            InsertOutcome::InvalidInput
        );
        assert_eq!(
            store.insert("key".to_string(), Vec::new()),
            InsertOutcome::InvalidInput
        );
        assert!(store.is_empty());
        assert_eq!(store.stats().rejected, 2);
    }

    #[test]
    fn test_store_duplicate_keeps_original() {
        let mut store = CacheStore::new(100);

        store.insert("key1".to_string(), vec![1; 10]);
        let outcome = store.insert("key1".to_string(), vec![2; 20]);

        assert_eq!(outcome, InsertOutcome::DuplicateKey);
        assert_eq!(store.get("key1"), Some(vec![1; 10]));
        assert_eq!(store.total_size(), 10);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_evicts_oldest_by_size() {
        // 1 KiB capacity, 400 B blobs: the third insert must evict the first
        let mut store = CacheStore::new(KIB);

        store.insert("a".to_string(), blob(400, 1));
        store.insert("b".to_string(), blob(400, 2));
        let outcome = store.insert("c".to_string(), blob(400, 3));

        assert_eq!(outcome, InsertOutcome::Inserted { evicted: 1 });
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert!(store.contains("c"));
        assert_eq!(store.total_size(), 800);
        assert!(store.total_size() <= store.capacity());
        assert_eq!(store.stats().evictions, 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_lift_changes_victim() {
        let mut store = CacheStore::new(KIB);

        store.insert("a".to_string(), blob(400, 1));
        store.insert("b".to_string(), blob(400, 2));
        assert!(store.lift("a"));
        store.insert("c".to_string(), blob(400, 3));

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_store_get_does_not_lift() {
        let mut store = CacheStore::new(KIB);

        store.insert("a".to_string(), blob(400, 1));
        store.insert("b".to_string(), blob(400, 2));
        assert!(store.get("a").is_some());
        store.insert("c".to_string(), blob(400, 3));

        assert!(!store.contains("a"));
        assert!(store.contains("b"));
    }

    #[test]
    fn test_store_lift_absent_is_noop() {
        let mut store = CacheStore::new(KIB);
        store.insert("a".to_string(), blob(10, 1));

        assert!(!store.lift("ghost"));
        assert_eq!(store.keys_by_recency().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_store_evicts_several_for_large_entry() {
        let mut store = CacheStore::new(KIB);

        for i in 0..4 {
            store.insert(format!("small{i}"), blob(200, i));
        }
        let outcome = store.insert("big".to_string(), blob(700, 9));

        // 800 resident, need 700 more: must drop three 200 B entries
        assert_eq!(outcome, InsertOutcome::Inserted { evicted: 3 });
        assert_eq!(store.total_size(), 900);
        assert!(store.contains("small3"));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_oversized_evicts_everything() {
        let mut store = CacheStore::new(KIB);

        store.insert("a".to_string(), blob(300, 1));
        store.insert("b".to_string(), blob(300, 2));
        let outcome = store.insert("huge".to_string(), blob(2 * KIB, 3));

        assert_eq!(outcome, InsertOutcome::Inserted { evicted: 2 });
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_size(), 2 * KIB);
        assert!(store.total_size() > store.capacity());

        // The next insert pushes the oversized entry out again
        store.insert("d".to_string(), blob(100, 4));
        assert!(!store.contains("huge"));
        assert_eq!(store.total_size(), 100);
    }

    #[test]
    fn test_store_oversized_rejected_by_policy() {
        let config = CacheConfig::with_capacity(KIB).oversized_policy(OversizedEntryPolicy::Reject);
        let mut store = CacheStore::from_config(&config);

        store.insert("a".to_string(), blob(300, 1));
        let outcome = store.insert("huge".to_string(), blob(2 * KIB, 3));

        assert_eq!(outcome, InsertOutcome::Oversized);
        assert!(store.contains("a"));
        assert_eq!(store.total_size(), 300);
    }

    #[test]
    fn test_store_rotation_mode_never_evicts() {
        let config = CacheConfig::with_capacity(KIB).eviction_mode(EvictionMode::Rotation {
            interval: Duration::from_secs(1),
        });
        let mut store = CacheStore::from_config(&config);

        store.insert("a".to_string(), blob(600, 1));
        let outcome = store.insert("b".to_string(), blob(600, 2));

        assert_eq!(outcome, InsertOutcome::NoRoom);
        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_remove() {
        let mut store = CacheStore::new(KIB);
        store.insert("a".to_string(), blob(100, 1));
        store.insert("b".to_string(), blob(50, 2));

        assert_eq!(store.remove("a"), Some(100));
        assert_eq!(store.remove("a"), None);
        assert_eq!(store.total_size(), 50);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_clear_resets_everything() {
        let mut store = CacheStore::new(KIB);
        store.insert("a".to_string(), blob(100, 1));
        store.insert("b".to_string(), blob(100, 2));

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.total_size(), 0);
        assert!(!store.contains("a"));
        assert_eq!(
            store.insert("a".to_string(), blob(100, 3)),
            InsertOutcome::Inserted { evicted: 0 }
        );
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(KIB);

        store.insert("key1".to_string(), blob(10, 1));
        store.get("key1"); // hit
        store.get("nonexistent"); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size, 10);
        assert_eq!(stats.capacity, KIB);
    }
}
