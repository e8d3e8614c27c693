//! Cache Module
//!
//! Provides byte-bounded in-memory blob storage with LRU eviction.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheStore, InsertOutcome};
