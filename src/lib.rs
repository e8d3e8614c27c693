//! Blob Cache - A disk-backed, capacity-bounded cache for opaque blobs
//!
//! Keeps expensive-to-produce artifacts in memory under a byte budget with
//! LRU eviction, and warms itself from a directory of persisted blobs at
//! startup.

pub mod cache;
pub mod codec;
pub mod config;
pub mod disk;
mod disk_cache;
pub mod error;
pub mod observer;
mod tasks;

pub use cache::CacheStats;
pub use codec::{BlobCodec, GzipCodec, IdentityCodec};
pub use config::{CacheConfig, EvictionMode, OversizedEntryPolicy};
pub use disk::BlobDirectory;
pub use disk_cache::DiskBlobCache;
pub use error::{CacheError, Result};
pub use observer::{PopulationObserver, TracingObserver};
