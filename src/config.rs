//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default resident capacity: 1 GiB.
pub const DEFAULT_CAPACITY: u64 = 1024 * 1024 * 1024;

/// Default headroom left free when populating from disk.
pub const DEFAULT_POPULATION_HEADROOM: u64 = 16 * 1024 * 1024;

/// Default pause between rotation sweeps.
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(10);

// == Eviction Mode ==
/// How the cache makes room once it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionMode {
    /// Evict least-recently-used entries synchronously on every insert that
    /// would overflow capacity.
    #[default]
    Lru,
    /// Never evict on insert. Overflowing inserts are dropped and start a
    /// background sweeper that discards requested entries and refills from
    /// the backing directory every `interval`.
    Rotation { interval: Duration },
}

// == Oversized Entry Policy ==
/// What to do with a single payload larger than the whole capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversizedEntryPolicy {
    /// Evict every other entry and store it anyway; `total_size` may exceed
    /// capacity until the entry itself is evicted.
    #[default]
    EvictAll,
    /// Refuse the entry and leave the cache untouched.
    Reject,
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum aggregate payload size in bytes
    pub capacity: u64,
    /// Directory holding persisted blobs, one file per key
    pub backing_directory: Option<PathBuf>,
    /// Bytes kept free when the startup population stops
    pub population_headroom: u64,
    /// Eviction strategy
    pub eviction_mode: EvictionMode,
    /// Handling of payloads larger than `capacity`
    pub oversized_policy: OversizedEntryPolicy,
}

impl CacheConfig {
    /// Creates a config with the given capacity and no backing directory.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Sets the backing directory.
    pub fn backing_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backing_directory = Some(dir.into());
        self
    }

    /// Sets the population headroom.
    pub fn population_headroom(mut self, headroom: u64) -> Self {
        self.population_headroom = headroom;
        self
    }

    /// Sets the eviction mode.
    pub fn eviction_mode(mut self, mode: EvictionMode) -> Self {
        self.eviction_mode = mode;
        self
    }

    /// Sets the oversized entry policy.
    pub fn oversized_policy(mut self, policy: OversizedEntryPolicy) -> Self {
        self.oversized_policy = policy;
        self
    }

    /// Size the startup population may fill up to.
    pub fn population_limit(&self) -> u64 {
        self.capacity.saturating_sub(self.population_headroom)
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `BLOB_CACHE_CAPACITY` - Capacity in bytes (default: 1 GiB)
    /// - `BLOB_CACHE_DIR` - Backing directory (default: none)
    /// - `BLOB_CACHE_HEADROOM` - Population headroom in bytes (default: 16 MiB)
    /// - `BLOB_CACHE_MODE` - `lru` or `rotation` (default: lru)
    /// - `BLOB_CACHE_ROTATION_INTERVAL` - Sweep interval in seconds (default: 10)
    /// - `BLOB_CACHE_REJECT_OVERSIZED` - `true` to reject oversized entries (default: false)
    pub fn from_env() -> Self {
        let interval = env::var("BLOB_CACHE_ROTATION_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ROTATION_INTERVAL);

        let eviction_mode = match env::var("BLOB_CACHE_MODE").ok().as_deref() {
            Some("rotation") => EvictionMode::Rotation { interval },
            _ => EvictionMode::Lru,
        };

        let oversized_policy = match env::var("BLOB_CACHE_REJECT_OVERSIZED")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            Some(true) => OversizedEntryPolicy::Reject,
            _ => OversizedEntryPolicy::EvictAll,
        };

        Self {
            capacity: env::var("BLOB_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CAPACITY),
            backing_directory: env::var("BLOB_CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            population_headroom: env::var("BLOB_CACHE_HEADROOM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POPULATION_HEADROOM),
            eviction_mode,
            oversized_policy,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            backing_directory: None,
            population_headroom: DEFAULT_POPULATION_HEADROOM,
            eviction_mode: EvictionMode::Lru,
            oversized_policy: OversizedEntryPolicy::EvictAll,
        }
    }
}
