//! Disk Blob Cache
//!
//! The handle a host subsystem owns. Wraps the store in a single lock,
//! gates external access while the startup population runs, and owns the
//! background tasks' cancellation.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, CacheStore, InsertOutcome};
use crate::codec::{BlobCodec, GzipCodec};
use crate::config::{CacheConfig, EvictionMode};
use crate::disk::BlobDirectory;
use crate::observer::{PopulationObserver, TracingObserver};
use crate::tasks::{spawn_population_task, spawn_rotation_task};

/// Everything guarded by the cache lock.
#[derive(Debug)]
pub(crate) struct CacheState {
    pub(crate) store: CacheStore,
    /// Cancels the loader and the rotation sweeper; replaced on clear.
    pub(crate) cancel: CancellationToken,
    pub(crate) sweeper_running: bool,
    /// Keys served by `get` since the last rotation sweep.
    pub(crate) requested: Vec<String>,
}

/// State shared between the handle and its background tasks.
pub(crate) struct Shared {
    pub(crate) state: RwLock<CacheState>,
    /// True while the startup population runs.
    pub(crate) loading: watch::Sender<bool>,
    pub(crate) directory: Option<BlobDirectory>,
    pub(crate) observer: Arc<dyn PopulationObserver>,
    pub(crate) config: CacheConfig,
}

/// Disk-backed, capacity-bounded blob cache.
///
/// Cheap to clone; clones share the same cache. Construction spawns the
/// population task when the backing directory exists, so it must happen
/// inside a tokio runtime.
///
/// # Example
/// ```ignore
/// let cache = DiskBlobCache::new(CacheConfig::from_env());
/// cache.wait_for_population().await;
///
/// cache.add("3f9a1c0e77b2d4e5", decoded).await;
/// if let Some(bytes) = cache.get("3f9a1c0e77b2d4e5").await {
///     cache.lift("3f9a1c0e77b2d4e5").await;
/// }
///
/// // At subsystem shutdown:
/// cache.clear().await;
/// ```
#[derive(Clone)]
pub struct DiskBlobCache {
    shared: Arc<Shared>,
}

impl DiskBlobCache {
    // == Constructor ==
    /// Creates a cache that reads gzip blobs and logs through `tracing`.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_parts(
            config,
            Arc::new(GzipCodec::default()),
            Arc::new(TracingObserver),
        )
    }

    /// Creates a cache with an explicit codec and lifecycle observer.
    ///
    /// If the configured backing directory exists, the cache enters the
    /// loading state and a background task populates it. Otherwise the cache
    /// starts empty and never loads.
    pub fn with_parts(
        config: CacheConfig,
        codec: Arc<dyn BlobCodec>,
        observer: Arc<dyn PopulationObserver>,
    ) -> Self {
        let directory = config
            .backing_directory
            .clone()
            .map(|root| BlobDirectory::new(root, codec));
        let populate = directory.as_ref().is_some_and(BlobDirectory::exists);

        if let (Some(dir), false) = (&directory, populate) {
            debug!(
                "Backing directory {} does not exist, starting empty",
                dir.root().display()
            );
        }

        let cancel = CancellationToken::new();
        let (loading, _) = watch::channel(populate);
        let shared = Arc::new(Shared {
            state: RwLock::new(CacheState {
                store: CacheStore::from_config(&config),
                cancel: cancel.clone(),
                sweeper_running: false,
                requested: Vec::new(),
            }),
            loading,
            directory: directory.clone(),
            observer,
            config,
        });

        if let (Some(dir), true) = (directory, populate) {
            spawn_population_task(shared.clone(), dir, cancel);
        }

        Self { shared }
    }

    // == Add ==
    /// Stores a blob under a new key.
    ///
    /// Silently ignored while populating, for empty keys or payloads and for
    /// keys already present. Evicts least recently used entries as needed.
    pub async fn add(&self, key: impl Into<String>, payload: Vec<u8>) {
        let key = key.into();

        if self.is_loading() {
            debug!(key = %key, "add refused while populating");
            self.shared.state.write().await.store.record_rejection();
            return;
        }

        let mut state = self.shared.state.write().await;
        let size = payload.len();

        match state.store.insert(key.clone(), payload) {
            InsertOutcome::Inserted { evicted } => {
                if evicted > 0 {
                    debug!(key = %key, size, evicted, "evicted to make room");
                }
                if state.store.total_size() > state.store.capacity() {
                    warn!(
                        key = %key,
                        size,
                        "Oversized blob admitted, cache holds {} bytes over a {} byte capacity",
                        state.store.total_size(),
                        state.store.capacity()
                    );
                }
            }
            InsertOutcome::InvalidInput => debug!(key = %key, "ignored empty key or payload"),
            InsertOutcome::DuplicateKey => debug!(key = %key, "ignored duplicate key"),
            InsertOutcome::Oversized => {
                warn!(key = %key, size, "Rejected blob larger than cache capacity")
            }
            InsertOutcome::NoRoom => self.start_rotation(&mut state),
        }
    }

    // == Contains ==
    /// Membership test. Always false while populating.
    pub async fn contains(&self, key: &str) -> bool {
        if self.is_loading() {
            return false;
        }
        self.shared.state.read().await.store.contains(key)
    }

    // == Get ==
    /// Returns a copy of the cached payload.
    ///
    /// Does not change recency; call [`lift`](Self::lift) to mark use.
    /// Returns None while populating.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut state = self.shared.state.write().await;

        if self.is_loading() {
            state.store.record_miss();
            return None;
        }

        let payload = state.store.get(key)?;
        if state.sweeper_running {
            state.requested.push(key.to_string());
        }
        Some(payload)
    }

    // == Lift ==
    /// Marks a key as most recently used. No-op if absent or populating.
    pub async fn lift(&self, key: &str) {
        if self.is_loading() {
            return;
        }
        self.shared.state.write().await.store.lift(key);
    }

    // == Clear ==
    /// Drops every entry and stops any population or rotation task.
    ///
    /// Idempotent. Afterwards the cache behaves like a fresh, empty instance
    /// that is not loading.
    pub async fn clear(&self) {
        let mut state = self.shared.state.write().await;

        info!("Clearing the blob cache");
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.sweeper_running = false;
        state.requested.clear();
        state.store.clear();
        self.shared.loading.send_replace(false);
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let state = self.shared.state.read().await;
        CacheStats {
            loading: self.is_loading(),
            ..state.store.stats()
        }
    }

    /// Whether the startup population is still running.
    pub fn is_loading(&self) -> bool {
        *self.shared.loading.borrow()
    }

    /// Resolves once the startup population has finished, been cancelled, or
    /// immediately if there is none.
    pub async fn wait_for_population(&self) {
        let mut rx = self.shared.loading.subscribe();
        let _ = rx.wait_for(|loading| !*loading).await;
    }

    pub async fn len(&self) -> usize {
        self.shared.state.read().await.store.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shared.state.read().await.store.is_empty()
    }

    /// Current aggregate payload size in bytes.
    pub async fn total_size(&self) -> u64 {
        self.shared.state.read().await.store.total_size()
    }

    pub fn capacity(&self) -> u64 {
        self.shared.config.capacity
    }

    /// Starts the rotation sweeper once, on the first insert that did not fit.
    fn start_rotation(&self, state: &mut CacheState) {
        let EvictionMode::Rotation { interval } = self.shared.config.eviction_mode else {
            return;
        };
        if state.sweeper_running {
            return;
        }
        let Some(directory) = self.shared.directory.clone() else {
            debug!("Cache full and no backing directory to rotate from");
            return;
        };

        info!(
            "Blob cache full at {} bytes, starting rotation",
            state.store.total_size()
        );
        state.sweeper_running = true;
        spawn_rotation_task(
            self.shared.clone(),
            directory,
            state.cancel.clone(),
            interval,
        );
    }
}

impl std::fmt::Debug for DiskBlobCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskBlobCache")
            .field("config", &self.shared.config)
            .field("directory", &self.shared.directory)
            .field("loading", &self.is_loading())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const KIB: u64 = 1024;

    fn blob(size: u64, fill: u8) -> Vec<u8> {
        vec![fill; size as usize]
    }

    #[tokio::test]
    async fn test_add_get_contains() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));

        cache.add("a", vec![1, 2, 3]).await;

        assert!(cache.contains("a").await);
        assert_eq!(cache.get("a").await, Some(vec![1, 2, 3]));
        assert_eq!(cache.get("missing").await, None);
        assert_eq!(cache.total_size().await, 3);
    }

    #[tokio::test]
    async fn test_no_directory_means_no_loading() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));
        assert!(!cache.is_loading());
        cache.wait_for_population().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_directory_starts_empty() {
        let config = CacheConfig::with_capacity(KIB)
            .backing_directory("/definitely/not/a/real/blob/dir");
        let cache = DiskBlobCache::new(config);

        assert!(!cache.is_loading());
        cache.add("a", blob(10, 1)).await;
        assert!(cache.contains("a").await);
    }

    #[tokio::test]
    async fn test_get_returns_private_copy() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));
        cache.add("a", vec![1, 2, 3]).await;

        let mut copy = cache.get("a").await.unwrap();
        copy[0] = 42;

        assert_eq!(cache.get("a").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_gate_refuses_external_calls_while_loading() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));
        cache.add("a", blob(10, 1)).await;

        // Simulate an in-flight population
        cache.shared.loading.send_replace(true);

        cache.add("b", blob(10, 2)).await;
        cache.lift("a").await;
        assert!(!cache.contains("a").await);
        assert_eq!(cache.get("a").await, None);

        cache.shared.loading.send_replace(false);

        assert!(cache.contains("a").await);
        assert!(!cache.contains("b").await);
        let stats = cache.stats().await;
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_clear_ends_loading_state() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));
        cache.shared.loading.send_replace(true);

        cache.clear().await;

        assert!(!cache.is_loading());
        cache.add("a", blob(10, 1)).await;
        assert!(cache.contains("a").await);
    }

    #[tokio::test]
    async fn test_clear_cancels_token() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));
        let old = cache.shared.state.read().await.cancel.clone();

        cache.clear().await;
        cache.clear().await;

        assert!(old.is_cancelled());
        assert!(!cache.shared.state.read().await.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_stats_serialize() {
        let cache = DiskBlobCache::new(CacheConfig::with_capacity(KIB));
        cache.add("a", blob(100, 1)).await;

        let json = serde_json::to_value(cache.stats().await).unwrap();
        assert_eq!(json["total_size"], 100);
        assert_eq!(json["capacity"], 1024);
        assert_eq!(json["loading"], false);
    }
}
