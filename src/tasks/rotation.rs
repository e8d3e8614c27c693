//! Rotation Sweeper Task
//!
//! Background task behind `EvictionMode::Rotation`. Instead of evicting by
//! recency on insert, it periodically throws away every entry a host has
//! already fetched and refills the freed space with blobs from disk that
//! have not been resident yet, cycling through the whole directory.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::population::{list_blobs, load_blob};
use crate::disk::BlobDirectory;
use crate::disk_cache::Shared;

/// Spawns the rotation sweeper.
///
/// Each cycle drops the keys served since the previous cycle, refills from
/// the pending file list while the cache has room, re-reads the directory
/// once the pending list runs dry, then sleeps for `interval`. A key dropped
/// in a cycle is never reloaded in that same cycle. Runs until `cancel`
/// fires.
///
/// # Arguments
/// * `shared` - State shared with the cache handle
/// * `directory` - Backing directory to refill from
/// * `cancel` - Checked before every file read and before every sleep
/// * `interval` - Pause between cycles
pub(crate) fn spawn_rotation_task(
    shared: Arc<Shared>,
    directory: BlobDirectory,
    cancel: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting blob cache rotation with interval of {:?}", interval);

        let mut pending: VecDeque<PathBuf> = VecDeque::new();
        let mut served: HashSet<String> = HashSet::new();
        relist(&directory, &mut pending, &mut served).await;

        loop {
            let discarded = discard_requested(&shared, &mut served, &cancel).await;
            let refilled = refill(&shared, &directory, &mut pending, &served, &cancel).await;
            if pending.is_empty() {
                relist(&directory, &mut pending, &mut served).await;
            }

            if discarded > 0 || refilled > 0 {
                info!(
                    "Rotation: discarded {} served blobs, loaded {} from disk",
                    discarded, refilled
                );
            } else {
                debug!("Rotation: nothing to do");
            }

            if cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        debug!("Rotation stopped");
    })
}

/// Removes every key served since the last cycle and remembers it in
/// `served`. Returns how many were still resident.
async fn discard_requested(
    shared: &Shared,
    served: &mut HashSet<String>,
    cancel: &CancellationToken,
) -> usize {
    let mut state = shared.state.write().await;
    if cancel.is_cancelled() {
        return 0;
    }

    let mut discarded = 0;
    for key in std::mem::take(&mut state.requested) {
        if state.store.remove(&key).is_some() {
            discarded += 1;
        }
        served.insert(key);
    }
    discarded
}

/// Starts a new pass over the directory, forgetting what was served.
async fn relist(
    directory: &BlobDirectory,
    pending: &mut VecDeque<PathBuf>,
    served: &mut HashSet<String>,
) {
    served.clear();
    match list_blobs(directory).await {
        Ok(files) => pending.extend(files),
        Err(e) => warn!("Cannot list backing directory: {}", e),
    }
}

/// Loads blobs that are neither resident nor served in this pass until the
/// cache is full or the pending list is exhausted. Returns the number
/// inserted.
async fn refill(
    shared: &Shared,
    directory: &BlobDirectory,
    pending: &mut VecDeque<PathBuf>,
    served: &HashSet<String>,
    cancel: &CancellationToken,
) -> usize {
    let mut added = 0;

    while let Some(path) = pending.pop_front() {
        if cancel.is_cancelled() {
            break;
        }

        {
            let state = shared.state.read().await;
            if state.store.total_size() >= state.store.capacity() {
                pending.push_front(path);
                break;
            }
            let skip = directory
                .key_for(&path)
                .is_some_and(|key| served.contains(&key) || state.store.contains(&key));
            if skip {
                continue;
            }
        }

        let (key, payload) = match load_blob(directory, path.clone()).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Skipping persisted blob: {}", e);
                continue;
            }
        };
        let size = payload.len() as u64;

        let mut state = shared.state.write().await;
        if cancel.is_cancelled() {
            break;
        }

        if size > state.store.capacity() {
            debug!(key = %key, size, "Blob can never fit, skipping");
            continue;
        }
        if !state.store.fits(size) {
            // Retry this file once served blobs have been discarded
            pending.push_front(path);
            break;
        }

        if state.store.insert(key, payload).is_inserted() {
            added += 1;
        }
    }

    added
}
