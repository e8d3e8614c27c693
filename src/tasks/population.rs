//! Startup Population Task
//!
//! Background task that fills the cache from the backing directory.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::disk::BlobDirectory;
use crate::disk_cache::Shared;
use crate::error::Result;

/// Spawns the task that populates the cache from `directory`.
///
/// Files are visited in file name order and inserted through the same lock
/// as host calls, one at a time. The scan stops at the first blob that would
/// push the resident size past capacity minus the configured headroom. A file
/// that cannot be read or decoded is skipped.
///
/// When the scan ends the observer is told the resident size and then the
/// loading flag is cleared. A scan stopped by `clear` reports nothing, since
/// `clear` has already reset the flag and emptied the store.
///
/// # Arguments
/// * `shared` - State shared with the cache handle
/// * `directory` - Backing directory to read from
/// * `cancel` - Checked before every file and before every insert
pub(crate) fn spawn_population_task(
    shared: Arc<Shared>,
    directory: BlobDirectory,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        shared.observer.population_started(directory.root());

        populate(&shared, &directory, &cancel).await;
        if cancel.is_cancelled() {
            return;
        }

        let resident = shared.state.read().await.store.total_size();
        shared.observer.population_finished(resident);
        shared.loading.send_replace(false);
    })
}

async fn populate(shared: &Shared, directory: &BlobDirectory, cancel: &CancellationToken) {
    let files = match list_blobs(directory).await {
        Ok(files) => files,
        Err(e) => {
            warn!("Cannot list backing directory: {}", e);
            return;
        }
    };

    let limit = shared.config.population_limit();
    let total = files.len();
    let mut loaded = 0usize;
    let mut skipped = 0usize;

    for path in files {
        if cancel.is_cancelled() {
            debug!("Population cancelled after {} blobs", loaded);
            return;
        }

        let (key, payload) = match load_blob(directory, path).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Skipping persisted blob: {}", e);
                skipped += 1;
                continue;
            }
        };

        let mut state = shared.state.write().await;
        if cancel.is_cancelled() {
            debug!("Population cancelled after {} blobs", loaded);
            return;
        }

        if state.store.total_size() + payload.len() as u64 > limit {
            info!(
                "Population reached its limit of {} bytes, leaving {} files on disk",
                limit,
                total - loaded - skipped
            );
            break;
        }

        if state.store.insert(key, payload).is_inserted() {
            loaded += 1;
        } else {
            skipped += 1;
        }
    }

    debug!(loaded, skipped, "Population scan done");
}

/// Lists blob files on the blocking pool.
pub(crate) async fn list_blobs(directory: &BlobDirectory) -> Result<Vec<PathBuf>> {
    let directory = directory.clone();
    tokio::task::spawn_blocking(move || directory.list()).await?
}

/// Reads and decodes one blob file on the blocking pool.
pub(crate) async fn load_blob(
    directory: &BlobDirectory,
    path: PathBuf,
) -> Result<(String, Vec<u8>)> {
    let directory = directory.clone();
    tokio::task::spawn_blocking(move || directory.load(&path)).await?
}
