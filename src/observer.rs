//! Population lifecycle notifications.

use std::path::Path;

use tracing::info;

/// Receives the two lifecycle events of a startup population.
///
/// Called from the loader task, so implementations must be cheap and must
/// not block.
pub trait PopulationObserver: Send + Sync + 'static {
    fn population_started(&self, directory: &Path);

    /// `resident_bytes` is the cache's total size when the loader stopped.
    fn population_finished(&self, resident_bytes: u64);
}

/// Default observer: logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PopulationObserver for TracingObserver {
    fn population_started(&self, directory: &Path) {
        info!("Populating blob cache from {}", directory.display());
    }

    fn population_finished(&self, resident_bytes: u64) {
        info!(
            "Blob cache population finished, resident size: {:.2} MiB",
            resident_bytes as f64 / (1024.0 * 1024.0)
        );
    }
}
