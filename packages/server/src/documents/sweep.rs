use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use super::DocumentService;
use crate::config::ConsistencyConfig;

/// Periodically remove blobs that no document references.
///
/// Runs until the task is dropped. Returns immediately when the sweep is
/// disabled (`sweep_interval_secs = 0`).
pub async fn run_orphan_sweep(service: Arc<DocumentService>, config: ConsistencyConfig) {
    if config.sweep_interval_secs == 0 {
        info!("Orphan sweep disabled");
        return;
    }

    let scan_interval = Duration::from_secs(config.sweep_interval_secs);
    let grace = Duration::from_secs(config.sweep_grace_secs);

    info!(
        interval_secs = config.sweep_interval_secs,
        grace_secs = config.sweep_grace_secs,
        "Starting orphan sweep"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        match service.sweep_orphans(grace).await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Orphan sweep removed blobs"),
            Err(e) => error!(error = %e, "Orphan sweep failed"),
        }
    }
}
