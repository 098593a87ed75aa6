//! Background Sweep Task
//!
//! Periodically re-checks capacity so an over-full cache is trimmed even
//! when no writes arrive to trigger a sweep.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheEngine;

/// Spawns a background task that calls [`CacheEngine::maybe_evict`] every
/// `interval_secs` seconds. An interval of 0 disables the sweep; the
/// returned task exits immediately.
///
/// The engine's own sweep guard keeps this from overlapping with a sweep
/// triggered by `set`.
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it during shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(state.engine.clone(), 30);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(engine: Arc<CacheEngine>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        if interval.is_zero() {
            debug!("Background sweep disabled");
            return;
        }

        info!(
            "Starting background sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match engine.maybe_evict().await {
                Ok(Some(report)) => {
                    info!(
                        "Background sweep: evicted {} of {} entries",
                        report.evicted.len(),
                        report.population
                    );
                }
                Ok(None) => debug!("Background sweep: cache within capacity"),
                Err(e) => warn!("Background sweep failed: {}", e),
            }
        }
    })
}
