//! Background reader that logs run progress from the hub.
//!
//! Subscribes to the delta channel like any other presentation layer. A
//! lagged receiver resynchronises from the latest snapshot; the task ends
//! when every hub handle has been dropped.

use std::sync::Arc;

use tessera_core::control::RunControl;
use tessera_core::hub::SnapshotHub;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the progress task saw before the channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    /// Deltas received.
    pub deltas: u64,
    /// Of which were edit batches rather than steps.
    pub edit_batches: u64,
    /// Messages skipped because the receiver lagged.
    pub skipped: u64,
    /// Last generation observed.
    pub last_generation: u64,
}

/// Spawn the progress logger.
///
/// Logs a status line whenever a stepped generation is a multiple of
/// `interval` (0 disables the status lines).
pub fn spawn_progress(
    hub: &SnapshotHub,
    control: Arc<RunControl>,
    interval: u64,
) -> JoinHandle<ProgressSummary> {
    let mut rx = hub.subscribe();
    // Holding a hub clone here would keep the channel open forever.
    let reader = hub.latest_reader();
    tokio::spawn(async move {
        let mut summary = ProgressSummary::default();
        loop {
            match rx.recv().await {
                Ok(delta) => {
                    summary.deltas = summary.deltas.saturating_add(1);
                    summary.last_generation = delta.generation;
                    if delta.edited {
                        summary.edit_batches = summary.edit_batches.saturating_add(1);
                        debug!(
                            generation = delta.generation,
                            cells = delta.delta.len(),
                            "Edits applied"
                        );
                        continue;
                    }
                    if matches!(delta.generation.checked_rem(interval), Some(0)) {
                        let status = control.status(delta.generation, delta.population);
                        info!(
                            generation = status.generation,
                            population = status.population,
                            changed = delta.delta.len(),
                            elapsed_seconds = status.elapsed_seconds,
                            target_rate = status.target_rate,
                            "Progress"
                        );
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    summary.skipped = summary.skipped.saturating_add(n);
                    let resync = reader.latest().await;
                    warn!(
                        skipped = n,
                        snapshot_generation = resync.as_ref().map(|s| s.generation),
                        "Progress reader lagged, resynchronised from snapshot"
                    );
                    if let Some(snapshot) = resync {
                        summary.last_generation = snapshot.generation;
                    }
                }
                Err(RecvError::Closed) => {
                    debug!("Delta channel closed, progress reader exiting");
                    return summary;
                }
            }
        }
    })
}
