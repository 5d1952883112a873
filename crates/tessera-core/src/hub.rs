//! Fan-out of stepping results to readers.
//!
//! [`SnapshotHub`] pairs a broadcast channel of per-generation
//! [`GenerationDelta`]s with the latest immutable [`PublishedSnapshot`].
//! The runner writes; any number of readers subscribe to deltas or read
//! the snapshot. Publishing never blocks the stepping loop: a receiver
//! that falls more than [`BROADCAST_CAPACITY`] messages behind gets
//! `RecvError::Lagged` and should resynchronise from the snapshot, and a
//! snapshot swap that finds the lock held is skipped until the next
//! interval.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_types::{Bounds, Cell, CellDelta, Coord, EngineId, Pattern};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, trace};

use crate::engine::{IncrementalEngine, StepReport};
use crate::runner::GenerationCallback;

/// Capacity of the delta broadcast channel.
pub const BROADCAST_CAPACITY: usize = 256;

/// The cells that changed at one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationDelta {
    /// Engine that produced the change.
    pub engine_id: EngineId,
    /// Generation the grid is at after the change.
    pub generation: u64,
    /// Changed cells, row-major. State 0 means removal.
    pub delta: Vec<CellDelta>,
    /// Live cells after the change.
    pub population: usize,
    /// `true` for edits applied between generations rather than a step.
    pub edited: bool,
    /// When the change was published.
    pub published_at: DateTime<Utc>,
}

/// A full copy of the grid at one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedSnapshot {
    /// Engine that produced the snapshot.
    pub engine_id: EngineId,
    /// Rule the engine runs.
    pub rule_name: String,
    /// Generation of the snapshot.
    pub generation: u64,
    /// The live cells.
    pub pattern: Pattern,
    /// The engine's (grow-only) bounds.
    pub bounds: Option<Bounds>,
    /// When the snapshot was published.
    pub published_at: DateTime<Utc>,
}

impl PublishedSnapshot {
    /// Capture the current state of `engine`.
    pub fn capture(engine: &IncrementalEngine) -> Self {
        Self {
            engine_id: engine.engine_id(),
            rule_name: engine.rule().rule_name().to_owned(),
            generation: engine.generation(),
            pattern: engine.snapshot(),
            bounds: engine.bounds(),
            published_at: Utc::now(),
        }
    }
}

/// Broadcast deltas plus the latest snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotHub {
    /// Broadcast sender for deltas.
    tx: broadcast::Sender<GenerationDelta>,
    /// The latest snapshot, swapped whole.
    latest: Arc<RwLock<Option<Arc<PublishedSnapshot>>>>,
    /// Snapshot every N generations (0 = only on demand).
    snapshot_interval: u64,
}

impl SnapshotHub {
    /// Create a hub that snapshots every `snapshot_interval` generations.
    pub fn new(snapshot_interval: u64) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            latest: Arc::new(RwLock::new(None)),
            snapshot_interval,
        }
    }

    /// Subscribe to deltas.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationDelta> {
        self.tx.subscribe()
    }

    /// Publish a delta. Returns the number of receivers; 0 with no
    /// subscribers is not an error.
    pub fn broadcast(&self, delta: GenerationDelta) -> usize {
        self.tx.send(delta).unwrap_or(0)
    }

    /// The latest published snapshot.
    pub async fn latest(&self) -> Option<Arc<PublishedSnapshot>> {
        self.latest.read().await.clone()
    }

    /// Swap in a new snapshot, waiting for readers.
    pub async fn publish(&self, snapshot: PublishedSnapshot) {
        *self.latest.write().await = Some(Arc::new(snapshot));
    }

    /// Swap in a new snapshot unless a reader holds the lock. Returns
    /// whether the swap happened.
    pub fn try_publish(&self, snapshot: PublishedSnapshot) -> bool {
        self.latest.try_write().is_ok_and(|mut guard| {
            *guard = Some(Arc::new(snapshot));
            true
        })
    }

    /// A handle that reads snapshots without keeping the delta channel
    /// open.
    pub fn latest_reader(&self) -> SnapshotReader {
        SnapshotReader {
            latest: Arc::clone(&self.latest),
        }
    }

    /// Whether `generation` is due for a snapshot.
    pub const fn snapshot_due(&self, generation: u64) -> bool {
        matches!(generation.checked_rem(self.snapshot_interval), Some(0))
    }
}

/// Read-only view of a hub's latest snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    latest: Arc<RwLock<Option<Arc<PublishedSnapshot>>>>,
}

impl SnapshotReader {
    /// The latest published snapshot.
    pub async fn latest(&self) -> Option<Arc<PublishedSnapshot>> {
        self.latest.read().await.clone()
    }
}

impl GenerationCallback for SnapshotHub {
    fn on_generation(&mut self, report: &StepReport, engine: &IncrementalEngine) {
        let receivers = self.broadcast(GenerationDelta {
            engine_id: engine.engine_id(),
            generation: report.generation,
            delta: report.delta.clone(),
            population: report.population,
            edited: false,
            published_at: Utc::now(),
        });
        trace!(generation = report.generation, receivers, "Delta broadcast sent");

        if self.snapshot_due(report.generation) {
            let swapped = self.try_publish(PublishedSnapshot::capture(engine));
            debug!(generation = report.generation, swapped, "Snapshot published");
        }
    }

    fn on_edits(&mut self, applied: &[CellDelta], engine: &IncrementalEngine) {
        let mut coords: Vec<Coord> = applied.iter().map(|cell| cell.coord).collect();
        coords.sort_unstable();
        coords.dedup();
        let delta = coords
            .into_iter()
            .map(|coord| Cell::new(coord, engine.grid().get(coord)))
            .collect();
        let receivers = self.broadcast(GenerationDelta {
            engine_id: engine.engine_id(),
            generation: engine.generation(),
            delta,
            population: engine.population(),
            edited: true,
            published_at: Utc::now(),
        });
        trace!(generation = engine.generation(), receivers, "Edit broadcast sent");
        self.try_publish(PublishedSnapshot::capture(engine));
    }
}
