//! Shared run control for the stepping loop.
//!
//! A presentation layer (or the driver's signal handler) holds an
//! `Arc<RunControl>` and flips these fields while the runner task reads
//! them between generations. All hot-path fields are atomics; the end
//! reason and the queue of pending cell edits sit behind async mutexes
//! because they are touched at most once per generation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_types::Cell;
use tokio::sync::{Mutex, Notify};

use crate::config::RunConfig;

/// Reason why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndReason {
    /// Reached the configured `max_generations`.
    MaxGenerationsReached,
    /// Reached the configured `max_real_time_seconds`.
    MaxRealTimeReached,
    /// Someone called [`RunControl::request_stop`].
    OperatorStop,
    /// The frontier is empty, so no later generation can differ.
    Quiescent,
}

/// Shared run control state.
#[derive(Debug)]
pub struct RunControl {
    /// Whether stepping is paused.
    paused: AtomicBool,

    /// Wakes the runner on resume.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Target generations per second, stored as `f64` bits.
    target_rate_bits: AtomicU64,

    /// Wall-clock time when the run started.
    started_at: DateTime<Utc>,

    /// Maximum generation (0 = unlimited).
    max_generations: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// End the run once the frontier is empty.
    stop_when_quiescent: bool,

    /// Cell edits waiting to be applied before the next step.
    pending_edits: Mutex<Vec<Cell>>,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<RunEndReason>>,
}

impl RunControl {
    /// Create run control from configuration.
    pub fn new(run: &RunConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            target_rate_bits: AtomicU64::new(sanitize_rate(run.target_rate).to_bits()),
            started_at: Utc::now(),
            max_generations: run.max_generations,
            max_real_time_seconds: run.max_real_time_seconds,
            stop_when_quiescent: run.stop_when_quiescent,
            pending_edits: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether stepping is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause stepping. The runner sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume stepping and wake the runner.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until stepping is no longer paused.
    ///
    /// A stop request also ends the wait, so a paused run can be stopped.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: RunEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<RunEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    /// Current target rate in generations per second (0 = unthrottled).
    pub fn target_rate(&self) -> f64 {
        f64::from_bits(self.target_rate_bits.load(Ordering::Acquire))
    }

    /// Change the target rate, returning the previous one.
    ///
    /// Negative and non-finite rates are stored as 0.
    pub fn set_target_rate(&self, rate: f64) -> f64 {
        let prev = self
            .target_rate_bits
            .swap(sanitize_rate(rate).to_bits(), Ordering::AcqRel);
        f64::from_bits(prev)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// Whether `generation` has reached the generation limit.
    pub const fn generation_limit_reached(&self, generation: u64) -> bool {
        self.max_generations > 0 && generation >= self.max_generations
    }

    /// Whether the wall-clock limit has been reached.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since the run started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Get the configured generation limit.
    pub const fn max_generations(&self) -> u64 {
        self.max_generations
    }

    /// Get the configured wall-clock limit.
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    /// Whether an empty frontier ends the run.
    pub const fn stop_when_quiescent(&self) -> bool {
        self.stop_when_quiescent
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Queue cell writes for the runner to apply before its next step.
    pub async fn queue_edits(&self, edits: impl IntoIterator<Item = Cell>) {
        let mut queue = self.pending_edits.lock().await;
        queue.extend(edits);
    }

    /// Drain all queued edits.
    pub async fn drain_edits(&self) -> Vec<Cell> {
        let mut queue = self.pending_edits.lock().await;
        std::mem::take(&mut *queue)
    }

    /// Snapshot the control state for display.
    pub fn status(&self, generation: u64, population: usize) -> RunStatus {
        RunStatus {
            generation,
            population,
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            target_rate: self.target_rate(),
            elapsed_seconds: self.elapsed_seconds(),
            max_generations: self.max_generations,
            max_real_time_seconds: self.max_real_time_seconds,
        }
    }
}

fn sanitize_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 { rate } else { 0.0 }
}

/// Serializable view of a run for status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    /// Current generation.
    pub generation: u64,
    /// Live cell count.
    pub population: usize,
    /// Whether stepping is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Target generations per second (0 = unthrottled).
    pub target_rate: f64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured generation limit (0 = unlimited).
    pub max_generations: u64,
    /// Configured wall-clock limit (0 = unlimited).
    pub max_real_time_seconds: u64,
}
