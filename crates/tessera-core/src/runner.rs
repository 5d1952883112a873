//! Stepping loop with run controls.
//!
//! [`run`] is the single writer: it owns the engine for the duration of the
//! run and, between generations, handles
//!
//! - **Pause/resume** through [`RunControl`]
//! - **Limits**: `max_generations` and `max_real_time_seconds`
//! - **Queued edits** from a presentation layer, applied before the next step
//! - **Quiescence**: an empty frontier ends the run when configured
//! - **Pacing**: sleeps toward the runtime-adjustable target rate
//!
//! Every committed generation is handed to a [`GenerationCallback`], which
//! is how deltas and snapshots reach the [`SnapshotHub`].
//!
//! [`SnapshotHub`]: crate::hub::SnapshotHub

use std::sync::Arc;
use std::time::Instant;

use tessera_types::CellDelta;
use tracing::{debug, info, warn};

use crate::control::{RunControl, RunEndReason};
use crate::engine::{EngineError, IncrementalEngine, StepReport};
use crate::throttle::{RateMeter, pacing_delay};

/// Errors that end a run early.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The engine failed to step.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },
}

/// Result of a run.
#[derive(Debug)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// The last step report, if any generation was stepped.
    pub final_report: Option<StepReport>,
    /// Generations stepped during this run.
    pub total_generations: u64,
    /// The engine's generation when the run ended.
    pub generation: u64,
    /// Live cells when the run ended.
    pub population: usize,
    /// Measured generations per second near the end of the run.
    pub measured_rate: Option<f64>,
}

/// Callback invoked as the grid changes.
pub trait GenerationCallback: Send {
    /// Called after each committed generation.
    fn on_generation(&mut self, report: &StepReport, engine: &IncrementalEngine);

    /// Called after queued edits were applied between generations.
    fn on_edits(&mut self, _applied: &[CellDelta], _engine: &IncrementalEngine) {}
}

/// A callback that ignores everything.
pub struct NoOpCallback;

impl GenerationCallback for NoOpCallback {
    fn on_generation(&mut self, _report: &StepReport, _engine: &IncrementalEngine) {}
}

/// Step `engine` until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError::Engine`] if a step fails. Queued edits with
/// states the rule does not have are logged and dropped instead.
pub async fn run(
    engine: &mut IncrementalEngine,
    control: &Arc<RunControl>,
    callback: &mut dyn GenerationCallback,
) -> Result<RunResult, RunnerError> {
    let mut last_report: Option<StepReport> = None;
    let mut total_generations: u64 = 0;
    let mut meter = RateMeter::default();

    info!(
        engine_id = %engine.engine_id(),
        rule = engine.rule().rule_name(),
        generation = engine.generation(),
        population = engine.population(),
        max_generations = control.max_generations(),
        max_real_time_seconds = control.max_real_time_seconds(),
        target_rate = control.target_rate(),
        "Run starting"
    );

    loop {
        if control.is_paused() {
            info!(generation = engine.generation(), "Run paused, waiting for resume...");
            control.wait_if_paused().await;
            info!("Run resumed");
        }

        let end = if control.is_stop_requested() {
            info!("Stop requested");
            Some(RunEndReason::OperatorStop)
        } else if control.time_limit_reached() {
            info!(
                max_seconds = control.max_real_time_seconds(),
                elapsed = control.elapsed_seconds(),
                "Real-time limit reached"
            );
            Some(RunEndReason::MaxRealTimeReached)
        } else {
            None
        };
        if let Some(reason) = end {
            control.set_end_reason(reason).await;
            return Ok(finish(reason, engine, last_report, total_generations, &meter));
        }

        apply_queued_edits(engine, control, callback).await?;

        if control.stop_when_quiescent() && engine.is_quiescent() {
            info!(generation = engine.generation(), "Frontier empty, pattern is quiescent");
            let reason = RunEndReason::Quiescent;
            control.set_end_reason(reason).await;
            return Ok(finish(reason, engine, last_report, total_generations, &meter));
        }

        let report = engine.step()?;
        total_generations = total_generations.saturating_add(1);
        meter.record(Instant::now());

        callback.on_generation(&report, engine);

        if control.generation_limit_reached(report.generation) {
            info!(
                generation = report.generation,
                max_generations = control.max_generations(),
                "Generation limit reached"
            );
            let reason = RunEndReason::MaxGenerationsReached;
            control.set_end_reason(reason).await;
            return Ok(finish(reason, engine, Some(report), total_generations, &meter));
        }

        let delay = pacing_delay(control.target_rate(), report.elapsed);
        last_report = Some(report);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}

async fn apply_queued_edits(
    engine: &mut IncrementalEngine,
    control: &RunControl,
    callback: &mut dyn GenerationCallback,
) -> Result<(), RunnerError> {
    let edits = control.drain_edits().await;
    if edits.is_empty() {
        return Ok(());
    }
    match engine.apply_edits(edits.iter().copied()) {
        Ok(changed) => {
            debug!(
                generation = engine.generation(),
                queued = edits.len(),
                changed,
                "Applied queued edits"
            );
            callback.on_edits(&edits, engine);
            Ok(())
        }
        Err(e @ EngineError::InvalidState { .. }) => {
            warn!(error = %e, queued = edits.len(), "Dropped queued edits");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn finish(
    end_reason: RunEndReason,
    engine: &IncrementalEngine,
    final_report: Option<StepReport>,
    total_generations: u64,
    meter: &RateMeter,
) -> RunResult {
    RunResult {
        end_reason,
        final_report,
        total_generations,
        generation: engine.generation(),
        population: engine.population(),
        measured_rate: meter.rate(),
    }
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_generations = result.total_generations,
        generation = result.generation,
        population = result.population,
        measured_rate = result.measured_rate,
        "Run ended"
    );

    if let Some(ref report) = result.final_report {
        info!(
            generation = report.generation,
            changed = report.delta.len(),
            candidates = report.candidates,
            step_micros = u64::try_from(report.elapsed.as_micros()).unwrap_or(u64::MAX),
            "Final step"
        );
    } else {
        warn!("Run ended with no generations stepped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tessera_rules::neighbourhood::MOORE;
    use tessera_rules::{FnRule, LifeLike, Rule, RuleDefinition};
    use tessera_types::{Cell, Coord, SparseGrid};

    use super::*;
    use crate::config::RunConfig;

    fn conway() -> RuleDefinition {
        LifeLike::definition("B3/S23").unwrap()
    }

    fn grid(cells: &[(i64, i64)]) -> SparseGrid {
        cells
            .iter()
            .map(|&(row, col)| (Coord::new(row, col), 1))
            .collect()
    }

    fn control(max_generations: u64, stop_when_quiescent: bool) -> Arc<RunControl> {
        Arc::new(RunControl::new(&RunConfig {
            max_generations,
            stop_when_quiescent,
            ..RunConfig::default()
        }))
    }

    #[derive(Default)]
    struct Recorder {
        generations: Vec<u64>,
        edits: usize,
    }

    impl GenerationCallback for Recorder {
        fn on_generation(&mut self, report: &StepReport, _engine: &IncrementalEngine) {
            self.generations.push(report.generation);
        }

        fn on_edits(&mut self, applied: &[CellDelta], _engine: &IncrementalEngine) {
            self.edits = self.edits.saturating_add(applied.len());
        }
    }

    #[tokio::test]
    async fn bounded_by_max_generations() {
        let mut engine = IncrementalEngine::new(conway(), grid(&[(0, 0), (0, 1), (0, 2)])).unwrap();
        let ctl = control(5, true);
        let mut recorder = Recorder::default();

        let result = run(&mut engine, &ctl, &mut recorder).await.unwrap();

        assert_eq!(result.end_reason, RunEndReason::MaxGenerationsReached);
        assert_eq!(result.total_generations, 5);
        assert_eq!(result.generation, 5);
        assert_eq!(result.population, 3);
        assert_eq!(recorder.generations, vec![1, 2, 3, 4, 5]);
        assert_eq!(ctl.end_reason().await, Some(RunEndReason::MaxGenerationsReached));
    }

    #[tokio::test]
    async fn operator_stop() {
        let mut engine = IncrementalEngine::new(conway(), grid(&[(0, 0), (0, 1), (0, 2)])).unwrap();
        let ctl = control(0, true);
        ctl.request_stop();

        let result = run(&mut engine, &ctl, &mut NoOpCallback).await.unwrap();

        assert_eq!(result.end_reason, RunEndReason::OperatorStop);
        assert_eq!(result.total_generations, 0);
        assert!(result.final_report.is_none());
    }

    #[tokio::test]
    async fn still_life_goes_quiescent() {
        let block = grid(&[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let mut engine = IncrementalEngine::new(conway(), block).unwrap();
        let ctl = control(0, true);

        let result = run(&mut engine, &ctl, &mut NoOpCallback).await.unwrap();

        assert_eq!(result.end_reason, RunEndReason::Quiescent);
        assert_eq!(result.total_generations, 1);
        assert_eq!(result.population, 4);
    }

    #[tokio::test]
    async fn queued_edits_apply_before_the_next_step() {
        let mut engine = IncrementalEngine::empty(conway());
        let ctl = control(1, true);
        ctl.queue_edits([
            Cell::new(Coord::new(0, 0), 1),
            Cell::new(Coord::new(0, 1), 1),
            Cell::new(Coord::new(0, 2), 1),
        ])
        .await;
        let mut recorder = Recorder::default();

        let result = run(&mut engine, &ctl, &mut recorder).await.unwrap();

        assert_eq!(result.end_reason, RunEndReason::MaxGenerationsReached);
        assert_eq!(recorder.edits, 3);
        assert!(engine.grid().is_live(Coord::new(-1, 1)));
        assert!(engine.grid().is_live(Coord::new(1, 1)));
    }

    #[tokio::test]
    async fn invalid_queued_edits_are_dropped() {
        let mut engine = IncrementalEngine::empty(conway());
        let ctl = control(0, true);
        ctl.queue_edits([Cell::new(Coord::new(0, 0), 7)]).await;

        let result = run(&mut engine, &ctl, &mut NoOpCallback).await.unwrap();

        assert_eq!(result.end_reason, RunEndReason::Quiescent);
        assert_eq!(result.population, 0);
    }

    #[tokio::test]
    async fn rule_violation_fails_the_run() {
        let bad: Arc<dyn Rule> = Arc::new(FnRule::new(1, |_| MOORE.to_vec(), |_, _| 5));
        let rule = RuleDefinition::new("bad", 2, 1, None, bad).unwrap();
        let mut engine = IncrementalEngine::new(rule, grid(&[(0, 0)])).unwrap();
        let ctl = control(10, true);

        let err = run(&mut engine, &ctl, &mut NoOpCallback).await.unwrap_err();

        assert!(matches!(
            err,
            RunnerError::Engine {
                source: EngineError::RuleViolation { .. }
            }
        ));
        assert!(engine.is_poisoned());
    }

    #[tokio::test]
    async fn pause_then_resume() {
        let mut engine = IncrementalEngine::new(conway(), grid(&[(0, 0), (0, 1), (0, 2)])).unwrap();
        let ctl = control(3, true);
        ctl.pause();
        let resumer = {
            let ctl = Arc::clone(&ctl);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                ctl.resume();
            })
        };

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            run(&mut engine, &ctl, &mut NoOpCallback),
        )
        .await
        .unwrap()
        .unwrap();
        resumer.await.unwrap();

        assert_eq!(result.end_reason, RunEndReason::MaxGenerationsReached);
        assert_eq!(result.generation, 3);
    }
}
