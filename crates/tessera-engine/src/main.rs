//! Headless driver for a Tessera run.
//!
//! Wires the configured rule, seed pattern, run controls, and snapshot hub
//! together, steps the engine until a termination condition is met, then
//! identifies and optionally exports the final pattern.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`TESSERA_CONFIG` or `tessera-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the rule
//! 4. Seed the engine from an RLE file or a soup
//! 5. Create run controls and the snapshot hub
//! 6. Install the Ctrl-C handler and progress reader
//! 7. Run the stepping loop
//! 8. Publish the final snapshot and identify it
//! 9. Export RLE if configured

mod error;
mod progress;
mod seed;

use std::path::Path;
use std::sync::Arc;

use tessera_core::config::{LoggingConfig, TesseraConfig};
use tessera_core::control::RunControl;
use tessera_core::hub::{PublishedSnapshot, SnapshotHub};
use tessera_core::identify::PatternIdentifier;
use tessera_core::{rle, runner};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the run itself fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = TesseraConfig::resolve_path();
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("tessera-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Build the rule.
    let rule = config.rule.build()?;
    info!(
        rule = rule.rule_name(),
        n_states = rule.n_states(),
        "Rule built"
    );

    // 4. Seed the engine.
    let mut engine = seed::seeded_engine(&config.seed, rule).await?;
    info!(
        engine_id = %engine.engine_id(),
        population = engine.population(),
        frontier = engine.frontier().count(),
        "Engine seeded"
    );

    // 5. Run controls and snapshot hub.
    let control = Arc::new(RunControl::new(&config.run));
    let hub = SnapshotHub::new(config.run.snapshot_interval);
    hub.publish(PublishedSnapshot::capture(&engine)).await;
    info!(
        max_generations = control.max_generations(),
        max_real_time_seconds = control.max_real_time_seconds(),
        target_rate = control.target_rate(),
        stop_when_quiescent = control.stop_when_quiescent(),
        "Run controls initialized"
    );

    // 6. Ctrl-C requests a graceful stop; the progress reader follows the hub.
    let stop_handle = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received, stopping after the current generation");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        })
    };
    let progress_handle = progress::spawn_progress(
        &hub,
        Arc::clone(&control),
        config.run.snapshot_interval,
    );

    // 7. Run.
    let mut callback = hub.clone();
    let result = runner::run(&mut engine, &control, &mut callback)
        .await
        .map_err(AppError::from)?;
    runner::log_run_end(&result);

    // 8. Final snapshot and identification.
    let snapshot = PublishedSnapshot::capture(&engine);
    let pattern = snapshot.pattern.clone();
    hub.publish(snapshot).await;
    drop(callback);
    drop(hub);

    if config.identification.enabled {
        let identifier = PatternIdentifier::new(config.identification.budget);
        let rule = engine.rule().clone();
        let identification =
            tokio::task::spawn_blocking(move || identifier.identify(&pattern, &rule))
                .await
                .map_err(AppError::from)?;
        info!(
            identification = %identification,
            json = %serde_json::to_string(&identification).map_err(AppError::from)?,
            budget = config.identification.budget,
            "Final pattern identified"
        );
    }

    // 9. Export.
    if let Some(path) = &config.output.rle_path {
        let text = rle::export_pattern(engine.grid(), engine.rule().rule_name())
            .map_err(AppError::from)?;
        tokio::fs::write(path, text).await.map_err(AppError::from)?;
        info!(path = %path.display(), population = engine.population(), "Final pattern written");
    }

    let summary = progress_handle.await.map_err(AppError::from)?;
    stop_handle.abort();

    info!(
        end_reason = ?result.end_reason,
        total_generations = result.total_generations,
        last_generation = summary.last_generation,
        deltas_observed = summary.deltas,
        edit_batches = summary.edit_batches,
        deltas_skipped = summary.skipped,
        "tessera-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. Returns whether the file was read.
fn load_config(path: &Path) -> Result<(TesseraConfig, bool), AppError> {
    if path.exists() {
        Ok((TesseraConfig::from_file(path)?, true))
    } else {
        let mut config = TesseraConfig::default();
        config.logging.apply_env_overrides();
        Ok((config, false))
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
