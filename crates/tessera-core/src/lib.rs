//! Stepping, identification, serialization, and run orchestration for the
//! Tessera cellular automaton workspace.
//!
//! # Modules
//!
//! - [`engine`] -- [`IncrementalEngine`], the frontier-based stepping kernel.
//! - [`identify`] -- [`PatternIdentifier`], bounded classification of still
//!   lifes, oscillators, and spaceships.
//! - [`rle`] -- Run-length encoded pattern text.
//! - [`soup`] -- Symmetry-constrained random fills.
//! - [`throttle`] -- Pacing toward a target generation rate.
//! - [`control`] -- [`RunControl`], shared pause/stop/speed/limit state.
//! - [`runner`] -- The async single-writer stepping loop.
//! - [`hub`] -- [`SnapshotHub`], delta broadcast plus the latest snapshot.
//! - [`config`] -- Configuration loading from `tessera-config.yaml` into
//!   strongly-typed structs.
//!
//! [`IncrementalEngine`]: engine::IncrementalEngine
//! [`PatternIdentifier`]: identify::PatternIdentifier
//! [`RunControl`]: control::RunControl
//! [`SnapshotHub`]: hub::SnapshotHub

pub mod config;
pub mod control;
pub mod engine;
pub mod hub;
pub mod identify;
pub mod rle;
pub mod runner;
pub mod soup;
pub mod throttle;
