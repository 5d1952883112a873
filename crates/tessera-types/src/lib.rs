//! Shared type definitions for the Tessera cellular automaton workspace.
//!
//! This crate is the single source of truth for the values exchanged between
//! the simulation core and whatever presentation layer drives it. Types that
//! a renderer needs are exported to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`geometry`] -- Coordinates, inclusive bounds, and half-open selection
//!   rectangles.
//! - [`grid`] -- The sparse grid, the `(coordinate, state)` cell pair, and
//!   immutable pattern snapshots.
//! - [`identification`] -- The tagged result of classifying a pattern.
//! - [`ids`] -- Time-ordered identifiers for engine instances.
//! - [`colour`] -- RGB triples used by rule palettes.

pub mod colour;
pub mod geometry;
pub mod grid;
pub mod identification;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use colour::Rgb;
pub use geometry::{Bounds, Coord, Rect, SelectionError};
pub use grid::{Cell, CellDelta, DEAD, NormalizedLayout, Pattern, SparseGrid, State};
pub use identification::Identification;
pub use ids::EngineId;
