//! The incremental stepping kernel.
//!
//! [`IncrementalEngine`] owns a [`SparseGrid`] and advances it one
//! generation at a time. Only cells that could possibly change are
//! evaluated: the *frontier* holds every cell whose state changed in the
//! last generation (plus anything edited since), and the candidates for the
//! next generation are the frontier cells together with every cell whose
//! neighbourhood touches one of them.
//!
//! # Step semantics
//!
//! 1. Build the candidate set from the frontier and the neighbourhood of
//!    the current generation.
//! 2. For every candidate, ask the rule's dependency oracle first and fall
//!    back to sampling the neighbourhood (centre state appended last).
//! 3. Validate every result against `n_states` before anything is written.
//! 4. Commit all changes at once, replace the frontier with the changed
//!    cells, extend the bounds, and increment the generation.
//!
//! A rule that returns an out-of-range state poisons the engine: the step
//! commits nothing and every later step returns
//! [`EngineError::Poisoned`].

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tessera_rules::RuleDefinition;
use tessera_types::{
    Bounds, Cell, CellDelta, Coord, DEAD, EngineId, Pattern, Rect, SparseGrid, State,
};
use tracing::{debug, trace, warn};

/// Errors raised by the stepping engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The rule produced a state outside `[0, n_states)`.
    #[error(
        "rule produced state {state} at {coord} in generation {generation}, \
         but only {n_states} states exist"
    )]
    RuleViolation {
        /// The cell whose transition misbehaved.
        coord: Coord,
        /// The offending state.
        state: State,
        /// The rule's state count.
        n_states: u16,
        /// The generation being computed.
        generation: u64,
    },

    /// An edit tried to write a state the rule does not have.
    #[error("cannot write state {state} at {coord}: rule has {n_states} states")]
    InvalidState {
        /// Target cell.
        coord: Coord,
        /// The rejected state.
        state: State,
        /// The rule's state count.
        n_states: u16,
    },

    /// A neighbour or stamp position left the `i64` plane.
    #[error("coordinate {coord} plus offset {offset} overflows")]
    CoordinateOverflow {
        /// The base coordinate.
        coord: Coord,
        /// The offset being applied.
        offset: Coord,
    },

    /// The generation counter would overflow.
    #[error("generation counter overflow")]
    GenerationOverflow,

    /// A previous rule violation left this engine unusable.
    #[error("engine {engine_id} was poisoned by an earlier rule violation")]
    Poisoned {
        /// The poisoned engine.
        engine_id: EngineId,
    },
}

/// Outcome of one successful [`IncrementalEngine::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// The generation the grid is now at.
    pub generation: u64,
    /// Every cell that changed, sorted row-major. State 0 means removal.
    pub delta: Vec<CellDelta>,
    /// Live cells after the step.
    pub population: usize,
    /// Wall-clock time spent computing and committing the step.
    pub elapsed: Duration,
    /// Number of cells evaluated.
    pub candidates: usize,
}

/// A grid plus the incremental bookkeeping needed to step it.
#[derive(Debug, Clone)]
pub struct IncrementalEngine {
    id: EngineId,
    rule: RuleDefinition,
    grid: SparseGrid,
    frontier: HashSet<Coord>,
    bounds: Option<Bounds>,
    generation: u64,
    poisoned: bool,
}

impl IncrementalEngine {
    /// Create an engine at generation 0 with no live cells.
    pub fn empty(rule: RuleDefinition) -> Self {
        Self {
            id: EngineId::new(),
            rule,
            grid: SparseGrid::new(),
            frontier: HashSet::new(),
            bounds: None,
            generation: 0,
            poisoned: false,
        }
    }

    /// Create an engine at generation 0 seeded with `grid`.
    ///
    /// Every live cell starts on the frontier.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if the grid holds a state the
    /// rule does not have.
    pub fn new(rule: RuleDefinition, grid: SparseGrid) -> Result<Self, EngineError> {
        if let Some(bad) = grid.iter().find(|cell| !rule.is_valid_state(cell.state)) {
            return Err(EngineError::InvalidState {
                coord: bad.coord,
                state: bad.state,
                n_states: rule.n_states(),
            });
        }
        let frontier = grid.coords().collect();
        let bounds = grid.tight_bounds();
        let engine = Self {
            frontier,
            bounds,
            grid,
            ..Self::empty(rule)
        };
        debug!(
            engine_id = %engine.id,
            rule = engine.rule.rule_name(),
            population = engine.grid.population(),
            "engine created"
        );
        Ok(engine)
    }

    /// Replace the rule by building a fresh engine from this one's grid.
    ///
    /// The new engine has a new id and starts at generation 0 with every
    /// live cell on the frontier. This engine is consumed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] if the grid holds states the
    /// new rule does not have.
    pub fn rebuild_with(self, rule: RuleDefinition) -> Result<Self, EngineError> {
        let previous = self.id;
        let engine = Self::new(rule, self.grid)?;
        debug!(previous = %previous, engine_id = %engine.id, "engine rebuilt with new rule");
        Ok(engine)
    }

    /// Advance exactly one generation.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Poisoned`] if an earlier step failed validation.
    /// - [`EngineError::RuleViolation`] if the rule returns an out-of-range
    ///   state; the engine is poisoned and nothing is committed.
    /// - [`EngineError::CoordinateOverflow`] if a neighbour lies off the
    ///   `i64` plane; nothing is committed.
    /// - [`EngineError::GenerationOverflow`] at `u64::MAX` generations.
    pub fn step(&mut self) -> Result<StepReport, EngineError> {
        self.ensure_usable()?;
        let started = Instant::now();
        let generation = self.generation;
        let next_generation = generation
            .checked_add(1)
            .ok_or(EngineError::GenerationOverflow)?;

        let candidates = self.candidates()?;
        let mut delta = self.evaluate(&candidates)?;

        let mut frontier = HashSet::with_capacity(delta.len());
        for change in &delta {
            self.grid.set(change.coord, change.state);
            if change.state != DEAD {
                self.bounds = Some(Bounds::extend(self.bounds, change.coord));
            }
            frontier.insert(change.coord);
        }
        self.frontier = frontier;
        self.generation = next_generation;
        delta.sort_unstable();

        let report = StepReport {
            generation: next_generation,
            population: self.grid.population(),
            elapsed: started.elapsed(),
            candidates: candidates.len(),
            delta,
        };
        trace!(
            generation = report.generation,
            changed = report.delta.len(),
            population = report.population,
            candidates = report.candidates,
            "step committed"
        );
        Ok(report)
    }

    /// Every cell that can change this generation.
    ///
    /// Both `f + o` and `f - o` are included for each frontier cell `f` and
    /// offset `o`, so cells that sample `f` are covered even when the
    /// neighbourhood is not symmetric.
    fn candidates(&self) -> Result<HashSet<Coord>, EngineError> {
        let offsets = self.rule.neighbourhood(self.generation);
        let per_cell = offsets.len().saturating_mul(2).saturating_add(1);
        let mut candidates =
            HashSet::with_capacity(self.frontier.len().saturating_mul(per_cell));
        for &coord in &self.frontier {
            candidates.insert(coord);
            for &offset in offsets {
                let overflow = || EngineError::CoordinateOverflow { coord, offset };
                candidates.insert(coord.checked_add(offset).ok_or_else(overflow)?);
                candidates.insert(coord.checked_sub(offset).ok_or_else(overflow)?);
            }
        }
        Ok(candidates)
    }

    /// Compute the next state of every candidate against the unmodified
    /// grid, returning only the cells that change.
    fn evaluate(&mut self, candidates: &HashSet<Coord>) -> Result<Vec<CellDelta>, EngineError> {
        let generation = self.generation;
        let offsets = self.rule.neighbourhood(generation);
        let mut sampled: Vec<State> = Vec::with_capacity(offsets.len().saturating_add(1));
        let mut delta = Vec::new();

        for &coord in candidates {
            let old = self.grid.get(coord);
            let next = if let Some(next) = self.rule.depends_on_neighbours(old, generation) {
                next
            } else {
                sampled.clear();
                for &offset in offsets {
                    let at = coord
                        .checked_add(offset)
                        .ok_or(EngineError::CoordinateOverflow { coord, offset })?;
                    sampled.push(self.grid.get(at));
                }
                sampled.push(old);
                self.rule.transition(&sampled, generation)
            };

            if !self.rule.is_valid_state(next) {
                self.poisoned = true;
                warn!(
                    engine_id = %self.id,
                    %coord,
                    state = next,
                    n_states = self.rule.n_states(),
                    generation,
                    "rule violation, engine poisoned"
                );
                return Err(EngineError::RuleViolation {
                    coord,
                    state: next,
                    n_states: self.rule.n_states(),
                    generation,
                });
            }
            if next != old {
                delta.push(Cell::new(coord, next));
            }
        }
        Ok(delta)
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Write one cell, returning its previous state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] for states outside the rule, or
    /// [`EngineError::Poisoned`].
    pub fn set_cell(&mut self, coord: Coord, state: State) -> Result<State, EngineError> {
        self.ensure_usable()?;
        self.validate_edit(coord, state)?;
        Ok(self.write(coord, state))
    }

    /// Apply edits in order. Later edits to the same cell win.
    ///
    /// All edits are validated before any is applied. Returns the number of
    /// edits that changed a cell.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] for the first edit with an
    /// out-of-range state, or [`EngineError::Poisoned`].
    pub fn apply_edits(
        &mut self,
        edits: impl IntoIterator<Item = CellDelta>,
    ) -> Result<usize, EngineError> {
        self.ensure_usable()?;
        let edits: Vec<CellDelta> = edits.into_iter().collect();
        for edit in &edits {
            self.validate_edit(edit.coord, edit.state)?;
        }
        let changed = edits
            .into_iter()
            .filter(|edit| self.write(edit.coord, edit.state) != edit.state)
            .count();
        Ok(changed)
    }

    /// Remove every live cell inside `rect`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Poisoned`].
    pub fn clear_region(&mut self, rect: &Rect) -> Result<usize, EngineError> {
        self.ensure_usable()?;
        let doomed: Vec<Coord> = self.grid.restrict(rect).coords().collect();
        for &coord in &doomed {
            self.write(coord, DEAD);
        }
        Ok(doomed.len())
    }

    /// Copy the live cells of `pattern`, shifted by `offset`, onto the grid.
    ///
    /// Dead cells of the pattern leave the grid untouched. Returns the
    /// number of cells that changed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CoordinateOverflow`] if a shifted cell leaves
    /// the plane, [`EngineError::InvalidState`] for states outside the rule,
    /// or [`EngineError::Poisoned`]. Nothing is written on error.
    pub fn stamp(&mut self, pattern: &SparseGrid, offset: Coord) -> Result<usize, EngineError> {
        let shifted = pattern
            .sorted_cells()
            .into_iter()
            .map(|cell| {
                cell.coord
                    .checked_add(offset)
                    .map(|coord| Cell::new(coord, cell.state))
                    .ok_or(EngineError::CoordinateOverflow {
                        coord: cell.coord,
                        offset,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.apply_edits(shifted)
    }

    fn validate_edit(&self, coord: Coord, state: State) -> Result<(), EngineError> {
        if self.rule.is_valid_state(state) {
            Ok(())
        } else {
            Err(EngineError::InvalidState {
                coord,
                state,
                n_states: self.rule.n_states(),
            })
        }
    }

    /// Write without validation; the cell joins the pending frontier.
    fn write(&mut self, coord: Coord, state: State) -> State {
        let previous = self.grid.set(coord, state);
        if previous != state {
            self.frontier.insert(coord);
            if state != DEAD {
                self.bounds = Some(Bounds::extend(self.bounds, coord));
            }
        }
        previous
    }

    const fn ensure_usable(&self) -> Result<(), EngineError> {
        if self.poisoned {
            Err(EngineError::Poisoned { engine_id: self.id })
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// This engine's identifier.
    pub const fn engine_id(&self) -> EngineId {
        self.id
    }

    /// The rule this engine steps with.
    pub const fn rule(&self) -> &RuleDefinition {
        &self.rule
    }

    /// Number of generations stepped since creation.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of live cells.
    pub fn population(&self) -> usize {
        self.grid.population()
    }

    /// A box enclosing every live cell. It only grows, so it may be looser
    /// than [`tight_bounds`](Self::tight_bounds).
    pub const fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// The exact bounding box of the live cells, recomputed.
    pub fn tight_bounds(&self) -> Option<Bounds> {
        self.grid.tight_bounds()
    }

    /// Cells that changed in the last generation or were edited since.
    pub fn frontier(&self) -> impl Iterator<Item = Coord> + '_ {
        self.frontier.iter().copied()
    }

    /// Whether the frontier is empty. A quiescent engine can never change
    /// again without an edit.
    pub fn is_quiescent(&self) -> bool {
        self.frontier.is_empty()
    }

    /// The live grid.
    pub const fn grid(&self) -> &SparseGrid {
        &self.grid
    }

    /// An immutable copy of the current grid.
    pub fn snapshot(&self) -> Pattern {
        Pattern::new(self.grid.clone())
    }

    /// Whether a rule violation has made this engine unusable.
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tessera_rules::neighbourhood::MOORE;
    use tessera_rules::{FnRule, LifeLike, Rule};

    use super::*;

    fn conway() -> RuleDefinition {
        LifeLike::definition("B3/S23").unwrap()
    }

    fn grid(cells: &[(i64, i64)]) -> SparseGrid {
        cells
            .iter()
            .map(|&(row, col)| (Coord::new(row, col), 1))
            .collect()
    }

    #[test]
    fn blinker_flips_each_generation() {
        let mut engine = IncrementalEngine::new(conway(), grid(&[(0, -1), (0, 0), (0, 1)])).unwrap();
        let report = engine.step().unwrap();
        assert_eq!(report.generation, 1);
        assert_eq!(report.population, 3);
        assert_eq!(engine.grid(), &grid(&[(-1, 0), (0, 0), (1, 0)]));
        assert_eq!(
            report.delta,
            vec![
                Cell::new(Coord::new(-1, 0), 1),
                Cell::new(Coord::new(0, -1), 0),
                Cell::new(Coord::new(0, 1), 0),
                Cell::new(Coord::new(1, 0), 1),
            ]
        );
        engine.step().unwrap();
        assert_eq!(engine.grid(), &grid(&[(0, -1), (0, 0), (0, 1)]));
    }

    #[test]
    fn empty_frontier_changes_nothing() {
        let block = grid(&[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let mut engine = IncrementalEngine::new(conway(), block.clone()).unwrap();
        engine.step().unwrap();
        assert_eq!(engine.frontier().count(), 0);
        let bounds = engine.bounds();
        let report = engine.step().unwrap();
        assert!(report.delta.is_empty());
        assert_eq!(report.candidates, 0);
        assert_eq!(engine.grid(), &block);
        assert_eq!(engine.bounds(), bounds);
        assert_eq!(engine.generation(), 2);
    }

    #[test]
    fn bounds_never_shrink() {
        let mut engine = IncrementalEngine::new(conway(), grid(&[(0, 0)])).unwrap();
        let before = engine.bounds().unwrap();
        engine.step().unwrap();
        assert_eq!(engine.population(), 0);
        assert_eq!(engine.bounds(), Some(before));
        assert_eq!(engine.tight_bounds(), None);
    }

    #[test]
    fn out_of_range_state_poisons_engine() {
        let bad: Arc<dyn Rule> = Arc::new(FnRule::new(1, |_| MOORE.to_vec(), |_, _| 7));
        let rule = RuleDefinition::new("bad", 2, 1, None, bad).unwrap();
        let seed = grid(&[(0, 0)]);
        let mut engine = IncrementalEngine::new(rule, seed.clone()).unwrap();
        let err = engine.step().unwrap_err();
        assert!(matches!(
            err,
            EngineError::RuleViolation {
                state: 7,
                n_states: 2,
                generation: 0,
                ..
            }
        ));
        assert!(engine.is_poisoned());
        assert_eq!(engine.grid(), &seed);
        assert_eq!(engine.generation(), 0);
        assert!(matches!(engine.step(), Err(EngineError::Poisoned { .. })));
    }

    #[test]
    fn edits_join_the_frontier() {
        let mut engine = IncrementalEngine::empty(conway());
        assert_eq!(engine.set_cell(Coord::new(3, 3), 1).unwrap(), 0);
        assert_eq!(engine.frontier().collect::<Vec<_>>(), vec![Coord::new(3, 3)]);
        assert_eq!(engine.bounds().unwrap().min_corner(), Coord::new(3, 3));
        assert!(matches!(
            engine.set_cell(Coord::ORIGIN, 2),
            Err(EngineError::InvalidState { state: 2, .. })
        ));
    }

    #[test]
    fn apply_edits_is_all_or_nothing() {
        let mut engine = IncrementalEngine::empty(conway());
        let edits = [
            Cell::new(Coord::new(0, 0), 1),
            Cell::new(Coord::new(0, 1), 5),
        ];
        assert!(engine.apply_edits(edits).is_err());
        assert_eq!(engine.population(), 0);

        let edits = [
            Cell::new(Coord::new(0, 0), 1),
            Cell::new(Coord::new(0, 0), 0),
            Cell::new(Coord::new(0, 1), 1),
        ];
        assert_eq!(engine.apply_edits(edits).unwrap(), 3);
        assert_eq!(engine.grid(), &grid(&[(0, 1)]));
    }

    #[test]
    fn clear_region_and_stamp() {
        let mut engine = IncrementalEngine::empty(conway());
        let glider = grid(&[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)]);
        assert_eq!(engine.stamp(&glider, Coord::new(10, 10)).unwrap(), 5);
        assert_eq!(engine.grid().get(Coord::new(12, 10)), 1);
        let rect = Rect::new(10, 10, 12, 13).unwrap();
        assert_eq!(engine.clear_region(&rect).unwrap(), 2);
        assert_eq!(engine.population(), 3);
    }

    #[test]
    fn stamp_overflow_writes_nothing() {
        let mut engine = IncrementalEngine::empty(conway());
        let pattern = grid(&[(0, 0), (1, 0)]);
        let err = engine
            .stamp(&pattern, Coord::new(i64::MAX, 0))
            .unwrap_err();
        assert!(matches!(err, EngineError::CoordinateOverflow { .. }));
        assert_eq!(engine.population(), 0);
    }

    #[test]
    fn rebuild_starts_a_new_engine() {
        let mut engine = IncrementalEngine::new(conway(), grid(&[(0, -1), (0, 0), (0, 1)])).unwrap();
        engine.step().unwrap();
        let old_id = engine.engine_id();
        let rebuilt = engine
            .rebuild_with(LifeLike::definition("B36/S23").unwrap())
            .unwrap();
        assert_ne!(rebuilt.engine_id(), old_id);
        assert_eq!(rebuilt.generation(), 0);
        assert_eq!(rebuilt.population(), 3);
        assert_eq!(rebuilt.frontier().count(), 3);
        assert_eq!(rebuilt.rule().rule_name(), "B36/S23");
    }

    #[test]
    fn new_rejects_foreign_states() {
        let seed: SparseGrid = [(Coord::ORIGIN, 4)].into_iter().collect();
        assert!(matches!(
            IncrementalEngine::new(conway(), seed),
            Err(EngineError::InvalidState { state: 4, .. })
        ));
    }

    #[test]
    fn asymmetric_neighbourhood_reaches_dependents() {
        // Each cell copies its right-hand neighbour: a lone cell moves left.
        let shift: Arc<dyn Rule> = Arc::new(FnRule::new(
            1,
            |_| vec![Coord::new(0, 1)],
            |sampled, _| sampled.first().copied().unwrap_or(0),
        ));
        let rule = RuleDefinition::new("shift", 2, 1, None, shift).unwrap();
        let mut engine = IncrementalEngine::new(rule, grid(&[(0, 5)])).unwrap();
        engine.step().unwrap();
        assert_eq!(engine.grid(), &grid(&[(0, 4)]));
        engine.step().unwrap();
        assert_eq!(engine.grid(), &grid(&[(0, 3)]));
    }
}
