//! Pattern classification by bounded forward simulation.
//!
//! The identifier copies a pattern into a private engine, steps it up to a
//! budget, and fingerprints every generation. A fingerprint is the
//! translation-normalized cell layout together with the rule phase
//! (`generation % alternating_period`), so a pattern only counts as
//! repeating when the rule itself is also back in the same phase. The full
//! layout is the hash-map key, so matches are exact.
//!
//! Identification never fails: problems inside the private engine end the
//! search early as [`Identification::Unidentified`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tessera_rules::RuleDefinition;
use tessera_types::{Cell, Coord, Identification, Pattern, Rect, SparseGrid};
use tracing::{debug, warn};

use crate::engine::IncrementalEngine;

/// Generations simulated when no budget is configured.
pub const DEFAULT_BUDGET: u64 = 1000;

/// Layout plus phase; equal keys mean the same shape in the same rule phase.
type Fingerprint = (Vec<Cell>, u64);

/// Classifies patterns as still lifes, oscillators, spaceships, or
/// extinct, within a fixed generation budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternIdentifier {
    budget: u64,
}

impl Default for PatternIdentifier {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl PatternIdentifier {
    /// Create an identifier that simulates at most `budget` generations.
    pub const fn new(budget: u64) -> Self {
        Self { budget }
    }

    /// The generation budget.
    pub const fn budget(&self) -> u64 {
        self.budget
    }

    /// Classify a pattern under `rule`.
    pub fn identify(&self, pattern: &Pattern, rule: &RuleDefinition) -> Identification {
        if pattern.is_empty() {
            return Identification::Extinct { generation: 0 };
        }
        let mut engine = match IncrementalEngine::new(rule.clone(), pattern.grid().clone()) {
            Ok(engine) => engine,
            Err(e) => {
                warn!(error = %e, rule = rule.rule_name(), "pattern cannot run under rule");
                return Identification::Unidentified { budget: 0 };
            }
        };

        let mut seen: HashMap<Fingerprint, (u64, Coord)> = HashMap::new();
        if let Some((key, corner)) = fingerprint(&engine) {
            seen.insert(key, (0, corner));
        }

        for _ in 0..self.budget {
            if let Err(e) = engine.step() {
                warn!(
                    error = %e,
                    generation = engine.generation(),
                    "identification stopped by engine error"
                );
                return Identification::Unidentified {
                    budget: engine.generation(),
                };
            }
            let generation = engine.generation();
            let Some((key, corner)) = fingerprint(&engine) else {
                debug!(generation, "pattern died out");
                return Identification::Extinct { generation };
            };
            match seen.entry(key) {
                Entry::Occupied(first) => {
                    let (first_generation, first_corner) = *first.get();
                    return classify(first_generation, first_corner, generation, corner).unwrap_or(
                        Identification::Unidentified { budget: generation },
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert((generation, corner));
                }
            }
        }
        Identification::Unidentified {
            budget: self.budget,
        }
    }

    /// Classify only the live cells of `grid` inside `rect`.
    pub fn identify_region(
        &self,
        grid: &SparseGrid,
        rect: &Rect,
        rule: &RuleDefinition,
    ) -> Identification {
        self.identify(&Pattern::new(grid.restrict(rect)), rule)
    }
}

fn fingerprint(engine: &IncrementalEngine) -> Option<(Fingerprint, Coord)> {
    let layout = engine.grid().normalized()?;
    let phase = engine.rule().phase(engine.generation());
    Some(((layout.cells, phase), layout.min_corner))
}

fn classify(g0: u64, p0: Coord, g1: u64, p1: Coord) -> Option<Identification> {
    let period = g1.checked_sub(g0)?;
    let displacement = p1.checked_sub(p0)?;
    Some(match (displacement == Coord::ORIGIN, period) {
        (true, 1) => Identification::StillLife,
        (true, _) => Identification::Oscillator { period },
        (false, _) => Identification::Spaceship {
            period,
            displacement,
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tessera_rules::neighbourhood::MOORE;
    use tessera_rules::{FnRule, LifeLike, Rule};

    use super::*;

    fn pattern(cells: &[(i64, i64)]) -> Pattern {
        Pattern::new(
            cells
                .iter()
                .map(|&(row, col)| (Coord::new(row, col), 1))
                .collect(),
        )
    }

    fn conway() -> RuleDefinition {
        LifeLike::definition("B3/S23").unwrap()
    }

    #[test]
    fn blinker_is_period_two() {
        let id = PatternIdentifier::new(10).identify(&pattern(&[(0, 0), (0, 1), (0, 2)]), &conway());
        assert_eq!(id, Identification::Oscillator { period: 2 });
    }

    #[test]
    fn block_is_still() {
        let id = PatternIdentifier::new(10)
            .identify(&pattern(&[(0, 0), (0, 1), (1, 0), (1, 1)]), &conway());
        assert_eq!(id, Identification::StillLife);
    }

    #[test]
    fn glider_moves_diagonally() {
        let glider = pattern(&[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)]);
        let id = PatternIdentifier::new(10).identify(&glider, &conway());
        assert_eq!(
            id,
            Identification::Spaceship {
                period: 4,
                displacement: Coord::new(1, 1)
            }
        );
    }

    #[test]
    fn lone_cell_dies_immediately() {
        let id = PatternIdentifier::default().identify(&pattern(&[(5, 5)]), &conway());
        assert_eq!(id, Identification::Extinct { generation: 1 });
    }

    #[test]
    fn empty_pattern_is_extinct_at_zero() {
        let id = PatternIdentifier::default().identify(&Pattern::default(), &conway());
        assert_eq!(id, Identification::Extinct { generation: 0 });
    }

    #[test]
    fn small_budget_gives_up() {
        let glider = pattern(&[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)]);
        let id = PatternIdentifier::new(3).identify(&glider, &conway());
        assert_eq!(id, Identification::Unidentified { budget: 3 });
    }

    #[test]
    fn phase_is_part_of_the_fingerprint() {
        // Period-2 rule that leaves the grid untouched: the layout repeats
        // every generation, but the phase only matches every other one.
        let frozen: Arc<dyn Rule> = Arc::new(FnRule::new(
            2,
            |_| MOORE.to_vec(),
            |sampled, _| sampled.last().copied().unwrap_or(0),
        ));
        let rule = RuleDefinition::new("frozen", 2, 2, None, frozen).unwrap();
        let id = PatternIdentifier::new(10).identify(&pattern(&[(0, 0)]), &rule);
        assert_eq!(id, Identification::Oscillator { period: 2 });
    }

    #[test]
    fn engine_failure_is_unidentified() {
        let bad: Arc<dyn Rule> = Arc::new(FnRule::new(1, |_| MOORE.to_vec(), |_, _| 9));
        let rule = RuleDefinition::new("bad", 2, 1, None, bad).unwrap();
        let id = PatternIdentifier::new(10).identify(&pattern(&[(0, 0)]), &rule);
        assert_eq!(id, Identification::Unidentified { budget: 0 });
    }

    #[test]
    fn region_is_cropped_before_identifying() {
        let mut grid = pattern(&[(0, 0), (0, 1), (1, 0), (1, 1)]).into_grid();
        grid.set(Coord::new(50, 50), 1);
        let rect = Rect::new(-1, -1, 3, 3).unwrap();
        let id = PatternIdentifier::new(10).identify_region(&grid, &rect, &conway());
        assert_eq!(id, Identification::StillLife);
    }
}
