//! The incremental engine must agree with naive stepping.
//!
//! Three properties are checked on random soups:
//!
//! - skipping neighbourhood sampling through the dependency oracle gives
//!   the same grids as always sampling;
//! - every cell that changes lies in the candidate set derived from the
//!   previous frontier, and for symmetric neighbourhoods in the frontier
//!   plus its forward offsets alone;
//! - for rules without spontaneous birth, the result equals evaluating
//!   every cell near the live pattern.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::HashSet;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tessera_core::engine::IncrementalEngine;
use tessera_core::soup::{SoupSettings, Symmetry};
use tessera_rules::{Generations, LifeLike, Rule, RuleDefinition, builtin};
use tessera_types::{Coord, Rect, SparseGrid, State};

/// Delegates everything except the dependency oracle.
#[derive(Debug)]
struct ForcedSampling(RuleDefinition);

impl Rule for ForcedSampling {
    fn neighbourhood(&self, generation: u64) -> &[Coord] {
        self.0.neighbourhood(generation)
    }

    fn transition(&self, sampled: &[State], generation: u64) -> State {
        self.0.transition(sampled, generation)
    }
}

fn forced(def: &RuleDefinition) -> RuleDefinition {
    RuleDefinition::new(
        format!("{} (sampled)", def.rule_name()),
        def.n_states(),
        def.alternating_period(),
        None,
        Arc::new(ForcedSampling(def.clone())),
    )
    .unwrap()
}

fn soup(def: &RuleDefinition, seed: u64) -> SparseGrid {
    let settings = SoupSettings {
        density: 0.4,
        symmetry: Symmetry::C1,
        multi_state: def.n_states() > 2,
    };
    let rect = Rect::new(0, 0, 16, 16).unwrap();
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut grid = SparseGrid::new();
    for cell in settings.generate(&mut rng, Some(&rect), def.n_states()).unwrap() {
        grid.set(cell.coord, cell.state);
    }
    grid
}

fn rules() -> Vec<RuleDefinition> {
    let mut rules: Vec<RuleDefinition> = tessera_rules::BUILTIN_NAMES
        .iter()
        .map(|name| builtin(name).unwrap())
        .collect();
    rules.push(Generations::definition("B2/S/C3").unwrap());
    rules.push(Generations::definition("B3/S23/C5").unwrap());
    rules.push(LifeLike::definition("B36/S23").unwrap());
    rules
}

#[test]
fn oracle_skip_matches_forced_sampling() {
    for (seed, def) in (0_u64..).zip(rules()) {
        let start = soup(&def, seed);
        let mut fast = IncrementalEngine::new(def.clone(), start.clone()).unwrap();
        let mut slow = IncrementalEngine::new(forced(&def), start).unwrap();
        for _ in 0..20 {
            let a = fast.step().unwrap();
            let b = slow.step().unwrap();
            assert_eq!(a.delta, b.delta, "{} generation {}", def.rule_name(), a.generation);
            assert_eq!(fast.grid(), slow.grid());
        }
    }
}

#[test]
fn changed_cells_lie_in_candidate_set() {
    for (seed, def) in (100_u64..).zip(rules()) {
        let mut engine = IncrementalEngine::new(def.clone(), soup(&def, seed)).unwrap();
        for _ in 0..15 {
            let offsets = def.neighbourhood(engine.generation()).to_vec();
            let candidates: HashSet<Coord> = engine
                .frontier()
                .flat_map(|f| {
                    let mut near = vec![f];
                    for &o in &offsets {
                        near.extend(f.checked_add(o));
                        near.extend(f.checked_sub(o));
                    }
                    near
                })
                .collect();
            let report = engine.step().unwrap();
            for change in &report.delta {
                assert!(candidates.contains(&change.coord), "{}", def.rule_name());
            }
            let frontier: HashSet<Coord> = engine.frontier().collect();
            let changed: HashSet<Coord> = report.delta.iter().map(|c| c.coord).collect();
            assert_eq!(frontier, changed);
        }
    }
}

#[test]
fn symmetric_neighbourhoods_need_only_forward_offsets() {
    for (seed, def) in (300_u64..).zip(rules()) {
        let mut engine = IncrementalEngine::new(def.clone(), soup(&def, seed)).unwrap();
        for _ in 0..15 {
            let offsets = def.neighbourhood(engine.generation()).to_vec();
            let mirrored: HashSet<Coord> = offsets
                .iter()
                .map(|&o| Coord::ORIGIN.checked_sub(o).unwrap())
                .collect();
            assert_eq!(
                mirrored,
                offsets.iter().copied().collect::<HashSet<_>>(),
                "{} neighbourhood is not symmetric",
                def.rule_name()
            );

            let forward: HashSet<Coord> = engine
                .frontier()
                .flat_map(|f| {
                    std::iter::once(f).chain(offsets.iter().filter_map(move |&o| f.checked_add(o)))
                })
                .collect();
            let report = engine.step().unwrap();
            for change in &report.delta {
                assert!(
                    forward.contains(&change.coord),
                    "{} changed {} outside the forward candidate set",
                    def.rule_name(),
                    change.coord
                );
            }
        }
    }
}

/// Evaluate every cell within `radius` of a live cell.
fn naive_step(def: &RuleDefinition, grid: &SparseGrid, generation: u64) -> SparseGrid {
    let offsets = def.neighbourhood(generation);
    let radius = offsets
        .iter()
        .map(|o| o.row.abs().max(o.col.abs()))
        .max()
        .unwrap_or(0);
    let Some(bounds) = grid.tight_bounds() else {
        return SparseGrid::new();
    };
    let mut next = SparseGrid::new();
    for row in (bounds.min_row - radius)..=(bounds.max_row + radius) {
        for col in (bounds.min_col - radius)..=(bounds.max_col + radius) {
            let at = Coord::new(row, col);
            let mut sampled: Vec<State> = offsets
                .iter()
                .map(|&o| grid.get(at.checked_add(o).unwrap()))
                .collect();
            sampled.push(grid.get(at));
            next.set(at, def.transition(&sampled, generation));
        }
    }
    next
}

#[test]
fn incremental_matches_naive_evaluation() {
    let defs = [
        LifeLike::definition("B3/S23").unwrap(),
        LifeLike::definition("B36/S23").unwrap(),
        Generations::definition("B2/S/C3").unwrap(),
        Generations::definition("B3/S23/C5").unwrap(),
    ];
    for (seed, def) in (200_u64..).zip(defs) {
        let mut grid = soup(&def, seed);
        let mut engine = IncrementalEngine::new(def.clone(), grid.clone()).unwrap();
        for generation in 0..25 {
            grid = naive_step(&def, &grid, generation);
            engine.step().unwrap();
            assert_eq!(engine.grid(), &grid, "{} generation {generation}", def.rule_name());
        }
    }
}
