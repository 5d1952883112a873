//! Patterns moving between soups, RLE text, engines, and the identifier.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tessera_core::engine::IncrementalEngine;
use tessera_core::identify::PatternIdentifier;
use tessera_core::rle;
use tessera_core::soup::{SoupSettings, Symmetry};
use tessera_rules::{LifeLike, builtin};
use tessera_types::{Coord, Identification, Pattern, Rect, SparseGrid};

const GLIDER: &str = "#C a glider\nx = 3, y = 3, rule = B3/S23\n.A$2.A$3A$!";

fn soup(symmetry: Symmetry, rect: &Rect, n_states: u16, seed: u64) -> SparseGrid {
    let settings = SoupSettings {
        density: 0.45,
        symmetry,
        multi_state: n_states > 2,
    };
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut grid = SparseGrid::new();
    for cell in settings.generate(&mut rng, Some(rect), n_states).unwrap() {
        grid.set(cell.coord, cell.state);
    }
    grid
}

#[test]
fn decoded_glider_is_a_spaceship() {
    let decoded = rle::decode(GLIDER).unwrap();
    let rule = LifeLike::definition(decoded.header.rule.as_deref().unwrap()).unwrap();
    let id = PatternIdentifier::new(10).identify(&Pattern::new(decoded.grid), &rule);
    assert_eq!(
        id,
        Identification::Spaceship {
            period: 4,
            displacement: Coord::new(1, 1)
        }
    );
}

#[test]
fn stamped_pattern_exports_cropped_to_its_bounds() {
    let decoded = rle::decode(GLIDER).unwrap();
    let mut engine = IncrementalEngine::empty(LifeLike::definition("B3/S23").unwrap());
    engine.stamp(&decoded.grid, Coord::new(-40, 17)).unwrap();
    let text = rle::export_pattern(engine.grid(), engine.rule().rule_name()).unwrap();
    assert_eq!(text, "x = 3, y = 3, rule = B3/S23\n.A.$2.A$3A$!");
}

#[test]
fn multi_state_soup_round_trips_through_rle() {
    let rule = builtin("WeightedGenerations_Rule_7").unwrap();
    let rect = Rect::new(-5, 3, 20, 30).unwrap();
    let grid = soup(Symmetry::C2_4, &rect, rule.n_states(), 17);

    let text = rle::encode(&grid, &rect, rule.rule_name()).unwrap();
    let decoded = rle::decode(&text).unwrap();

    assert_eq!(decoded.header.width, 27);
    assert_eq!(decoded.header.height, 25);
    assert_eq!(decoded.header.rule.as_deref(), Some(rule.rule_name()));
    assert_eq!(
        decoded.grid.translate(rect.origin()).unwrap(),
        grid.restrict(&rect)
    );
}

#[test]
fn mirrored_soup_stays_mirrored_under_life() {
    let rect = Rect::new(0, 0, 12, 12).unwrap();
    let start = soup(Symmetry::D4_Plus4, &rect, 2, 5);
    let mut engine =
        IncrementalEngine::new(LifeLike::definition("B3/S23").unwrap(), start).unwrap();

    // D4_+4 over [0, 12) mirrors x to 10 - x and y to 10 - y.
    for _ in 0..30 {
        engine.step().unwrap();
        for cell in engine.grid().iter() {
            let Coord { row, col } = cell.coord;
            assert!(engine.grid().is_live(Coord::new(row, 10 - col)));
            assert!(engine.grid().is_live(Coord::new(10 - row, col)));
        }
    }
}

#[test]
fn identification_of_a_selection() {
    let decoded = rle::decode(GLIDER).unwrap();
    let mut engine = IncrementalEngine::empty(LifeLike::definition("B3/S23").unwrap());
    engine.stamp(&decoded.grid, Coord::ORIGIN).unwrap();
    let block: SparseGrid = [(0, 0), (0, 1), (1, 0), (1, 1)]
        .into_iter()
        .map(|(row, col)| (Coord::new(row, col), 1))
        .collect();
    engine.stamp(&block, Coord::new(50, 50)).unwrap();

    let identifier = PatternIdentifier::new(20);
    let far = Rect::new(48, 48, 54, 54).unwrap();
    assert_eq!(
        identifier.identify_region(engine.grid(), &far, engine.rule()),
        Identification::StillLife
    );
    assert_eq!(
        identifier.identify(&engine.snapshot(), engine.rule()),
        Identification::Unidentified { budget: 20 }
    );
}
