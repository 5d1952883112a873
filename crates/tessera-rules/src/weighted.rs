//! Rules that sum weighted neighbour states.
//!
//! Each neighbourhood offset carries a positional weight. A weighted rule
//! multiplies that weight by a per-state weight (or filters on the state)
//! and looks the resulting sum up in a set of trigger values.

use std::collections::BTreeSet;
use std::sync::Arc;

use tessera_types::{Coord, DEAD, State};

use crate::definition::{Rule, RuleDefinition};
use crate::error::RuleError;
use crate::neighbourhood::square;
use crate::rulestring::WeightedGenerationsSpec;

/// Positional weights of the 5x5 square, in [`square(2)`](square) order.
pub const SQUARE_5X5_WEIGHTS: [i64; 25] = [
    1, 2, 3, 2, 1, //
    2, 4, 6, 4, 2, //
    3, 6, 9, 6, 3, //
    2, 4, 6, 4, 2, //
    1, 2, 3, 2, 1,
];

/// Sum `weight(position) * state_weight(state)` over every sampled neighbour.
///
/// `sampled` must not include the trailing centre state.
pub(crate) fn weighted_sum(
    neighbours: &[State],
    weights: &[i64],
    state_weight: impl Fn(State) -> i64,
) -> i64 {
    neighbours
        .iter()
        .zip(weights)
        .fold(0_i64, |acc, (&state, &weight)| {
            acc.saturating_add(weight.saturating_mul(state_weight(state)))
        })
}

/// Split a sampling into its neighbour states and the centre state.
pub(crate) fn split_centre(sampled: &[State]) -> (&[State], State) {
    match sampled.split_last() {
        Some((&centre, neighbours)) => (neighbours, centre),
        None => (&[], DEAD),
    }
}

/// Trigger sets of a three-state birth/survival/forcing/killing/living rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BsfklSets {
    /// Living sums that let a dead cell be born (alongside `forcing`).
    pub birth: BTreeSet<i64>,
    /// Living sums that keep a live cell alive.
    pub survival: BTreeSet<i64>,
    /// Destructive sums that allow a birth.
    pub forcing: BTreeSet<i64>,
    /// Destructive sums that kill a live cell outright.
    pub killing: BTreeSet<i64>,
    /// Living sums that clear a destructive cell.
    pub living: BTreeSet<i64>,
}

/// A weighted three-state rule.
///
/// State 1 is living and state 2 is destructive. For each cell the rule
/// computes a weighted sum of living neighbours and a weighted sum of
/// destructive neighbours, then:
///
/// - a living cell dies on a killing sum, survives on a survival sum, and
///   otherwise turns destructive;
/// - a destructive cell clears on a living sum and otherwise stays;
/// - a dead cell is born when both the forcing and birth sets match.
#[derive(Debug, Clone)]
pub struct WeightedBsfkl {
    neighbourhood: Vec<Coord>,
    weights: Vec<i64>,
    sets: BsfklSets,
}

impl WeightedBsfkl {
    /// Name of the built-in instance.
    pub const BUILTIN_NAME: &'static str = "BSFKLWeighted_Rule_6";

    /// Create a rule over the 5x5 square with the standard weights.
    pub fn new(sets: BsfklSets) -> Self {
        Self {
            neighbourhood: square(2),
            weights: SQUARE_5X5_WEIGHTS.to_vec(),
            sets,
        }
    }

    /// The built-in `BSFKLWeighted_Rule_6` trigger sets.
    pub fn rule_6_sets() -> BsfklSets {
        BsfklSets {
            birth: BTreeSet::from([6, 28, 34, 39, 40, 45, 65, 67, 80]),
            survival: BTreeSet::from([30, 35, 46, 50, 67, 68, 70, 80]),
            forcing: (0..=10)
                .chain([12, 25, 30, 42, 45, 46, 50])
                .chain(14..=23)
                .collect(),
            killing: BTreeSet::from([7, 10, 14, 20, 32, 35, 50, 66, 67]),
            living: (0..=9)
                .chain(13..=17)
                .chain(21..=31)
                .chain([33, 34, 35, 40, 45, 46, 60, 70])
                .collect(),
        }
    }

    /// The built-in `BSFKLWeighted_Rule_6` definition.
    ///
    /// # Errors
    ///
    /// Propagates [`RuleError`] from definition validation.
    pub fn rule_6() -> Result<RuleDefinition, RuleError> {
        RuleDefinition::new(
            Self::BUILTIN_NAME,
            3,
            1,
            None,
            Arc::new(Self::new(Self::rule_6_sets())),
        )
    }
}

impl Rule for WeightedBsfkl {
    fn neighbourhood(&self, _generation: u64) -> &[Coord] {
        &self.neighbourhood
    }

    fn transition(&self, sampled: &[State], _generation: u64) -> State {
        let (neighbours, centre) = split_centre(sampled);
        let living = weighted_sum(neighbours, &self.weights, |s| i64::from(s == 1));
        let destructive = weighted_sum(neighbours, &self.weights, |s| i64::from(s == 2));
        let sets = &self.sets;
        match centre {
            1 if sets.killing.contains(&destructive) => 0,
            1 if sets.survival.contains(&living) => 1,
            1 => 2,
            2 if sets.living.contains(&living) => 0,
            2 => 2,
            _ if sets.forcing.contains(&destructive) && sets.birth.contains(&living) => 1,
            _ => 0,
        }
    }
}

/// A weighted generations rule.
///
/// Neighbours are summed with positional weights times per-state weights.
/// Active states survive on a survival sum and otherwise advance; dead cells
/// become state 1 on a birth sum; inactive states advance unconditionally,
/// wrapping back to dead after the last state.
#[derive(Debug, Clone)]
pub struct WeightedGenerations {
    n_states: u16,
    survival: BTreeSet<i64>,
    birth: BTreeSet<i64>,
    active: BTreeSet<State>,
    neighbourhood: Vec<Coord>,
    weights: Vec<i64>,
    state_weights: Vec<i64>,
}

impl WeightedGenerations {
    /// Name of the built-in instance.
    pub const BUILTIN_NAME: &'static str = "WeightedGenerations_Rule_7";

    /// Rulestring of the built-in instance.
    pub const BUILTIN_RULESTRING: &'static str = "-1/5,6/1-14";

    /// Create a rule from a parsed rulestring, a neighbourhood with matching
    /// positional weights, and a weight per state.
    ///
    /// States missing from `state_weights` weigh 0.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Rulestring`] if the bands describe an invalid
    /// state count.
    pub fn new(
        spec: &WeightedGenerationsSpec,
        neighbourhood: Vec<Coord>,
        weights: Vec<i64>,
        state_weights: Vec<i64>,
    ) -> Result<Self, RuleError> {
        Ok(Self {
            n_states: spec.n_states()?,
            survival: spec.survival.clone(),
            birth: spec.birth.clone(),
            active: spec.active_states(),
            neighbourhood,
            weights,
            state_weights,
        })
    }

    /// The built-in `WeightedGenerations_Rule_7` definition: diagonal
    /// neighbours weigh 2, orthogonal ones 1.
    ///
    /// # Errors
    ///
    /// Propagates [`RuleError`] from parsing and validation.
    pub fn rule_7() -> Result<RuleDefinition, RuleError> {
        let spec = WeightedGenerationsSpec::parse(Self::BUILTIN_RULESTRING)?;
        let neighbourhood = vec![
            Coord::new(1, -1),
            Coord::new(1, 1),
            Coord::new(-1, 1),
            Coord::new(-1, -1),
            Coord::new(1, 0),
            Coord::new(0, 1),
            Coord::new(-1, 0),
            Coord::new(0, -1),
        ];
        let weights = vec![2, 2, 2, 2, 1, 1, 1, 1];
        let state_weights = vec![0, 0, 2, 0, 1, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, -1, 0];
        let rule = Self::new(&spec, neighbourhood, weights, state_weights)?;
        RuleDefinition::new(Self::BUILTIN_NAME, rule.n_states, 2, None, Arc::new(rule))
    }

    fn advance(&self, state: State) -> State {
        let next = state.saturating_add(1);
        if next >= self.n_states { DEAD } else { next }
    }

    fn is_active(&self, state: State) -> bool {
        self.active.contains(&state)
    }
}

impl Rule for WeightedGenerations {
    fn neighbourhood(&self, _generation: u64) -> &[Coord] {
        &self.neighbourhood
    }

    fn transition(&self, sampled: &[State], _generation: u64) -> State {
        let (neighbours, centre) = split_centre(sampled);
        let sum = weighted_sum(neighbours, &self.weights, |s| {
            self.state_weights
                .get(usize::from(s))
                .copied()
                .unwrap_or(0)
        });
        if self.is_active(centre) {
            if self.survival.contains(&sum) {
                centre
            } else {
                self.advance(centre)
            }
        } else if centre == DEAD {
            State::from(self.birth.contains(&sum))
        } else {
            self.advance(centre)
        }
    }

    fn depends_on_neighbours(&self, state: State, _generation: u64) -> Option<State> {
        (state != DEAD && !self.is_active(state)).then(|| self.advance(state))
    }
}
