//! Table-driven rules with generation-dependent weights.

use std::sync::Arc;

use tessera_types::{Coord, DEAD, State};

use crate::definition::{Rule, RuleDefinition, phase};
use crate::error::RuleError;
use crate::neighbourhood::square;
use crate::weighted::{split_centre, weighted_sum};

/// A rule that computes a weighted neighbour sum and looks the next state up
/// in a per-state table.
///
/// The positional weights cycle through `phase_weights` as generations
/// advance. A negative sum, or a sum past the end of the centre's row,
/// yields the dead state.
#[derive(Debug, Clone)]
pub struct AlternatingTable {
    neighbourhood: Vec<Coord>,
    phase_weights: Vec<Vec<i64>>,
    state_weights: Vec<i64>,
    table: Vec<Vec<State>>,
}

impl AlternatingTable {
    /// Name of the built-in instance.
    pub const BUILTIN_NAME: &'static str = "Rule_3";

    /// Assemble a table rule.
    ///
    /// `table[state][sum]` is the next state of a cell in `state` whose
    /// weighted sum is `sum`.
    pub const fn new(
        neighbourhood: Vec<Coord>,
        phase_weights: Vec<Vec<i64>>,
        state_weights: Vec<i64>,
        table: Vec<Vec<State>>,
    ) -> Self {
        Self {
            neighbourhood,
            phase_weights,
            state_weights,
            table,
        }
    }

    /// Number of distinct weight phases.
    pub fn period(&self) -> u64 {
        u64::try_from(self.phase_weights.len()).unwrap_or(1).max(1)
    }

    /// The built-in `Rule_3` definition: six states over the 5x5 square,
    /// with weights cycling every three generations.
    ///
    /// # Errors
    ///
    /// Propagates [`RuleError`] from definition validation.
    pub fn rule_3() -> Result<RuleDefinition, RuleError> {
        let phase_weights = vec![
            vec![
                1, 2, 3, 2, 1, 2, 6, 4, 6, 2, 3, 4, 9, 4, 3, 2, 6, 4, 6, 2, 1, 2, 3, 2, 1,
            ],
            vec![
                1, 2, 3, 2, 1, 2, 4, 6, 4, 2, 3, 6, 9, 6, 3, 2, 4, 6, 4, 2, 1, 2, 3, 2, 1,
            ],
            vec![
                1, 2, 3, 2, 1, 2, 5, 5, 5, 2, 3, 5, 9, 5, 3, 2, 5, 5, 5, 2, 1, 2, 3, 2, 1,
            ],
        ];
        let table: Vec<Vec<State>> = [
            ROW_0.as_slice(),
            ROW_1.as_slice(),
            ROW_2.as_slice(),
            ROW_3.as_slice(),
            ROW_4.as_slice(),
            ROW_5.as_slice(),
        ]
        .into_iter()
        .map(<[State]>::to_vec)
        .collect();
        let n_states = u16::try_from(table.len()).unwrap_or(0);
        let rule = Self::new(square(2), phase_weights, vec![0, 1, 0, 0, -1, 1], table);
        let period = rule.period();
        RuleDefinition::new(Self::BUILTIN_NAME, n_states, period, None, Arc::new(rule))
    }
}

impl Rule for AlternatingTable {
    fn neighbourhood(&self, _generation: u64) -> &[Coord] {
        &self.neighbourhood
    }

    fn transition(&self, sampled: &[State], generation: u64) -> State {
        let (neighbours, centre) = split_centre(sampled);
        let idx = usize::try_from(phase(generation, self.period())).unwrap_or(0);
        let Some(weights) = self.phase_weights.get(idx) else {
            return DEAD;
        };
        let sum = weighted_sum(neighbours, weights, |s| {
            self.state_weights
                .get(usize::from(s))
                .copied()
                .unwrap_or(0)
        });
        usize::try_from(sum)
            .ok()
            .and_then(|n| self.table.get(usize::from(centre))?.get(n).copied())
            .unwrap_or(DEAD)
    }
}

// `Rule_3` next-state rows, one per centre state, indexed by weighted sum.
const ROW_0: [State; 81] = [
    0, 0, 0, 0, 0, 3, 1, 0, 3, 0, 1, 0, 0, 2, 0, 0, 0, 2, 0, 0,
    0, 0, 0, 0, 0, 3, 1, 0, 3, 3, 4, 5, 4, 0, 0, 0, 0, 0, 1, 0,
    0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 2, 0, 1, 3, 3, 3, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1,
    0,
];
const ROW_1: [State; 81] = [
    2, 2, 2, 2, 1, 3, 2, 2, 1, 2, 2, 1, 2, 1, 1, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 3, 0, 0, 0, 2, 2, 2,
    2, 2, 2, 2, 2, 1, 2, 1, 2, 2, 2, 3, 0, 0, 2, 1, 4, 5, 1, 1,
    2, 1, 1, 1, 1, 2, 2, 1, 2, 2, 2, 2, 1, 2, 2, 2, 1, 1, 2, 2,
    1,
];
const ROW_2: [State; 82] = [
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 1, 3, 3, 3, 3, 1, 1, 3, 3, 3, 3, 1, 3, 3, 3, 3, 3, 3, 3,
    3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 1, 3, 3, 3, 1, 2, 2, 2, 2,
    3, 3, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    3, 3,
];
const ROW_3: [State; 82] = [
    4, 4, 4, 4, 4, 0, 4, 4, 4, 4, 1, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 1, 4, 4, 4, 1, 0,
    4, 4, 4, 4, 4, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4,
];
const ROW_4: [State; 82] = [
    5, 5, 5, 1, 5, 5, 4, 5, 5, 5, 5, 5, 5, 5, 5, 3, 3, 3, 5, 5,
    5, 5, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 4,
    4, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 4, 4, 4, 5, 5, 5, 5, 5, 5,
    5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5,
    5, 5,
];
const ROW_5: [State; 81] = [
    0, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0,
];
