//! Outer-totalistic Moore-neighbourhood rules.

use std::sync::Arc;

use tessera_types::{Coord, DEAD, State};

use crate::definition::{Rule, RuleDefinition};
use crate::error::RuleError;
use crate::neighbourhood::MOORE;
use crate::rulestring::{GenerationsSpec, LifeLikeSpec};
use crate::weighted::split_centre;

/// A two-state birth/survival rule such as Conway's `B3/S23`.
#[derive(Debug, Clone)]
pub struct LifeLike {
    spec: LifeLikeSpec,
}

impl LifeLike {
    /// Wrap a parsed rulestring.
    pub const fn new(spec: LifeLikeSpec) -> Self {
        Self { spec }
    }

    /// Parse `text` and build a ready-to-run definition named after the
    /// canonical rulestring.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Rulestring`] if `text` does not parse.
    pub fn definition(text: &str) -> Result<RuleDefinition, RuleError> {
        let spec = LifeLikeSpec::parse(text)?;
        RuleDefinition::new(spec.to_string(), 2, 1, None, Arc::new(Self::new(spec)))
    }
}

impl Rule for LifeLike {
    fn neighbourhood(&self, _generation: u64) -> &[Coord] {
        &MOORE
    }

    fn transition(&self, sampled: &[State], _generation: u64) -> State {
        let (neighbours, centre) = split_centre(sampled);
        let live = neighbours.iter().filter(|&&s| s != DEAD).count();
        let on = if centre == DEAD {
            self.spec.birth.contains(live)
        } else {
            self.spec.survival.contains(live)
        };
        State::from(on)
    }
}

/// A generations rule: live cells that fail to survive decay through a
/// chain of dying states before returning to dead.
///
/// Only state 1 counts as a neighbour. Dying states advance regardless of
/// their neighbourhood, which the dependency oracle reports.
#[derive(Debug, Clone)]
pub struct Generations {
    spec: GenerationsSpec,
}

impl Generations {
    /// Wrap a parsed rulestring.
    pub const fn new(spec: GenerationsSpec) -> Self {
        Self { spec }
    }

    /// Parse `text` and build a ready-to-run definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Rulestring`] if `text` does not parse.
    pub fn definition(text: &str) -> Result<RuleDefinition, RuleError> {
        let spec = GenerationsSpec::parse(text)?;
        RuleDefinition::new(
            spec.to_string(),
            spec.n_states,
            1,
            None,
            Arc::new(Self::new(spec)),
        )
    }

    fn advance(&self, state: State) -> State {
        let next = state.saturating_add(1);
        if next >= self.spec.n_states { DEAD } else { next }
    }
}

impl Rule for Generations {
    fn neighbourhood(&self, _generation: u64) -> &[Coord] {
        &MOORE
    }

    fn transition(&self, sampled: &[State], _generation: u64) -> State {
        let (neighbours, centre) = split_centre(sampled);
        let live = neighbours.iter().filter(|&&s| s == 1).count();
        match centre {
            DEAD => State::from(self.spec.birth.contains(live)),
            1 if self.spec.survival.contains(live) => 1,
            other => self.advance(other),
        }
    }

    fn depends_on_neighbours(&self, state: State, _generation: u64) -> Option<State> {
        (state > 1).then(|| self.advance(state))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample(live_neighbours: usize, centre: State) -> Vec<State> {
        let mut sampled = vec![0; 8];
        for slot in sampled.iter_mut().take(live_neighbours) {
            *slot = 1;
        }
        sampled.push(centre);
        sampled
    }

    #[test]
    fn conway_birth_and_survival() {
        let rule = LifeLike::new(LifeLikeSpec::parse("B3/S23").unwrap());
        assert_eq!(rule.transition(&sample(3, 0), 0), 1);
        assert_eq!(rule.transition(&sample(2, 0), 0), 0);
        assert_eq!(rule.transition(&sample(2, 1), 0), 1);
        assert_eq!(rule.transition(&sample(4, 1), 0), 0);
        assert_eq!(rule.depends_on_neighbours(1, 0), None);
    }

    #[test]
    fn life_like_definition_is_named_canonically() {
        let def = LifeLike::definition("23/3").unwrap();
        assert_eq!(def.rule_name(), "B3/S23");
        assert_eq!(def.n_states(), 2);
        assert_eq!(def.neighbourhood(0).len(), 8);
    }

    #[test]
    fn generations_decay_chain() {
        let rule = Generations::new(GenerationsSpec::parse("B2/S/C3").unwrap());
        assert_eq!(rule.transition(&sample(2, 0), 0), 1);
        assert_eq!(rule.transition(&sample(2, 1), 0), 2);
        assert_eq!(rule.transition(&sample(0, 2), 0), 0);
        assert_eq!(rule.depends_on_neighbours(2, 0), Some(0));
        assert_eq!(rule.depends_on_neighbours(1, 0), None);
        assert_eq!(rule.depends_on_neighbours(0, 0), None);
    }

    #[test]
    fn generations_oracle_matches_transition() {
        let rule = Generations::new(GenerationsSpec::parse("B3/S23/C5").unwrap());
        for state in 2..5 {
            for live in 0..=8 {
                assert_eq!(
                    rule.depends_on_neighbours(state, 0),
                    Some(rule.transition(&sample(live, state), 0))
                );
            }
        }
    }

    #[test]
    fn only_state_one_counts_as_neighbour() {
        let rule = Generations::new(GenerationsSpec::parse("B2/S/C3").unwrap());
        let mut sampled = vec![2, 2, 0, 0, 0, 0, 0, 0];
        sampled.push(0);
        assert_eq!(rule.transition(&sampled, 0), 0);
    }
}
