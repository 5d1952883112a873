//! Every rule's dependency oracle must agree with its transition function.
//!
//! For each rule family this draws random samplings and checks that
//! whenever the oracle answers, the full transition gives the same state.

#![allow(clippy::unwrap_used)]

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tessera_rules::{Generations, RuleDefinition, builtin};

fn check_oracle(def: &RuleDefinition, rng: &mut SmallRng) {
    for generation in 0..def.alternating_period().saturating_mul(2) {
        let size = def.neighbourhood(generation).len();
        for _ in 0..200 {
            let centre = rng.random_range(0..def.n_states());
            let Some(expected) = def.depends_on_neighbours(centre, generation) else {
                continue;
            };
            let mut sampled: Vec<u16> = (0..size)
                .map(|_| rng.random_range(0..def.n_states()))
                .collect();
            sampled.push(centre);
            assert_eq!(
                def.transition(&sampled, generation),
                expected,
                "{} state {centre} generation {generation}",
                def.rule_name()
            );
        }
    }
}

#[test]
fn builtin_oracles_agree_with_transitions() {
    let mut rng = SmallRng::seed_from_u64(7);
    for name in tessera_rules::BUILTIN_NAMES {
        check_oracle(&builtin(name).unwrap(), &mut rng);
    }
}

#[test]
fn generations_oracle_agrees_with_transition() {
    let mut rng = SmallRng::seed_from_u64(11);
    for text in ["B2/S/C3", "B3/S23/C8", "345/2/4"] {
        check_oracle(&Generations::definition(text).unwrap(), &mut rng);
    }
}

#[test]
fn transitions_stay_in_range() {
    let mut rng = SmallRng::seed_from_u64(3);
    for name in tessera_rules::BUILTIN_NAMES {
        let def = builtin(name).unwrap();
        for generation in 0..def.alternating_period() {
            let size = def.neighbourhood(generation).len();
            for _ in 0..500 {
                let sampled: Vec<u16> = (0..=size)
                    .map(|_| rng.random_range(0..def.n_states()))
                    .collect();
                assert!(def.is_valid_state(def.transition(&sampled, generation)));
            }
        }
    }
}
