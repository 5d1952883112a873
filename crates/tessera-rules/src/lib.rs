//! Rule definitions for the Tessera cellular automaton workspace.
//!
//! A rule is a [`Rule`] trait object wrapped in an immutable, validated
//! [`RuleDefinition`]. The engine only ever talks to the definition, so any
//! rule family plugs in the same way:
//!
//! - [`FnRule`] -- closures, for ad-hoc and test rules.
//! - [`LifeLike`] / [`Generations`] -- Moore-neighbourhood rulestring rules.
//! - [`WeightedBsfkl`] / [`WeightedGenerations`] -- weighted-sum rules.
//! - [`AlternatingTable`] -- table lookups with phase-dependent weights.
//!
//! [`RuleSpec`] selects one of these from configuration and [`builtin`]
//! resolves the named built-ins.

pub mod definition;
pub mod error;
pub mod life_like;
pub mod neighbourhood;
pub mod palette;
pub mod registry;
pub mod rulestring;
pub mod table;
pub mod weighted;

pub use definition::{FnRule, Rule, RuleDefinition};
pub use error::{RuleError, RulestringError};
pub use life_like::{Generations, LifeLike};
pub use registry::{BUILTIN_NAMES, RuleSpec, builtin};
pub use rulestring::{CountSet, GenerationsSpec, LifeLikeSpec, WeightedGenerationsSpec};
pub use table::AlternatingTable;
pub use weighted::{BsfklSets, WeightedBsfkl, WeightedGenerations};
