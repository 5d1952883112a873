//! Rule lookup by name and by configuration.

use serde::{Deserialize, Serialize};
use tessera_types::Rgb;
use tracing::debug;

use crate::definition::RuleDefinition;
use crate::error::RuleError;
use crate::life_like::{Generations, LifeLike};
use crate::table::AlternatingTable;
use crate::weighted::{WeightedBsfkl, WeightedGenerations};

/// Names accepted by [`builtin`].
pub const BUILTIN_NAMES: [&str; 4] = [
    "Life",
    WeightedBsfkl::BUILTIN_NAME,
    WeightedGenerations::BUILTIN_NAME,
    AlternatingTable::BUILTIN_NAME,
];

/// Resolve a built-in rule by name.
///
/// # Errors
///
/// Returns [`RuleError::UnknownBuiltin`] for names not in [`BUILTIN_NAMES`].
pub fn builtin(name: &str) -> Result<RuleDefinition, RuleError> {
    match name {
        "Life" => LifeLike::definition("B3/S23"),
        WeightedBsfkl::BUILTIN_NAME => WeightedBsfkl::rule_6(),
        WeightedGenerations::BUILTIN_NAME => WeightedGenerations::rule_7(),
        AlternatingTable::BUILTIN_NAME => AlternatingTable::rule_3(),
        other => Err(RuleError::UnknownBuiltin(other.to_owned())),
    }
}

/// A rule selection as it appears in configuration files.
///
/// ```yaml
/// rule:
///   kind: life_like
///   rulestring: B36/S23
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleSpec {
    /// A two-state `B/S` rule.
    LifeLike {
        /// The rulestring, e.g. `B3/S23`.
        rulestring: String,
        /// Optional palette override.
        #[serde(default)]
        palette: Option<Vec<Rgb>>,
    },
    /// A multi-state `B/S/C` generations rule.
    Generations {
        /// The rulestring, e.g. `B2/S/C3`.
        rulestring: String,
        /// Optional palette override.
        #[serde(default)]
        palette: Option<Vec<Rgb>>,
    },
    /// One of the built-in rules.
    Builtin {
        /// Name from [`BUILTIN_NAMES`].
        name: String,
        /// Optional palette override.
        #[serde(default)]
        palette: Option<Vec<Rgb>>,
    },
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self::LifeLike {
            rulestring: "B3/S23".to_owned(),
            palette: None,
        }
    }
}

impl RuleSpec {
    /// Build the definition this spec describes.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] if the rulestring is malformed, the built-in
    /// name is unknown, or the palette has the wrong length.
    pub fn build(&self) -> Result<RuleDefinition, RuleError> {
        let (definition, palette) = match self {
            Self::LifeLike {
                rulestring,
                palette,
            } => (LifeLike::definition(rulestring)?, palette),
            Self::Generations {
                rulestring,
                palette,
            } => (Generations::definition(rulestring)?, palette),
            Self::Builtin { name, palette } => (builtin(name)?, palette),
        };
        debug!(
            rule = definition.rule_name(),
            n_states = definition.n_states(),
            alternating_period = definition.alternating_period(),
            "rule definition built"
        );
        match palette {
            Some(colours) => definition.with_palette(colours.clone()),
            None => Ok(definition),
        }
    }
}
