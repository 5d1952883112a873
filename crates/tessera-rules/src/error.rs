//! Error types for the `tessera-rules` crate.
//!
//! [`RuleError`] covers definitions that can never run correctly (bad state
//! counts, palettes of the wrong length, empty neighbourhoods).
//! [`RulestringError`] covers malformed rule text.

/// Errors raised while assembling a [`RuleDefinition`](crate::RuleDefinition).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A rule needs at least a background and one live state.
    #[error("rule must have at least 2 states, got {0}")]
    InvalidStateCount(u16),

    /// The alternating period must be at least 1.
    #[error("alternating period must be at least 1")]
    InvalidAlternatingPeriod,

    /// The colour palette does not have one entry per state.
    #[error("colour palette has {actual} entries but the rule has {expected} states")]
    PaletteLength {
        /// Number of states in the rule.
        expected: usize,
        /// Number of palette entries supplied.
        actual: usize,
    },

    /// A generation phase returned no neighbourhood offsets.
    #[error("neighbourhood for phase {phase} is empty")]
    EmptyNeighbourhood {
        /// The phase (`generation % alternating_period`) at fault.
        phase: u64,
    },

    /// No built-in rule has the requested name.
    #[error("unknown built-in rule: {0}")]
    UnknownBuiltin(String),

    /// The rule text could not be parsed.
    #[error("invalid rulestring: {source}")]
    Rulestring {
        /// The underlying parse error.
        #[from]
        source: RulestringError,
    },
}

/// Errors raised while parsing rulestrings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulestringError {
    /// The rulestring was blank.
    #[error("rulestring is empty")]
    Empty,

    /// A section did not start with a recognised letter.
    #[error("unrecognised section {section:?}")]
    UnknownSection {
        /// The offending section text.
        section: String,
    },

    /// The same section appeared twice.
    #[error("section {letter} appears more than once")]
    DuplicateSection {
        /// The repeated section letter.
        letter: char,
    },

    /// A neighbour count was not a digit in `0..=8`.
    #[error("invalid neighbour count {symbol:?} in section {letter}")]
    InvalidCount {
        /// The section letter.
        letter: char,
        /// The offending character.
        symbol: char,
    },

    /// A required section was missing.
    #[error("missing {letter} section")]
    MissingSection {
        /// The missing section letter.
        letter: char,
    },

    /// A number could not be parsed.
    #[error("invalid number {text:?}")]
    InvalidNumber {
        /// The offending text.
        text: String,
    },

    /// The state count is outside the supported range.
    #[error("state count {count} is out of range")]
    StateCount {
        /// The requested number of states.
        count: u64,
    },
}
