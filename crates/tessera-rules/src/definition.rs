//! The rule capability contract and the immutable rule record.
//!
//! A rule is three pure functions of local data:
//!
//! 1. [`Rule::neighbourhood`] -- the ordered offsets a cell samples in a
//!    given generation. Congruent generations (modulo the alternating
//!    period) must return the same offsets.
//! 2. [`Rule::transition`] -- the next state given the sampled states, with
//!    the acting cell's own state appended as the last element.
//! 3. [`Rule::depends_on_neighbours`] -- the dependency oracle. Returning
//!    `Some(next)` promises that `transition` would yield `next` for every
//!    possible sampling, letting the engine skip sampling entirely.
//!
//! [`RuleDefinition`] bundles one rule with its metadata. It is validated
//! once at construction and is immutable afterwards; reloading a rule means
//! building a new definition, never mutating an old one.

use std::sync::Arc;

use tessera_types::{Coord, Rgb, State};

use crate::error::RuleError;
use crate::palette;

/// The three-function capability set every rule implements.
///
/// Implementations must be deterministic and must not keep hidden mutable
/// state: the engine may call them in any order, from any thread.
pub trait Rule: Send + Sync + core::fmt::Debug {
    /// Offsets sampled by every cell in `generation`, in sampling order.
    fn neighbourhood(&self, generation: u64) -> &[Coord];

    /// Next state of a cell.
    ///
    /// `sampled` holds the state at each offset of
    /// [`neighbourhood(generation)`](Rule::neighbourhood), in order, followed
    /// by the cell's own current state.
    fn transition(&self, sampled: &[State], generation: u64) -> State;

    /// Next state of a cell whose result does not depend on its neighbours,
    /// or `None` when the neighbourhood must be sampled.
    fn depends_on_neighbours(&self, _state: State, _generation: u64) -> Option<State> {
        None
    }
}

/// Compute `generation % period`, treating a zero period as 1.
pub const fn phase(generation: u64, period: u64) -> u64 {
    match generation.checked_rem(period) {
        Some(phase) => phase,
        None => 0,
    }
}

/// An immutable, validated description of one automaton.
///
/// Cloning is cheap: the rule itself sits behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    rule_name: String,
    n_states: u16,
    alternating_period: u64,
    colour_palette: Option<Vec<Rgb>>,
    rule: Arc<dyn Rule>,
}

impl RuleDefinition {
    /// Validate and assemble a rule definition.
    ///
    /// # Errors
    ///
    /// - [`RuleError::InvalidStateCount`] if `n_states < 2`.
    /// - [`RuleError::InvalidAlternatingPeriod`] if `alternating_period` is 0.
    /// - [`RuleError::PaletteLength`] if a palette is given whose length is
    ///   not `n_states`.
    /// - [`RuleError::EmptyNeighbourhood`] if any phase samples no offsets.
    pub fn new(
        rule_name: impl Into<String>,
        n_states: u16,
        alternating_period: u64,
        colour_palette: Option<Vec<Rgb>>,
        rule: Arc<dyn Rule>,
    ) -> Result<Self, RuleError> {
        if n_states < 2 {
            return Err(RuleError::InvalidStateCount(n_states));
        }
        if alternating_period == 0 {
            return Err(RuleError::InvalidAlternatingPeriod);
        }
        if let Some(colours) = &colour_palette {
            palette::validate(colours, n_states)?;
        }
        for phase in 0..alternating_period {
            if rule.neighbourhood(phase).is_empty() {
                return Err(RuleError::EmptyNeighbourhood { phase });
            }
        }
        Ok(Self {
            rule_name: rule_name.into(),
            n_states,
            alternating_period,
            colour_palette,
            rule,
        })
    }

    /// Replace the palette, returning a new definition.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::PaletteLength`] if the palette length is not
    /// `n_states`.
    pub fn with_palette(self, colours: Vec<Rgb>) -> Result<Self, RuleError> {
        palette::validate(&colours, self.n_states)?;
        Ok(Self {
            colour_palette: Some(colours),
            ..self
        })
    }

    /// Human-readable rule name, written into RLE headers.
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Number of states, including the background.
    pub const fn n_states(&self) -> u16 {
        self.n_states
    }

    /// Cycle length of generation-dependent behaviour.
    pub const fn alternating_period(&self) -> u64 {
        self.alternating_period
    }

    /// The explicitly configured palette, if any.
    pub fn colour_palette(&self) -> Option<&[Rgb]> {
        self.colour_palette.as_deref()
    }

    /// The configured palette, or a generated default when none was given.
    pub fn resolved_palette(&self) -> Vec<Rgb> {
        self.colour_palette
            .clone()
            .unwrap_or_else(|| palette::default_palette(self.n_states))
    }

    /// Whether `state` lies in `[0, n_states)`.
    pub const fn is_valid_state(&self, state: State) -> bool {
        state < self.n_states
    }

    /// `generation % alternating_period`.
    pub const fn phase(&self, generation: u64) -> u64 {
        phase(generation, self.alternating_period)
    }

    /// Offsets sampled in `generation`.
    pub fn neighbourhood(&self, generation: u64) -> &[Coord] {
        self.rule.neighbourhood(generation)
    }

    /// Next state from a full sampling.
    pub fn transition(&self, sampled: &[State], generation: u64) -> State {
        self.rule.transition(sampled, generation)
    }

    /// Dependency oracle.
    pub fn depends_on_neighbours(&self, state: State, generation: u64) -> Option<State> {
        self.rule.depends_on_neighbours(state, generation)
    }
}

/// Boxed transition function used by [`FnRule`].
type TransitionFn = dyn Fn(&[State], u64) -> State + Send + Sync;

/// Boxed dependency oracle used by [`FnRule`].
type OracleFn = dyn Fn(State, u64) -> Option<State> + Send + Sync;

/// A rule assembled from plain closures.
///
/// The neighbourhood closure is evaluated once per phase at construction and
/// the results are stored, so congruent generations always see identical
/// offsets.
pub struct FnRule {
    neighbourhoods: Vec<Vec<Coord>>,
    transition: Box<TransitionFn>,
    oracle: Option<Box<OracleFn>>,
}

impl FnRule {
    /// Build a rule from a neighbourhood function and a transition function.
    ///
    /// `neighbourhood` is called for each phase in `0..alternating_period`
    /// (at least once).
    pub fn new<N, T>(alternating_period: u64, neighbourhood: N, transition: T) -> Self
    where
        N: Fn(u64) -> Vec<Coord>,
        T: Fn(&[State], u64) -> State + Send + Sync + 'static,
    {
        Self {
            neighbourhoods: (0..alternating_period.max(1)).map(neighbourhood).collect(),
            transition: Box::new(transition),
            oracle: None,
        }
    }

    /// Attach a dependency oracle.
    #[must_use]
    pub fn with_oracle<O>(self, oracle: O) -> Self
    where
        O: Fn(State, u64) -> Option<State> + Send + Sync + 'static,
    {
        Self {
            oracle: Some(Box::new(oracle)),
            ..self
        }
    }
}

impl core::fmt::Debug for FnRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnRule")
            .field("phases", &self.neighbourhoods.len())
            .field("has_oracle", &self.oracle.is_some())
            .finish_non_exhaustive()
    }
}

impl Rule for FnRule {
    fn neighbourhood(&self, generation: u64) -> &[Coord] {
        let phases = u64::try_from(self.neighbourhoods.len()).unwrap_or(1);
        let idx = usize::try_from(phase(generation, phases)).unwrap_or(0);
        self.neighbourhoods.get(idx).map_or(&[], Vec::as_slice)
    }

    fn transition(&self, sampled: &[State], generation: u64) -> State {
        (self.transition)(sampled, generation)
    }

    fn depends_on_neighbours(&self, state: State, generation: u64) -> Option<State> {
        self.oracle
            .as_ref()
            .and_then(|oracle| oracle(state, generation))
    }
}
