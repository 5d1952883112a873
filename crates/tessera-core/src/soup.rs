//! Symmetry-constrained random fills.
//!
//! A soup covers a selection rectangle. Columns map to `x` in
//! `[left, right)` and rows to `y` in `[top, bottom)`. Depending on the
//! symmetry mode only part of the rectangle is drawn; every drawn cell is
//! then mirrored to its partner cells using
//!
//! ```text
//! X_k = right + left - x - k
//! Y_k = bottom + top - y - k
//! ```
//!
//! The `k` offsets per mode are fixed and select the parity of the mirror
//! axis. Partners may fall outside the rectangle.

use core::fmt;
use core::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tessera_types::{Cell, Coord, DEAD, Rect, SelectionError, State};
use tracing::info;

/// Errors raised while generating a soup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SoupError {
    /// Fill density outside `[0, 1]`.
    #[error("soup density {density} is outside [0, 1]")]
    InvalidDensity {
        /// The rejected density.
        density: f64,
    },

    /// A multi-state soup needs at least one live state.
    #[error("multi-state soup needs at least 2 states, rule has {n_states}")]
    TooFewStates {
        /// The rule's state count.
        n_states: State,
    },

    /// No usable selection.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// An unknown symmetry name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown symmetry {0:?}")]
pub struct UnknownSymmetry(pub String);

/// Symmetry mode of a soup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum Symmetry {
    /// No symmetry; every cell is drawn.
    #[default]
    C1,
    /// Two-fold rotation, odd axis.
    C2_1,
    /// Two-fold rotation, mixed axes.
    C2_2,
    /// Two-fold rotation, even axes.
    C2_4,
    /// Vertical mirror, odd axis.
    #[serde(rename = "D2_+1")]
    D2_Plus1,
    /// Vertical mirror, even axis.
    #[serde(rename = "D2_+2")]
    D2_Plus2,
    /// Mirror in both axes, odd.
    #[serde(rename = "D4_+1")]
    D4_Plus1,
    /// Mirror in both axes, mixed.
    #[serde(rename = "D4_+2")]
    D4_Plus2,
    /// Mirror in both axes, even.
    #[serde(rename = "D4_+4")]
    D4_Plus4,
}

/// Which part of the rectangle a mode draws.
#[derive(Clone, Copy)]
enum Span {
    Full,
    Half,
}

/// How a partner coordinate relates to the drawn one on one axis.
#[derive(Clone, Copy)]
enum Mirror {
    Same,
    Flip(i64),
}

impl Symmetry {
    /// Every mode, in display order.
    pub const ALL: [Self; 9] = [
        Self::C1,
        Self::C2_1,
        Self::C2_2,
        Self::C2_4,
        Self::D2_Plus1,
        Self::D2_Plus2,
        Self::D4_Plus1,
        Self::D4_Plus2,
        Self::D4_Plus4,
    ];

    /// The mode's canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::C1 => "C1",
            Self::C2_1 => "C2_1",
            Self::C2_2 => "C2_2",
            Self::C2_4 => "C2_4",
            Self::D2_Plus1 => "D2_+1",
            Self::D2_Plus2 => "D2_+2",
            Self::D4_Plus1 => "D4_+1",
            Self::D4_Plus2 => "D4_+2",
            Self::D4_Plus4 => "D4_+4",
        }
    }

    const fn spans(self) -> (Span, Span) {
        match self {
            Self::C1 => (Span::Full, Span::Full),
            Self::D2_Plus1 | Self::D2_Plus2 => (Span::Full, Span::Half),
            _ => (Span::Half, Span::Half),
        }
    }

    /// Partner mirrors as `(x, y)` pairs.
    const fn partners(self) -> &'static [(Mirror, Mirror)] {
        use Mirror::{Flip, Same};
        match self {
            Self::C1 => &[],
            Self::C2_1 => &[(Flip(3), Flip(3))],
            Self::C2_2 => &[(Flip(2), Flip(3))],
            Self::C2_4 => &[(Flip(2), Flip(2))],
            Self::D2_Plus1 => &[(Same, Flip(3))],
            Self::D2_Plus2 => &[(Same, Flip(2))],
            Self::D4_Plus1 => &[(Flip(3), Flip(3)), (Same, Flip(3)), (Flip(3), Same)],
            Self::D4_Plus2 => &[(Flip(2), Flip(3)), (Same, Flip(3)), (Flip(2), Same)],
            Self::D4_Plus4 => &[(Flip(2), Flip(2)), (Same, Flip(2)), (Flip(2), Same)],
        }
    }
}

impl fmt::Display for Symmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symmetry {
    type Err = UnknownSymmetry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| UnknownSymmetry(s.to_owned()))
    }
}

/// Parameters of a soup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoupSettings {
    /// Probability that a drawn cell is filled.
    #[serde(default = "default_density")]
    pub density: f64,

    /// Symmetry mode.
    #[serde(default)]
    pub symmetry: Symmetry,

    /// Fill with uniform states in `[1, n_states)` instead of state 1.
    #[serde(default)]
    pub multi_state: bool,
}

const fn default_density() -> f64 {
    0.5
}

impl Default for SoupSettings {
    fn default() -> Self {
        Self {
            density: default_density(),
            symmetry: Symmetry::default(),
            multi_state: false,
        }
    }
}

impl SoupSettings {
    /// Produce the ordered writes for a soup over `selection`.
    ///
    /// Unfilled cells appear as explicit clears with state [`DEAD`]. A drawn
    /// value is written to the cell and all of its partners. Drawing order
    /// is `x` outer, `y` inner.
    ///
    /// # Errors
    ///
    /// Returns [`SoupError::Selection`] without a selection, or
    /// [`SoupError::InvalidDensity`] / [`SoupError::TooFewStates`] for
    /// unusable settings.
    pub fn generate(
        &self,
        rng: &mut impl Rng,
        selection: Option<&Rect>,
        n_states: State,
    ) -> Result<Vec<Cell>, SoupError> {
        let rect = selection.ok_or(SelectionError::NoSelection)?;
        if !(0.0..=1.0).contains(&self.density) {
            return Err(SoupError::InvalidDensity {
                density: self.density,
            });
        }
        if self.multi_state && n_states < 2 {
            return Err(SoupError::TooFewStates { n_states });
        }

        info!(
            density = self.density,
            symmetry = %self.symmetry,
            multi_state = self.multi_state,
            rect = %rect,
            "generating soup"
        );

        let (x_span, y_span) = self.symmetry.spans();
        let x_end = span_end(x_span, rect.left(), rect.right());
        let y_end = span_end(y_span, rect.top(), rect.bottom());
        let partners = self.symmetry.partners();
        let x_sum = rect.left().saturating_add(rect.right());
        let y_sum = rect.top().saturating_add(rect.bottom());

        let mut writes = Vec::new();
        for x in rect.left()..x_end {
            for y in rect.top()..y_end {
                let state = self.draw(rng, n_states);
                writes.push(Cell::new(Coord::new(y, x), state));
                for &(mx, my) in partners {
                    let px = mirror(mx, x_sum, x);
                    let py = mirror(my, y_sum, y);
                    writes.push(Cell::new(Coord::new(py, px), state));
                }
            }
        }
        Ok(writes)
    }

    fn draw(&self, rng: &mut impl Rng, n_states: State) -> State {
        if rng.random::<f64>() >= self.density {
            return DEAD;
        }
        if self.multi_state {
            rng.random_range(1..n_states)
        } else {
            1
        }
    }
}

/// `floor((lo + hi) / 2)` for half spans.
const fn span_end(span: Span, lo: i64, hi: i64) -> i64 {
    match span {
        Span::Full => hi,
        Span::Half => lo.saturating_add(hi).div_euclid(2),
    }
}

const fn mirror(mirror: Mirror, sum: i64, v: i64) -> i64 {
    match mirror {
        Mirror::Same => v,
        Mirror::Flip(k) => sum.saturating_sub(v).saturating_sub(k),
    }
}
