//! The result of classifying a pattern's long-term behavior.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::Coord;

/// Classification returned by the pattern identifier.
///
/// This is plain structured data; turning it into user-facing text is the
/// caller's job. The [`Display`](core::fmt::Display) impl exists for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identification {
    /// The pattern reproduces itself every generation without moving.
    StillLife,
    /// The pattern returns to its original shape and position.
    Oscillator {
        /// Generations per cycle (at least 2).
        period: u64,
    },
    /// The pattern returns to its original shape at a new position.
    Spaceship {
        /// Generations per cycle.
        period: u64,
        /// Movement of the bounding box's minimum corner per cycle.
        displacement: Coord,
    },
    /// Every cell died.
    Extinct {
        /// The generation at which the grid first became empty.
        generation: u64,
    },
    /// No repetition was found within the generation budget.
    Unidentified {
        /// Number of generations simulated before giving up.
        budget: u64,
    },
}

impl Identification {
    /// Whether the pattern was found to repeat (still life, oscillator, or
    /// spaceship).
    pub const fn is_periodic(&self) -> bool {
        matches!(
            self,
            Self::StillLife | Self::Oscillator { .. } | Self::Spaceship { .. }
        )
    }

    /// The period of a repeating pattern, if any.
    pub const fn period(&self) -> Option<u64> {
        match self {
            Self::StillLife => Some(1),
            Self::Oscillator { period } | Self::Spaceship { period, .. } => Some(*period),
            Self::Extinct { .. } | Self::Unidentified { .. } => None,
        }
    }
}

impl core::fmt::Display for Identification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StillLife => write!(f, "still life"),
            Self::Oscillator { period } => write!(f, "period {period} oscillator"),
            Self::Spaceship {
                period,
                displacement,
            } => write!(f, "period {period} spaceship moving {displacement}"),
            Self::Extinct { generation } => write!(f, "extinct at generation {generation}"),
            Self::Unidentified { budget } => {
                write!(f, "unidentified after {budget} generations")
            }
        }
    }
}
