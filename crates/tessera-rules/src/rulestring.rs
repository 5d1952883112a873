//! Rulestring parsing.
//!
//! Three textual families are understood:
//!
//! - Life-like (`B3/S23`, `S23/B3`, or legacy `23/3` which is survival
//!   first).
//! - Generations (`B2/S/C3`, or legacy `345/2/4` as survival, birth, count).
//! - Weighted generations (`-1/5,6/1-14`): comma-separated survival sums,
//!   comma-separated birth sums, and dash-separated band widths that
//!   alternate between active and inactive states starting at state 1.
//!
//! Section letters are case-insensitive and surrounding whitespace is
//! ignored. Parsing produces plain data; the rule modules turn it into a
//! runnable [`Rule`](crate::Rule).

use std::collections::BTreeSet;

use tessera_types::State;

use crate::error::RulestringError;

/// A set of Moore neighbour counts in `0..=8`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CountSet(u16);

impl CountSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Build a set from counts, ignoring anything above 8.
    pub fn from_counts(counts: impl IntoIterator<Item = u8>) -> Self {
        let mut set = Self::EMPTY;
        for count in counts {
            set.insert(count);
        }
        set
    }

    /// Add a count. Counts above 8 are ignored.
    pub fn insert(&mut self, count: u8) {
        if count <= 8
            && let Some(bit) = 1_u16.checked_shl(u32::from(count))
        {
            self.0 |= bit;
        }
    }

    /// Whether `count` is in the set.
    pub fn contains(self, count: usize) -> bool {
        u32::try_from(count)
            .ok()
            .filter(|&c| c <= 8)
            .and_then(|c| 1_u16.checked_shl(c))
            .is_some_and(|bit| self.0 & bit != 0)
    }

    /// Whether the set holds no counts.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parse a run of decimal digits belonging to section `letter`.
    fn parse(letter: char, digits: &str) -> Result<Self, RulestringError> {
        let mut set = Self::EMPTY;
        for symbol in digits.chars() {
            let count = symbol
                .to_digit(10)
                .and_then(|d| u8::try_from(d).ok())
                .filter(|&d| d <= 8)
                .ok_or(RulestringError::InvalidCount { letter, symbol })?;
            set.insert(count);
        }
        Ok(set)
    }
}

impl core::fmt::Display for CountSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for count in 0..=8_u8 {
            if self.contains(usize::from(count)) {
                write!(f, "{count}")?;
            }
        }
        Ok(())
    }
}

/// Parsed `B/S` rulestring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifeLikeSpec {
    /// Neighbour counts that turn a dead cell on.
    pub birth: CountSet,
    /// Neighbour counts that keep a live cell on.
    pub survival: CountSet,
}

impl LifeLikeSpec {
    /// Parse a life-like rulestring.
    ///
    /// # Errors
    ///
    /// Returns a [`RulestringError`] describing the first problem found.
    pub fn parse(text: &str) -> Result<Self, RulestringError> {
        let sections = split_sections(text)?;
        if let Some(lettered) = lettered_sections(&sections, &['B', 'S'])? {
            let birth = required(&lettered, 'B')?;
            let survival = required(&lettered, 'S')?;
            return Ok(Self {
                birth: CountSet::parse('B', birth)?,
                survival: CountSet::parse('S', survival)?,
            });
        }
        match sections.as_slice() {
            [survival, birth] => Ok(Self {
                birth: CountSet::parse('B', birth)?,
                survival: CountSet::parse('S', survival)?,
            }),
            _ => Err(RulestringError::UnknownSection {
                section: text.trim().to_owned(),
            }),
        }
    }
}

impl core::fmt::Display for LifeLikeSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "B{}/S{}", self.birth, self.survival)
    }
}

/// Parsed `B/S/C` generations rulestring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationsSpec {
    /// Neighbour counts that turn a dead cell on.
    pub birth: CountSet,
    /// Neighbour counts that keep a fully live cell on.
    pub survival: CountSet,
    /// Total number of states, including dead and the dying states.
    pub n_states: u16,
}

impl GenerationsSpec {
    /// Parse a generations rulestring.
    ///
    /// # Errors
    ///
    /// Returns a [`RulestringError`] describing the first problem found.
    pub fn parse(text: &str) -> Result<Self, RulestringError> {
        let sections = split_sections(text)?;
        let (birth, survival, count) =
            if let Some(lettered) = lettered_sections(&sections, &['B', 'S', 'C'])? {
                (
                    required(&lettered, 'B')?,
                    required(&lettered, 'S')?,
                    required(&lettered, 'C')?,
                )
            } else {
                match sections.as_slice() {
                    [survival, birth, count] => (*birth, *survival, *count),
                    _ => {
                        return Err(RulestringError::UnknownSection {
                            section: text.trim().to_owned(),
                        });
                    }
                }
            };
        Ok(Self {
            birth: CountSet::parse('B', birth)?,
            survival: CountSet::parse('S', survival)?,
            n_states: parse_state_count(count)?,
        })
    }
}

impl core::fmt::Display for GenerationsSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "B{}/S{}/C{}", self.birth, self.survival, self.n_states)
    }
}

/// Parsed weighted-generations rulestring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedGenerationsSpec {
    /// Weighted sums that keep an active cell in place.
    pub survival: BTreeSet<i64>,
    /// Weighted sums that turn a dead cell into state 1.
    pub birth: BTreeSet<i64>,
    /// Band widths, alternating active then inactive, starting at state 1.
    pub bands: Vec<u16>,
}

impl WeightedGenerationsSpec {
    /// Parse a `survival/birth/bands` rulestring.
    ///
    /// # Errors
    ///
    /// Returns a [`RulestringError`] describing the first problem found,
    /// including [`RulestringError::StateCount`] when the bands add up to
    /// fewer than 2 or more than `u16::MAX` states.
    pub fn parse(text: &str) -> Result<Self, RulestringError> {
        let sections = split_sections(text)?;
        let [survival, birth, bands] = sections.as_slice() else {
            return Err(RulestringError::UnknownSection {
                section: text.trim().to_owned(),
            });
        };
        let bands = bands
            .split('-')
            .map(|width| {
                width
                    .trim()
                    .parse::<u16>()
                    .ok()
                    .filter(|&w| w > 0)
                    .ok_or_else(|| RulestringError::InvalidNumber {
                        text: width.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let spec = Self {
            survival: parse_sums(survival)?,
            birth: parse_sums(birth)?,
            bands,
        };
        spec.n_states()?;
        Ok(spec)
    }

    /// Total state count: the band widths plus the dead state.
    ///
    /// # Errors
    ///
    /// Returns [`RulestringError::StateCount`] when the total does not fit.
    pub fn n_states(&self) -> Result<u16, RulestringError> {
        let total = self
            .bands
            .iter()
            .fold(1_u64, |acc, &w| acc.saturating_add(u64::from(w)));
        u16::try_from(total)
            .ok()
            .filter(|&n| n >= 2)
            .ok_or(RulestringError::StateCount { count: total })
    }

    /// States belonging to active bands.
    ///
    /// Active cells hold their state when their weighted sum is a survival
    /// sum; every other non-zero state advances unconditionally.
    pub fn active_states(&self) -> BTreeSet<State> {
        let mut active = BTreeSet::new();
        let mut next: State = 1;
        for (band, &width) in self.bands.iter().enumerate() {
            for _ in 0..width {
                if band % 2 == 0 {
                    active.insert(next);
                }
                next = next.saturating_add(1);
            }
        }
        active
    }
}

impl core::fmt::Display for WeightedGenerationsSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let join = |set: &BTreeSet<i64>| {
            set.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let bands = self
            .bands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("-");
        write!(f, "{}/{}/{bands}", join(&self.survival), join(&self.birth))
    }
}

/// Split on `/`, trimming whitespace, rejecting blank input.
fn split_sections(text: &str) -> Result<Vec<&str>, RulestringError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(RulestringError::Empty);
    }
    Ok(text.split('/').map(str::trim).collect())
}

/// Interpret sections as letter-prefixed, if they are.
///
/// Returns `Ok(None)` when no section starts with a letter (legacy form).
fn lettered_sections<'a>(
    sections: &[&'a str],
    allowed: &[char],
) -> Result<Option<Vec<(char, &'a str)>>, RulestringError> {
    let is_lettered = |s: &&str| s.chars().next().is_some_and(char::is_alphabetic);
    if !sections.iter().any(is_lettered) {
        return Ok(None);
    }
    let mut found: Vec<(char, &str)> = Vec::with_capacity(sections.len());
    for section in sections {
        let mut chars = section.chars();
        let letter = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| allowed.contains(c))
            .ok_or_else(|| RulestringError::UnknownSection {
                section: (*section).to_owned(),
            })?;
        if found.iter().any(|&(l, _)| l == letter) {
            return Err(RulestringError::DuplicateSection { letter });
        }
        found.push((letter, chars.as_str()));
    }
    Ok(Some(found))
}

fn required<'a>(sections: &[(char, &'a str)], letter: char) -> Result<&'a str, RulestringError> {
    sections
        .iter()
        .find(|&&(l, _)| l == letter)
        .map(|&(_, body)| body)
        .ok_or(RulestringError::MissingSection { letter })
}

fn parse_state_count(text: &str) -> Result<u16, RulestringError> {
    let count: u64 = text
        .trim()
        .parse()
        .ok()
        .ok_or_else(|| RulestringError::InvalidNumber {
            text: text.to_owned(),
        })?;
    u16::try_from(count)
        .ok()
        .filter(|&n| n >= 2)
        .ok_or(RulestringError::StateCount { count })
}

fn parse_sums(text: &str) -> Result<BTreeSet<i64>, RulestringError> {
    if text.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    text.split(',')
        .map(|sum| {
            sum.trim()
                .parse::<i64>()
                .ok()
                .ok_or_else(|| RulestringError::InvalidNumber {
                    text: sum.to_owned(),
                })
        })
        .collect()
}
