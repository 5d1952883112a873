//! Run-length encoded pattern text.
//!
//! ```text
//! x = 2, y = 2, rule = Test
//! A.$.B$!
//! ```
//!
//! The header gives the rectangle size and the rule name. The body scans
//! the rectangle row by row, top to bottom and left to right. A dead cell
//! is `.`, state `s` is the character with code `64 + s` (`A` for 1 up to
//! `~` for 62), and every row ends with `$`. The whole stream is then
//! run-length compressed: a run of `k > 1` identical symbols is written as
//! `k` followed by the symbol. `!` terminates the body.
//!
//! Decoded coordinates are relative to the rectangle's top-left corner.
//! Every run must stay inside the header's rectangle: no cell past column
//! `x` or row `y`, and no more than `y` row ends. Decoding either returns a
//! complete grid or an error; partial grids are never returned.

use serde::{Deserialize, Serialize};
use tessera_types::{Coord, Rect, SelectionError, SparseGrid, State};

/// Highest state that has a body symbol.
pub const MAX_STATE: State = 62;

const DEAD_SYMBOL: char = '.';
const ROW_END: char = '$';
const TERMINATOR: char = '!';
const SYMBOL_BASE: u32 = 64;

/// Errors raised while encoding or decoding RLE text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RleError {
    /// A body character is not `.`, `$`, `!`, a digit, or a state symbol.
    #[error("unknown symbol {symbol:?} at body position {position}")]
    UnknownSymbol {
        /// The offending character.
        symbol: char,
        /// Zero-based index into the body.
        position: usize,
    },

    /// A run count of zero.
    #[error("zero run length at body position {position}")]
    ZeroRunLength {
        /// Index of the first digit of the count.
        position: usize,
    },

    /// A run count that is not followed by a symbol.
    #[error("run count at body position {position} is not followed by a symbol")]
    DanglingCount {
        /// Index of the first digit of the count.
        position: usize,
    },

    /// The body ended without `!`.
    #[error("body is missing the terminating '!'")]
    MissingTerminator,

    /// A run count or the resulting coordinate does not fit.
    #[error("run at body position {position} overflows")]
    RunOverflow {
        /// Index of the symbol whose run overflowed.
        position: usize,
    },

    /// A run reaches past the rectangle declared in the header.
    #[error("run at body position {position} exceeds the {width}x{height} header")]
    RunExceedsHeader {
        /// Index of the symbol whose run overflowed the rectangle.
        position: usize,
        /// Declared width.
        width: u64,
        /// Declared height.
        height: u64,
    },

    /// The text has no header line.
    #[error("missing 'x = ..., y = ...' header line")]
    MissingHeader,

    /// The header line could not be parsed.
    #[error("invalid header line {line:?}")]
    InvalidHeader {
        /// The offending line.
        line: String,
    },

    /// A state has no body symbol.
    #[error("state {state} cannot be encoded (maximum is {MAX_STATE})")]
    StateOutOfAlphabet {
        /// The offending state.
        state: State,
    },

    /// The export needs a selection rectangle.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// The parsed header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RleHeader {
    /// Rectangle width (`x`).
    pub width: u64,
    /// Rectangle height (`y`).
    pub height: u64,
    /// Rule name, if the header names one.
    pub rule: Option<String>,
}

impl core::fmt::Display for RleHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "x = {}, y = {}", self.width, self.height)?;
        if let Some(rule) = &self.rule {
            write!(f, ", rule = {rule}")?;
        }
        Ok(())
    }
}

/// A decoded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPattern {
    /// The header line.
    pub header: RleHeader,
    /// Live cells, relative to the rectangle's top-left corner.
    pub grid: SparseGrid,
}

/// Encode the cells of `grid` inside `rect`.
///
/// # Errors
///
/// Returns [`RleError::StateOutOfAlphabet`] if a cell in the rectangle has
/// a state above [`MAX_STATE`].
pub fn encode(grid: &SparseGrid, rect: &Rect, rule_name: &str) -> Result<String, RleError> {
    let header = RleHeader {
        width: rect.width(),
        height: rect.height(),
        rule: Some(rule_name.to_owned()),
    };
    let mut runs = RunWriter::default();
    for row in rect.top()..rect.bottom() {
        for col in rect.left()..rect.right() {
            runs.push(symbol_for(grid.get(Coord::new(row, col)))?);
        }
        runs.push(ROW_END);
    }
    Ok(format!("{header}\n{}{TERMINATOR}", runs.finish()))
}

/// Encode a selection, failing when nothing is selected.
///
/// # Errors
///
/// Returns [`RleError::Selection`] wrapping [`SelectionError::NoSelection`]
/// when `selection` is `None`, or the errors of [`encode`].
pub fn export_selection(
    grid: &SparseGrid,
    selection: Option<&Rect>,
    rule_name: &str,
) -> Result<String, RleError> {
    let rect = selection.ok_or(SelectionError::NoSelection)?;
    encode(grid, rect, rule_name)
}

/// Encode a whole grid, cropped to its tight bounds.
///
/// An empty grid encodes as a 0x0 document with an empty body.
///
/// # Errors
///
/// Returns the errors of [`encode`].
pub fn export_pattern(grid: &SparseGrid, rule_name: &str) -> Result<String, RleError> {
    match grid.tight_bounds().and_then(|bounds| bounds.to_rect()) {
        Some(rect) => encode(grid, &rect, rule_name),
        None => {
            let header = RleHeader {
                width: 0,
                height: 0,
                rule: Some(rule_name.to_owned()),
            };
            Ok(format!("{header}\n{TERMINATOR}"))
        }
    }
}

/// Parse an `x = W, y = H[, rule = R]` header line.
///
/// Keys may appear in any order and unknown keys are ignored. `rule`
/// extends to the end of the line.
///
/// # Errors
///
/// Returns [`RleError::InvalidHeader`] if `x` or `y` is missing or not a
/// number.
pub fn parse_header(line: &str) -> Result<RleHeader, RleError> {
    let invalid = || RleError::InvalidHeader {
        line: line.to_owned(),
    };
    let mut width = None;
    let mut height = None;
    let mut rule = None;
    let mut rest = line;
    while !rest.trim().is_empty() {
        let (key, after) = rest.split_once('=').ok_or_else(invalid)?;
        let key = key.trim();
        // Rule names may contain commas, so `rule` takes the rest of the line.
        if key == "rule" {
            rule = Some(after.trim().to_owned());
            break;
        }
        let (value, tail) = after.split_once(',').unwrap_or((after, ""));
        let value = value.trim();
        match key {
            "x" => width = Some(value.parse::<u64>().ok().ok_or_else(invalid)?),
            "y" => height = Some(value.parse::<u64>().ok().ok_or_else(invalid)?),
            _ => {}
        }
        rest = tail;
    }
    Ok(RleHeader {
        width: width.ok_or_else(invalid)?,
        height: height.ok_or_else(invalid)?,
        rule,
    })
}

/// Decode a document.
///
/// Leading blank lines and `#` comment lines are skipped; the first other
/// line is the header. Line breaks and whitespace inside the body are
/// ignored.
///
/// # Errors
///
/// Returns an [`RleError`] describing the first problem found.
pub fn decode(text: &str) -> Result<DecodedPattern, RleError> {
    let mut lines = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .skip_while(|line| line.trim().is_empty() || line.starts_with('#'));
    let header_line = lines.next().ok_or(RleError::MissingHeader)?;
    let header = parse_header(header_line)?;
    let body: String = lines
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();
    let grid = decode_body(&body, header.width, header.height)?;
    Ok(DecodedPattern { header, grid })
}

/// Replay the runs of a body into a grid bounded by `width` x `height`.
fn decode_body(body: &str, width: u64, height: u64) -> Result<SparseGrid, RleError> {
    let max_col = i64::try_from(width).unwrap_or(i64::MAX);
    let max_row = i64::try_from(height).unwrap_or(i64::MAX);
    let mut grid = SparseGrid::new();
    let mut row: i64 = 0;
    let mut col: i64 = 0;
    let mut count: Option<(u64, usize)> = None;

    for (position, symbol) in body.chars().enumerate() {
        if let Some(digit) = symbol.to_digit(10) {
            let (so_far, start) = count.unwrap_or((0, position));
            let next = so_far
                .checked_mul(10)
                .and_then(|n| n.checked_add(u64::from(digit)))
                .ok_or(RleError::RunOverflow { position })?;
            count = Some((next, start));
            continue;
        }

        let run = match count.take() {
            Some((_, start)) if symbol == TERMINATOR => {
                return Err(RleError::DanglingCount { position: start });
            }
            Some((0, start)) => return Err(RleError::ZeroRunLength { position: start }),
            Some((n, _)) => n,
            None => 1,
        };
        let run_i64 = i64::try_from(run)
            .ok()
            .ok_or(RleError::RunOverflow { position })?;
        let overflow = || RleError::RunOverflow { position };
        let outside = || RleError::RunExceedsHeader {
            position,
            width,
            height,
        };

        match symbol {
            TERMINATOR => return Ok(grid),
            DEAD_SYMBOL => {
                col = col.checked_add(run_i64).ok_or_else(overflow)?;
                if col > max_col {
                    return Err(outside());
                }
            }
            ROW_END => {
                row = row.checked_add(run_i64).ok_or_else(overflow)?;
                if row > max_row {
                    return Err(outside());
                }
                col = 0;
            }
            _ => {
                let state = state_for(symbol).ok_or(RleError::UnknownSymbol { symbol, position })?;
                let end = col.checked_add(run_i64).ok_or_else(overflow)?;
                if row >= max_row || end > max_col {
                    return Err(outside());
                }
                for c in col..end {
                    grid.set(Coord::new(row, c), state);
                }
                col = end;
            }
        }
    }

    match count {
        Some((_, start)) => Err(RleError::DanglingCount { position: start }),
        None => Err(RleError::MissingTerminator),
    }
}

fn symbol_for(state: State) -> Result<char, RleError> {
    if state == 0 {
        return Ok(DEAD_SYMBOL);
    }
    if state > MAX_STATE {
        return Err(RleError::StateOutOfAlphabet { state });
    }
    SYMBOL_BASE
        .checked_add(u32::from(state))
        .and_then(char::from_u32)
        .ok_or(RleError::StateOutOfAlphabet { state })
}

fn state_for(symbol: char) -> Option<State> {
    let state = u32::from(symbol).checked_sub(SYMBOL_BASE)?;
    State::try_from(state)
        .ok()
        .filter(|s| (1..=MAX_STATE).contains(s))
}

/// Accumulates symbols and emits `<k><symbol>` runs.
#[derive(Debug, Default)]
struct RunWriter {
    out: String,
    current: Option<(char, u64)>,
}

impl RunWriter {
    fn push(&mut self, symbol: char) {
        match &mut self.current {
            Some((held, run)) if *held == symbol => *run = run.saturating_add(1),
            _ => {
                self.flush();
                self.current = Some((symbol, 1));
            }
        }
    }

    fn flush(&mut self) {
        if let Some((symbol, run)) = self.current.take() {
            if run > 1 {
                self.out.push_str(&run.to_string());
            }
            self.out.push(symbol);
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        self.out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cells(list: &[(i64, i64, State)]) -> SparseGrid {
        list.iter()
            .map(|&(row, col, state)| (Coord::new(row, col), state))
            .collect()
    }

    #[test]
    fn encodes_reference_document() {
        let grid = cells(&[(0, 0, 1), (1, 1, 2)]);
        let rect = Rect::new(0, 0, 2, 2).unwrap();
        let text = encode(&grid, &rect, "Test").unwrap();
        assert_eq!(text, "x = 2, y = 2, rule = Test\nA.$.B$!");
    }

    #[test]
    fn round_trip_relative_to_rect() {
        let grid = cells(&[(5, 5, 1), (5, 6, 1), (5, 7, 1), (8, 9, 3)]);
        let rect = Rect::new(5, 5, 9, 10).unwrap();
        let text = encode(&grid, &rect, "R").unwrap();
        let decoded = decode(&text).unwrap();
        assert_eq!(decoded.header.width, 5);
        assert_eq!(decoded.header.height, 4);
        assert_eq!(decoded.header.rule.as_deref(), Some("R"));
        assert_eq!(decoded.grid.translate(rect.origin()).unwrap(), grid);
    }

    #[test]
    fn compresses_runs() {
        let grid = cells(&[(0, 0, 1), (0, 1, 1), (0, 2, 1)]);
        let rect = Rect::new(0, 0, 3, 4).unwrap();
        let text = encode(&grid, &rect, "R").unwrap();
        assert_eq!(text, "x = 4, y = 3, rule = R\n3A.$4.$4.$!");
    }

    #[test]
    fn cells_outside_rect_are_ignored() {
        let grid = cells(&[(0, 0, 1), (10, 10, 1)]);
        let rect = Rect::new(0, 0, 1, 1).unwrap();
        assert_eq!(encode(&grid, &rect, "R").unwrap(), "x = 1, y = 1, rule = R\nA$!");
    }

    #[test]
    fn high_states_use_extended_symbols() {
        let grid = cells(&[(0, 0, 62), (0, 1, 26), (0, 2, 27)]);
        let rect = Rect::new(0, 0, 1, 3).unwrap();
        let text = encode(&grid, &rect, "R").unwrap();
        assert!(text.ends_with("~Z[$!"));
        assert_eq!(decode(&text).unwrap().grid, grid);

        let too_high = cells(&[(0, 0, 63)]);
        assert_eq!(
            encode(&too_high, &rect, "R"),
            Err(RleError::StateOutOfAlphabet { state: 63 })
        );
    }

    #[test]
    fn export_selection_requires_rect() {
        let grid = cells(&[(0, 0, 1)]);
        assert_eq!(
            export_selection(&grid, None, "R"),
            Err(RleError::Selection(SelectionError::NoSelection))
        );
    }

    #[test]
    fn export_pattern_crops_to_live_cells() {
        let grid = cells(&[(3, 4, 1), (4, 5, 1)]);
        assert_eq!(
            export_pattern(&grid, "R").unwrap(),
            "x = 2, y = 2, rule = R\nA.$.A$!"
        );
        let empty = export_pattern(&SparseGrid::new(), "R").unwrap();
        assert_eq!(empty, "x = 0, y = 0, rule = R\n!");
        assert!(decode(&empty).unwrap().grid.is_empty());
    }

    #[test]
    fn decode_tolerates_line_breaks_and_comments() {
        let text = "#N blinker\r\nx = 3, y = 1, rule = B3/S23\r\n3\r\nA$\n!";
        let decoded = decode(text).unwrap();
        assert_eq!(decoded.grid, cells(&[(0, 0, 1), (0, 1, 1), (0, 2, 1)]));
        assert_eq!(decoded.header.rule.as_deref(), Some("B3/S23"));
    }

    #[test]
    fn rule_names_may_contain_commas() {
        let header = parse_header("x = 4, y = 2, rule = -1/5,6/1-14").unwrap();
        assert_eq!(header.rule.as_deref(), Some("-1/5,6/1-14"));
        assert_eq!(header.to_string(), "x = 4, y = 2, rule = -1/5,6/1-14");
    }

    #[test]
    fn multi_row_skips() {
        let decoded = decode("x = 1, y = 4\nA3$A!").unwrap();
        assert_eq!(decoded.grid, cells(&[(0, 0, 1), (3, 0, 1)]));
        assert_eq!(decoded.header.rule, None);
    }

    #[test]
    fn parse_errors_carry_positions() {
        assert_eq!(
            decode("x = 1, y = 1\nA*$!"),
            Err(RleError::UnknownSymbol {
                symbol: '*',
                position: 1
            })
        );
        assert_eq!(
            decode("x = 1, y = 1\nA0.$!"),
            Err(RleError::ZeroRunLength { position: 1 })
        );
        assert_eq!(
            decode("x = 1, y = 1\nA$12"),
            Err(RleError::DanglingCount { position: 2 })
        );
        assert_eq!(decode("x = 1, y = 1\nA$"), Err(RleError::MissingTerminator));
        assert!(matches!(
            decode("x = 1, y = 1\n99999999999999999999999A!"),
            Err(RleError::RunOverflow { .. })
        ));
        assert_eq!(decode("\n\n"), Err(RleError::MissingHeader));
        assert!(matches!(
            decode("y = 1\nA!"),
            Err(RleError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn runs_past_the_header_width_are_rejected() {
        assert_eq!(
            decode("x = 1, y = 1, rule = R\n3A2$5B!"),
            Err(RleError::RunExceedsHeader {
                position: 1,
                width: 1,
                height: 1
            })
        );
        assert_eq!(
            decode("x = 1, y = 1\n5000000A!"),
            Err(RleError::RunExceedsHeader {
                position: 7,
                width: 1,
                height: 1
            })
        );
        assert!(matches!(
            decode("x = 2, y = 1\nA2.$!"),
            Err(RleError::RunExceedsHeader { position: 2, .. })
        ));
        assert!(decode("x = 3, y = 1\n3A$!").is_ok());
    }

    #[test]
    fn rows_past_the_header_height_are_rejected() {
        assert!(matches!(
            decode("x = 1, y = 2\nA$A$A$!"),
            Err(RleError::RunExceedsHeader { position: 4, .. })
        ));
        assert!(matches!(
            decode("x = 1, y = 1\nA3$!"),
            Err(RleError::RunExceedsHeader { position: 2, .. })
        ));
        assert_eq!(decode("x = 1, y = 2\nA$A$!").unwrap().grid.population(), 2);
    }

    #[test]
    fn empty_rectangle_accepts_only_an_empty_body() {
        assert!(decode("x = 0, y = 0, rule = R\n!").unwrap().grid.is_empty());
        assert!(matches!(
            decode("x = 0, y = 0\nA!"),
            Err(RleError::RunExceedsHeader { position: 0, .. })
        ));
    }

    #[test]
    fn header_after_comments_bounds_the_body() {
        assert!(matches!(
            decode("#C wide\nx = 2, y = 1\n3A$!"),
            Err(RleError::RunExceedsHeader { position: 1, .. })
        ));
    }
}
