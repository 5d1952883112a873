//! Coordinates, bounding boxes, and selection rectangles.
//!
//! The plane is unbounded in both directions, so coordinates are signed
//! 64-bit pairs. All coordinate arithmetic is checked: an offset that would
//! leave the `i64` range yields `None` instead of wrapping.
//!
//! Two rectangle flavours exist:
//!
//! - [`Bounds`] is *inclusive* and describes where live cells are.
//! - [`Rect`] is *half-open* (`[top, bottom) x [left, right)`) and describes
//!   a user selection for export, soup generation, or clearing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Errors raised by operations that need a selection rectangle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The operation requires a rectangle but none is selected.
    #[error("no area has been selected")]
    NoSelection,

    /// The rectangle spans zero rows or zero columns.
    #[error("selection [{top}, {bottom}) x [{left}, {right}) is empty")]
    EmptyRect {
        /// First row.
        top: i64,
        /// First column.
        left: i64,
        /// One past the last row.
        bottom: i64,
        /// One past the last column.
        right: i64,
    },
}

/// A cell position (or offset) on the unbounded plane.
///
/// Ordering is row-major, so sorting a list of coordinates yields the
/// top-to-bottom, left-to-right scan order used by the RLE format.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct Coord {
    /// Row index (grows downwards, the `y` axis).
    pub row: i64,
    /// Column index (grows rightwards, the `x` axis).
    pub col: i64,
}

impl Coord {
    /// The origin `(0, 0)`; also the zero offset.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Create a coordinate from a row and a column.
    pub const fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Add an offset, returning `None` on `i64` overflow.
    pub const fn checked_add(self, offset: Self) -> Option<Self> {
        match (self.row.checked_add(offset.row), self.col.checked_add(offset.col)) {
            (Some(row), Some(col)) => Some(Self::new(row, col)),
            _ => None,
        }
    }

    /// Subtract another coordinate, returning `None` on `i64` overflow.
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match (self.row.checked_sub(other.row), self.col.checked_sub(other.col)) {
            (Some(row), Some(col)) => Some(Self::new(row, col)),
            _ => None,
        }
    }
}

impl core::fmt::Display for Coord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

impl From<(i64, i64)> for Coord {
    fn from((row, col): (i64, i64)) -> Self {
        Self::new(row, col)
    }
}

/// Inclusive bounding box enclosing every live cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bounds {
    /// Smallest row containing a live cell.
    pub min_row: i64,
    /// Largest row containing a live cell.
    pub max_row: i64,
    /// Smallest column containing a live cell.
    pub min_col: i64,
    /// Largest column containing a live cell.
    pub max_col: i64,
}

impl Bounds {
    /// A box enclosing exactly one coordinate.
    pub const fn point(coord: Coord) -> Self {
        Self {
            min_row: coord.row,
            max_row: coord.row,
            min_col: coord.col,
            max_col: coord.col,
        }
    }

    /// Grow the box so that it also encloses `coord`.
    pub fn include(&mut self, coord: Coord) {
        self.min_row = self.min_row.min(coord.row);
        self.max_row = self.max_row.max(coord.row);
        self.min_col = self.min_col.min(coord.col);
        self.max_col = self.max_col.max(coord.col);
    }

    /// Return a box extended to enclose `coord`, starting from `None`.
    pub fn extend(bounds: Option<Self>, coord: Coord) -> Self {
        match bounds {
            Some(mut existing) => {
                existing.include(coord);
                existing
            }
            None => Self::point(coord),
        }
    }

    /// Whether `coord` lies inside the box.
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.row >= self.min_row
            && coord.row <= self.max_row
            && coord.col >= self.min_col
            && coord.col <= self.max_col
    }

    /// The top-left corner of the box.
    pub const fn min_corner(&self) -> Coord {
        Coord::new(self.min_row, self.min_col)
    }

    /// Number of columns spanned (at least 1).
    pub const fn width(&self) -> u64 {
        self.max_col.abs_diff(self.min_col).saturating_add(1)
    }

    /// Number of rows spanned (at least 1).
    pub const fn height(&self) -> u64 {
        self.max_row.abs_diff(self.min_row).saturating_add(1)
    }

    /// The half-open rectangle covering exactly this box.
    ///
    /// Returns `None` if the box touches `i64::MAX`, where the exclusive
    /// upper edge is not representable.
    pub const fn to_rect(&self) -> Option<Rect> {
        match (self.max_row.checked_add(1), self.max_col.checked_add(1)) {
            (Some(bottom), Some(right)) => Some(Rect {
                top: self.min_row,
                left: self.min_col,
                bottom,
                right,
            }),
            _ => None,
        }
    }
}

/// A half-open selection rectangle `[top, bottom) x [left, right)`.
///
/// In soup terminology the column span is `[lower_x, upper_x)` and the row
/// span is `[lower_y, upper_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Rect {
    top: i64,
    left: i64,
    bottom: i64,
    right: i64,
}

impl Rect {
    /// Create a rectangle from its edges.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyRect`] if the rectangle spans no rows
    /// or no columns.
    pub const fn new(top: i64, left: i64, bottom: i64, right: i64) -> Result<Self, SelectionError> {
        if top >= bottom || left >= right {
            return Err(SelectionError::EmptyRect {
                top,
                left,
                bottom,
                right,
            });
        }
        Ok(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Create a rectangle of the given size whose top-left corner is `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::EmptyRect`] if either dimension is zero or
    /// the far edge overflows.
    pub fn with_size(origin: Coord, height: i64, width: i64) -> Result<Self, SelectionError> {
        let bottom = origin.row.checked_add(height).unwrap_or(origin.row);
        let right = origin.col.checked_add(width).unwrap_or(origin.col);
        Self::new(origin.row, origin.col, bottom, right)
    }

    /// First row (inclusive).
    pub const fn top(&self) -> i64 {
        self.top
    }

    /// First column (inclusive).
    pub const fn left(&self) -> i64 {
        self.left
    }

    /// One past the last row.
    pub const fn bottom(&self) -> i64 {
        self.bottom
    }

    /// One past the last column.
    pub const fn right(&self) -> i64 {
        self.right
    }

    /// The top-left corner.
    pub const fn origin(&self) -> Coord {
        Coord::new(self.top, self.left)
    }

    /// Number of columns (`upper_x - lower_x`).
    pub const fn width(&self) -> u64 {
        self.right.abs_diff(self.left)
    }

    /// Number of rows (`upper_y - lower_y`).
    pub const fn height(&self) -> u64 {
        self.bottom.abs_diff(self.top)
    }

    /// Whether `coord` lies inside the rectangle.
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.row >= self.top
            && coord.row < self.bottom
            && coord.col >= self.left
            && coord.col < self.right
    }

    /// Every coordinate in the rectangle, row by row.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (self.top..self.bottom)
            .flat_map(move |row| (self.left..self.right).map(move |col| Coord::new(row, col)))
    }
}

impl core::fmt::Display for Rect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.top, self.bottom, self.left, self.right
        )
    }
}
