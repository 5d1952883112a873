//! The sparse grid and immutable pattern snapshots.
//!
//! A [`SparseGrid`] stores only live cells. State `0` is the background and
//! is never stored: writing `0` removes the entry. Every public mutator
//! preserves that invariant, so `population()` is always the number of live
//! cells and iteration never yields a dead cell.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geometry::{Bounds, Coord, Rect};

/// An automaton state in `[0, n_states)`.
pub type State = u16;

/// The background state. Never stored in a [`SparseGrid`].
pub const DEAD: State = 0;

/// A coordinate paired with a state.
///
/// Inside a grid the state is always non-zero. In a generation delta a
/// state of [`DEAD`] means the cell was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cell {
    /// Where the cell is.
    pub coord: Coord,
    /// The cell's state.
    pub state: State,
}

impl Cell {
    /// Create a cell.
    pub const fn new(coord: Coord, state: State) -> Self {
        Self { coord, state }
    }
}

/// One changed cell after a step. A state of [`DEAD`] means removal.
pub type CellDelta = Cell;

/// Mapping from coordinate to non-zero state.
///
/// Serializes as a row-major sorted list of [`Cell`]s so that the JSON form
/// is deterministic and does not need struct map keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Cell>", from = "Vec<Cell>")]
pub struct SparseGrid {
    cells: HashMap<Coord, State>,
}

/// A translation-normalized view of a grid.
///
/// `cells` holds every live cell shifted so that the tight bounding box's
/// minimum corner sits at the origin, sorted row-major. Two grids have equal
/// layouts exactly when one is a translation of the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedLayout {
    /// The tight bounding box's minimum corner before normalization.
    pub min_corner: Coord,
    /// Shifted, sorted cells.
    pub cells: Vec<Cell>,
}

impl SparseGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Build a grid from `(coordinate, state)` pairs. Later pairs win;
    /// zero states clear earlier writes.
    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        let mut grid = Self::new();
        for cell in cells {
            grid.set(cell.coord, cell.state);
        }
        grid
    }

    /// State at `coord` (`0` if absent).
    pub fn get(&self, coord: Coord) -> State {
        self.cells.get(&coord).copied().unwrap_or(DEAD)
    }

    /// Write a state, removing the entry when `state` is `0`.
    ///
    /// Returns the previous state.
    pub fn set(&mut self, coord: Coord, state: State) -> State {
        if state == DEAD {
            self.cells.remove(&coord).unwrap_or(DEAD)
        } else {
            self.cells.insert(coord, state).unwrap_or(DEAD)
        }
    }

    /// Whether `coord` holds a live cell.
    pub fn is_live(&self, coord: Coord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Number of live cells.
    pub fn population(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no live cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over live cells in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells
            .iter()
            .map(|(&coord, &state)| Cell::new(coord, state))
    }

    /// Iterate over live coordinates in arbitrary order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells.keys().copied()
    }

    /// Live cells sorted row-major.
    pub fn sorted_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.iter().collect();
        cells.sort_unstable();
        cells
    }

    /// Recompute the exact bounding box of the live cells.
    pub fn tight_bounds(&self) -> Option<Bounds> {
        self.coords()
            .fold(None, |bounds, coord| Some(Bounds::extend(bounds, coord)))
    }

    /// The live cells that fall inside `rect`, at their original positions.
    pub fn restrict(&self, rect: &Rect) -> Self {
        Self {
            cells: self
                .cells
                .iter()
                .filter(|&(&coord, _)| rect.contains(coord))
                .map(|(&coord, &state)| (coord, state))
                .collect(),
        }
    }

    /// A copy of the grid moved by `offset`.
    ///
    /// Returns `None` if any cell would leave the `i64` plane.
    pub fn translate(&self, offset: Coord) -> Option<Self> {
        let mut cells = HashMap::with_capacity(self.cells.len());
        for (&coord, &state) in &self.cells {
            cells.insert(coord.checked_add(offset)?, state);
        }
        Some(Self { cells })
    }

    /// Translation-normalized layout, or `None` for an empty grid.
    pub fn normalized(&self) -> Option<NormalizedLayout> {
        let min_corner = self.tight_bounds()?.min_corner();
        let mut cells = Vec::with_capacity(self.cells.len());
        for (&coord, &state) in &self.cells {
            // Every live coordinate is >= the min corner, so this cannot overflow.
            let shifted = coord.checked_sub(min_corner)?;
            cells.push(Cell::new(shifted, state));
        }
        cells.sort_unstable();
        Some(NormalizedLayout { min_corner, cells })
    }
}

impl From<Vec<Cell>> for SparseGrid {
    fn from(cells: Vec<Cell>) -> Self {
        Self::from_cells(cells)
    }
}

impl From<SparseGrid> for Vec<Cell> {
    fn from(grid: SparseGrid) -> Self {
        grid.sorted_cells()
    }
}

impl FromIterator<Cell> for SparseGrid {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self::from_cells(iter)
    }
}

impl FromIterator<(Coord, State)> for SparseGrid {
    fn from_iter<I: IntoIterator<Item = (Coord, State)>>(iter: I) -> Self {
        Self::from_cells(
            iter.into_iter()
                .map(|(coord, state)| Cell::new(coord, state)),
        )
    }
}

/// An immutable pattern snapshot: a grid plus its tight bounds.
///
/// This is the unit of exchange for serialization, soup generation, and
/// identification. `bounds` is `None` exactly when the grid is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SparseGrid", from = "SparseGrid")]
pub struct Pattern {
    grid: SparseGrid,
    bounds: Option<Bounds>,
}

impl Pattern {
    /// Snapshot a grid, computing its tight bounds.
    pub fn new(grid: SparseGrid) -> Self {
        let bounds = grid.tight_bounds();
        Self { grid, bounds }
    }

    /// The snapshot's cells.
    pub const fn grid(&self) -> &SparseGrid {
        &self.grid
    }

    /// The tight bounds (`None` if empty).
    pub const fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Number of live cells.
    pub fn population(&self) -> usize {
        self.grid.population()
    }

    /// Whether the snapshot has no live cells.
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Consume the snapshot, returning its grid.
    pub fn into_grid(self) -> SparseGrid {
        self.grid
    }
}

impl From<SparseGrid> for Pattern {
    fn from(grid: SparseGrid) -> Self {
        Self::new(grid)
    }
}

impl From<Pattern> for SparseGrid {
    fn from(pattern: Pattern) -> Self {
        pattern.grid
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cell(row: i64, col: i64, state: State) -> Cell {
        Cell::new(Coord::new(row, col), state)
    }

    #[test]
    fn zero_state_is_never_stored() {
        let mut grid = SparseGrid::new();
        assert_eq!(grid.set(Coord::new(0, 0), 2), DEAD);
        assert_eq!(grid.population(), 1);
        assert_eq!(grid.set(Coord::new(0, 0), DEAD), 2);
        assert!(grid.is_empty());
        assert_eq!(grid.set(Coord::new(5, 5), DEAD), DEAD);
        assert!(grid.is_empty());
    }

    #[test]
    fn from_cells_drops_zeros() {
        let grid = SparseGrid::from_cells([cell(0, 0, 1), cell(0, 1, 0), cell(0, 0, 0)]);
        assert!(grid.is_empty());
    }

    #[test]
    fn tight_bounds_cover_every_cell() {
        let grid = SparseGrid::from_cells([cell(-3, 4, 1), cell(2, -1, 3)]);
        let bounds = grid.tight_bounds().unwrap();
        assert_eq!(bounds.min_corner(), Coord::new(-3, -1));
        assert_eq!(bounds.max_row, 2);
        assert_eq!(bounds.max_col, 4);
        assert!(SparseGrid::new().tight_bounds().is_none());
    }

    #[test]
    fn normalized_layout_ignores_translation() {
        let grid = SparseGrid::from_cells([cell(0, 0, 1), cell(1, 2, 2)]);
        let moved = grid.translate(Coord::new(10, -7)).unwrap();
        let a = grid.normalized().unwrap();
        let b = moved.normalized().unwrap();
        assert_eq!(a.cells, b.cells);
        assert_eq!(b.min_corner, Coord::new(10, -7));
    }

    #[test]
    fn restrict_keeps_only_cells_in_rect() {
        let grid = SparseGrid::from_cells([cell(0, 0, 1), cell(3, 3, 1)]);
        let rect = Rect::new(0, 0, 2, 2).unwrap();
        let restricted = grid.restrict(&rect);
        assert_eq!(restricted.population(), 1);
        assert_eq!(restricted.get(Coord::new(0, 0)), 1);
    }

    #[test]
    fn serializes_as_sorted_cell_list() {
        let grid = SparseGrid::from_cells([cell(1, 0, 2), cell(0, 1, 1)]);
        let json = serde_json::to_string(&grid).unwrap();
        let back: SparseGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
        assert!(json.starts_with(r#"[{"coord":{"row":0,"col":1},"state":1}"#));
    }

    #[test]
    fn pattern_tracks_bounds() {
        let pattern = Pattern::new(SparseGrid::from_cells([cell(2, 2, 1)]));
        assert_eq!(pattern.population(), 1);
        assert_eq!(pattern.bounds().unwrap().min_corner(), Coord::new(2, 2));
        assert!(Pattern::default().bounds().is_none());
    }
}
