//! Common neighbourhood shapes.

use tessera_types::Coord;

/// The eight Moore neighbours, row by row from the top-left.
pub const MOORE: [Coord; 8] = [
    Coord::new(-1, -1),
    Coord::new(-1, 0),
    Coord::new(-1, 1),
    Coord::new(0, -1),
    Coord::new(0, 1),
    Coord::new(1, -1),
    Coord::new(1, 0),
    Coord::new(1, 1),
];

/// Every offset of a `(2r+1) x (2r+1)` square, centre included.
///
/// Rows run from `+r` down to `-r` and columns from `-r` to `+r`, which is
/// the order the weighted 5x5 rules list their weights in.
pub fn square(radius: i64) -> Vec<Coord> {
    let radius = radius.abs();
    (-radius..=radius)
        .rev()
        .flat_map(|row| (-radius..=radius).map(move |col| Coord::new(row, col)))
        .collect()
}
