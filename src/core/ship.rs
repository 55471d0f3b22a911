//! Ship definitions and the cells a placed ship covers.

use serde::{Deserialize, Serialize};

use super::common::BoardError;
use super::config::BOARD_SIZE;
use super::grid::Grid;

/// Occupancy grid sized for the standard board.
pub type Occupancy = Grid<u128, { BOARD_SIZE as usize }>;

/// Type of ship: label and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipDef {
    label: &'static str,
    length: usize,
}

impl ShipDef {
    pub const fn new(label: &'static str, length: usize) -> Self {
        Self { label, length }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

/// A ship anchored at (`x`, `y`), extending along x when `horizontal`,
/// otherwise along y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ship {
    pub x: usize,
    pub y: usize,
    pub horizontal: bool,
}

impl Ship {
    pub const fn new(x: usize, y: usize, horizontal: bool) -> Self {
        Self { x, y, horizontal }
    }

    /// The `i`-th cell of the ship, with no bounds check.
    pub fn cell(&self, i: usize) -> (usize, usize) {
        if self.horizontal {
            (self.x.saturating_add(i), self.y)
        } else {
            (self.x, self.y.saturating_add(i))
        }
    }

    /// Encoding used for circuit inputs: `[x, y, horizontal]`.
    pub fn as_signal(&self) -> [u64; 3] {
        [self.x as u64, self.y as u64, self.horizontal as u64]
    }
}

/// Cells covered by `ship` when it has the given `length`.
///
/// Fails with `CellOutOfBounds` on the first cell past the edge of the board.
pub fn occupied_cells(ship: &Ship, length: usize) -> Result<Occupancy, BoardError> {
    let mut cells = Occupancy::new();
    for i in 0..length {
        let (x, y) = ship.cell(i);
        cells.insert(x, y)?;
    }
    Ok(cells)
}
