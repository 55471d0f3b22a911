//! Layout validation and board views built on `Occupancy`.

use core::fmt;

use rand::Rng;

use super::common::BoardError;
use super::config::{BOARD_SIZE, NUM_SHIPS, SHIPS};
use super::ship::{occupied_cells, Occupancy, Ship};
use super::transcript::Shot;

/// Validate a deployment and return the union of its occupied cells.
///
/// Folds over the ships in label order, accumulating occupied cells and
/// rejecting on the first collision. This is the statement the deployment
/// circuit proves, so the order of checks is part of the contract.
pub fn validate_layout(ships: &[Ship]) -> Result<Occupancy, BoardError> {
    if ships.len() != NUM_SHIPS {
        return Err(BoardError::WrongShipCount { found: ships.len() });
    }
    let mut occupied = Occupancy::new();
    for (index, (ship, def)) in ships.iter().zip(SHIPS.iter()).enumerate() {
        for i in 0..def.length() {
            let (x, y) = ship.cell(i);
            match occupied.insert(x, y) {
                Ok(true) => {}
                Ok(false) => return Err(BoardError::ShipOverlaps { ship: index }),
                Err(_) => return Err(BoardError::ShipOutOfBounds { ship: index }),
            }
        }
    }
    Ok(occupied)
}

/// True iff every ship is on the board and no two ships share a cell.
pub fn is_layout_valid(ships: &[Ship]) -> bool {
    validate_layout(ships).is_ok()
}

/// Index (label order) of the ship covering `(x, y)`, if any.
pub fn ship_at(ships: &[Ship], x: usize, y: usize) -> Option<usize> {
    ships
        .iter()
        .zip(SHIPS.iter())
        .position(|(ship, def)| {
            occupied_cells(ship, def.length())
                .map(|cells| cells.contains(x, y))
                .unwrap_or(false)
        })
}

/// A random valid layout, placing ships in label order.
pub fn random_layout<R: Rng>(rng: &mut R) -> Result<[Ship; NUM_SHIPS], BoardError> {
    let n = BOARD_SIZE as usize;
    let mut ships = [Ship::new(0, 0, false); NUM_SHIPS];
    let mut occupied = Occupancy::new();
    for (index, def) in SHIPS.iter().enumerate() {
        let mut placed = false;
        for _ in 0..100 {
            let horizontal: bool = rng.random();
            let (max_x, max_y) = if horizontal {
                (n - def.length(), n - 1)
            } else {
                (n - 1, n - def.length())
            };
            let ship = Ship::new(
                rng.random_range(0..=max_x),
                rng.random_range(0..=max_y),
                horizontal,
            );
            let cells = occupied_cells(&ship, def.length())?;
            if occupied.is_disjoint(&cells) {
                occupied = occupied | cells;
                ships[index] = ship;
                placed = true;
                break;
            }
        }
        if !placed {
            return Err(BoardError::UnableToPlaceShip { ship: index });
        }
    }
    Ok(ships)
}

pub fn shot_is_on_board(shot: &Shot) -> bool {
    shot.x < BOARD_SIZE as usize && shot.y < BOARD_SIZE as usize
}

/// What is known about one player's board: ship cells (only for one's own
/// board), and which shots against it were answered hit or miss.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardView {
    pub ships: Occupancy,
    pub hits: Occupancy,
    pub misses: Occupancy,
    /// Shots fired but not yet answered by a proof.
    pub pending: Occupancy,
}

impl BoardView {
    /// Record a shot against this board. `outcome` is `None` while unanswered.
    pub fn mark(&mut self, shot: &Shot, outcome: Option<bool>) -> Result<(), BoardError> {
        let target = match outcome {
            Some(true) => &mut self.hits,
            Some(false) => &mut self.misses,
            None => &mut self.pending,
        };
        target.insert(shot.x, shot.y)?;
        Ok(())
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = BOARD_SIZE as usize;
        write!(f, "  ")?;
        for x in 0..n {
            write!(f, "{} ", x)?;
        }
        writeln!(f)?;
        for y in 0..n {
            write!(f, "{} ", y)?;
            for x in 0..n {
                let c = if self.hits.contains(x, y) {
                    'X'
                } else if self.misses.contains(x, y) {
                    'o'
                } else if self.pending.contains(x, y) {
                    '?'
                } else if self.ships.contains(x, y) {
                    '■'
                } else {
                    '.'
                };
                write!(f, "{} ", c)?;
            }
            if y + 1 < n {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BoardView {{")?;
        fmt::Display::fmt(self, f)?;
        write!(f, "\n}}")
    }
}
