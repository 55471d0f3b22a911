//! Common types for the game core: identifiers, sides and board errors.

use core::fmt;
use serde::{Deserialize, Serialize};

use super::grid::GridError;

/// Errors returned by board geometry checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    /// Underlying grid error (e.g., invalid size).
    Grid(GridError),
    /// A deployment must hold exactly one ship per configured label.
    WrongShipCount { found: usize },
    /// Ship at `ship` (label order) extends past the edge of the board.
    ShipOutOfBounds { ship: usize },
    /// Ship at `ship` (label order) collides with an earlier ship.
    ShipOverlaps { ship: usize },
    /// Cell is not on the board.
    CellOutOfBounds { x: usize, y: usize },
    /// Random placement gave up on ship `ship`.
    UnableToPlaceShip { ship: usize },
}

impl From<GridError> for BoardError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::OutOfBounds { x, y } => BoardError::CellOutOfBounds { x, y },
            other => BoardError::Grid(other),
        }
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::Grid(e) => write!(f, "Grid error: {}", e),
            BoardError::WrongShipCount { found } => {
                write!(f, "Deployment must have 5 ships, found {}", found)
            }
            BoardError::ShipOutOfBounds { ship } => write!(f, "Ship {} is out of bounds", ship),
            BoardError::ShipOverlaps { ship } => {
                write!(f, "Ship {} overlaps with another ship", ship)
            }
            BoardError::CellOutOfBounds { x, y } => write!(f, "Cell ({}, {}) is off the board", x, y),
            BoardError::UnableToPlaceShip { ship } => write!(f, "Unable to place ship {}", ship),
        }
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

/// Public key identifying a peer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentKey(pub [u8; 32]);

impl AgentKey {
    /// Deterministic key for tests and local simulations.
    pub fn from_seed(seed: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x84;
        bytes[31] = seed;
        AgentKey(bytes)
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent:")?;
        write_hex(f, &self.0[..4])
    }
}

impl fmt::Debug for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Content address of a committed record.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub [u8; 32]);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId(")?;
        write_hex(f, &self.0[..6])?;
        write!(f, ")")
    }
}

/// One of the two players of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// How a given agent relates to a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewerRole {
    Home,
    Away,
    Spectator,
}

impl ViewerRole {
    pub fn side(self) -> Option<Side> {
        match self {
            ViewerRole::Home => Some(Side::Home),
            ViewerRole::Away => Some(Side::Away),
            ViewerRole::Spectator => None,
        }
    }
}

/// Invitation from `home_player` to `away_player`. Its content address is
/// the game id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameInvite {
    pub home_player: AgentKey,
    pub away_player: AgentKey,
}

impl GameInvite {
    pub fn role_of(&self, agent: &AgentKey) -> ViewerRole {
        if *agent == self.home_player {
            ViewerRole::Home
        } else if *agent == self.away_player {
            ViewerRole::Away
        } else {
            ViewerRole::Spectator
        }
    }

    pub fn player(&self, side: Side) -> &AgentKey {
        match side {
            Side::Home => &self.home_player,
            Side::Away => &self.away_player,
        }
    }
}
