//! Core battleship protocol logic (no_std compatible)
//!
//! Board geometry, the replicated transcript and turn derivation. Everything
//! here is pure: no I/O, no clocks, no proving. It depends only on
//! `num-traits`, `serde` and `alloc`.

pub mod board;
pub mod common;
pub mod config;
pub mod grid;
pub mod ship;
pub mod transcript;
pub mod turn;

pub use board::{is_layout_valid, random_layout, ship_at, shot_is_on_board, validate_layout, BoardView};
pub use common::{AgentKey, BoardError, GameInvite, RecordId, Side, ViewerRole};
pub use config::*;
pub use grid::{Grid, GridError};
pub use ship::{occupied_cells, Occupancy, Ship, ShipDef};
pub use transcript::{GameTranscript, Shot, ShotOutcome, TranscriptLengths};
pub use turn::{derive_state, turn_from_lengths, winner, GameState, GameTurn};
