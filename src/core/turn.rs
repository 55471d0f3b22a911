//! Turn derivation: a pure function from the replicated facts to the phase
//! of the game. Both peers run it on whatever they can currently see, so it
//! must never depend on anything but its arguments.

use core::cmp::min;
use serde::{Deserialize, Serialize};

use super::common::{RecordId, Side};
use super::config::TOTAL_SHIP_CELLS;
use super::transcript::{GameTranscript, TranscriptLengths};

/// Phase of a started game. The cycle is
/// `AwayShot -> HomeProof -> HomeShot -> AwayProof -> AwayShot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameTurn {
    AwayShot,
    HomeProof,
    HomeShot,
    AwayProof,
}

impl GameTurn {
    /// The side expected to append the next fact.
    pub fn actor(self) -> Side {
        match self {
            GameTurn::AwayShot | GameTurn::AwayProof => Side::Away,
            GameTurn::HomeShot | GameTurn::HomeProof => Side::Home,
        }
    }

    pub fn is_shot(self) -> bool {
        matches!(self, GameTurn::AwayShot | GameTurn::HomeShot)
    }

    pub fn is_proof(self) -> bool {
        !self.is_shot()
    }

    pub fn shot_for(side: Side) -> GameTurn {
        match side {
            Side::Home => GameTurn::HomeShot,
            Side::Away => GameTurn::AwayShot,
        }
    }

    pub fn proof_for(side: Side) -> GameTurn {
        match side {
            Side::Home => GameTurn::HomeProof,
            Side::Away => GameTurn::AwayProof,
        }
    }

    /// The phase that follows this one.
    pub fn next(self) -> GameTurn {
        match self {
            GameTurn::AwayShot => GameTurn::HomeProof,
            GameTurn::HomeProof => GameTurn::HomeShot,
            GameTurn::HomeShot => GameTurn::AwayProof,
            GameTurn::AwayProof => GameTurn::AwayShot,
        }
    }
}

/// Derived state of a game. Never stored, recomputed on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameState {
    AwaitingBothDeployments,
    AwaitingHomeDeployment,
    AwaitingAwayDeployment,
    GameStarted { turn: GameTurn },
    GameOver { winner: Side },
    /// The visible facts cannot be produced by any legal sequence of moves.
    Corrupt,
}

impl GameState {
    pub fn turn(&self) -> Option<GameTurn> {
        match self {
            GameState::GameStarted { turn } => Some(*turn),
            _ => None,
        }
    }

    /// Whether `side` may fire right now.
    pub fn can_fire(&self, side: Side) -> bool {
        self.turn() == Some(GameTurn::shot_for(side))
    }

    /// Whether `side` owes a hit/miss proof right now.
    pub fn owes_proof(&self, side: Side) -> bool {
        self.turn() == Some(GameTurn::proof_for(side))
    }
}

/// Phase implied by the sequence lengths, or `None` if they are inconsistent.
///
/// Each full cycle appends exactly one fact to each of the four sequences, so
/// after subtracting the common baseline the excess tells how far into the
/// current cycle the game is.
pub fn turn_from_lengths(lengths: &TranscriptLengths) -> Option<GameTurn> {
    let baseline = min(
        min(lengths.home_shots, lengths.away_shots),
        min(lengths.home_outcomes, lengths.away_outcomes),
    );
    match (
        lengths.away_shots - baseline,
        lengths.home_outcomes - baseline,
        lengths.home_shots - baseline,
        lengths.away_outcomes - baseline,
    ) {
        (0, 0, 0, 0) => Some(GameTurn::AwayShot),
        (1, 0, 0, 0) => Some(GameTurn::HomeProof),
        (1, 1, 0, 0) => Some(GameTurn::HomeShot),
        (1, 1, 1, 0) => Some(GameTurn::AwayProof),
        _ => None,
    }
}

/// The side that has landed hits on every opponent ship cell, if any.
pub fn winner(transcript: &GameTranscript) -> Option<Side> {
    [Side::Away, Side::Home]
        .into_iter()
        .find(|&side| transcript.hits_landed(side) >= TOTAL_SHIP_CELLS)
}

/// Derive the game state from commitment presence and the latest visible
/// transcript. A missing transcript is treated as an empty one.
pub fn derive_state(
    invite: &RecordId,
    home_committed: bool,
    away_committed: bool,
    transcript: Option<&GameTranscript>,
) -> GameState {
    match (home_committed, away_committed) {
        (false, false) => return GameState::AwaitingBothDeployments,
        (true, false) => return GameState::AwaitingAwayDeployment,
        (false, true) => return GameState::AwaitingHomeDeployment,
        (true, true) => {}
    }
    let transcript = match transcript {
        Some(t) => t,
        None => return GameState::GameStarted { turn: GameTurn::AwayShot },
    };
    if transcript.invite != *invite || !transcript.outcome_lag_holds() {
        return GameState::Corrupt;
    }
    if let Some(side) = winner(transcript) {
        return GameState::GameOver { winner: side };
    }
    match turn_from_lengths(&transcript.lengths()) {
        Some(turn) => GameState::GameStarted { turn },
        None => GameState::Corrupt,
    }
}
