use crate::core::{BoardError, GameState};
use crate::prover::ProverError;

/// Everything that can go wrong while playing, from local validation to
/// rejection by the replication substrate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("invalid layout: {0}")]
    InvalidLayout(BoardError),
    #[error("proving failed: {0}")]
    ProvingFailed(String),
    #[error("hit/miss proof failed verification")]
    ProofVerificationFailed,
    #[error("out of turn: game is {state:?}")]
    OutOfTurn { state: GameState },
    #[error("proof is for shot #{submitted}, oldest unanswered is {expected:?}")]
    StaleObligation { expected: Option<usize>, submitted: usize },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("cell ({x}, {y}) was already targeted")]
    DuplicateShot { x: usize, y: usize },
    #[error("shot ({x}, {y}) is off the board")]
    ShotOutOfBounds { x: usize, y: usize },
    #[error("agent is not a player in this game")]
    NotAParticipant,
    #[error("rejected by ledger: {0}")]
    Rejected(String),
    #[error("transcript is corrupt")]
    CorruptTranscript,
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GameError {
    /// Errors that may clear up by refetching and trying again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GameError::ProvingFailed(_)
                | GameError::OutOfTurn { .. }
                | GameError::StaleObligation { .. }
                | GameError::NotFound(_)
        )
    }
}

impl From<BoardError> for GameError {
    fn from(err: BoardError) -> Self {
        GameError::InvalidLayout(err)
    }
}

impl From<ProverError> for GameError {
    fn from(err: ProverError) -> Self {
        GameError::ProvingFailed(err.to_string())
    }
}

impl From<bincode::Error> for GameError {
    fn from(err: bincode::Error) -> Self {
        GameError::Serialization(err.to_string())
    }
}
