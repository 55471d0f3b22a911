//! The proving capability, seen as an opaque pair of operations.
//!
//! The protocol never looks inside a proof. It hands a backend the circuit
//! inputs, gets back an opaque serialized proof plus the public signals, and
//! later asks the backend whether a proof verifies for given signals.

pub mod simulated;

pub use simulated::SimulatedProver;

use serde::{Deserialize, Serialize};

use crate::core::{RecordId, Ship, Shot, NUM_SHIPS};
use crate::protocol::SerializedProof;

/// Circuits the protocol proves statements with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Circuit {
    /// "`commitment` hashes a valid five-ship layout with this nonce."
    /// Public signals: `[commitment, invite]`.
    Deployment,
    /// "On the board behind `board_hash`, `guess` is (not) occupied."
    /// Public signals: `[hit, board_hash, x, y]`.
    HitOrMiss,
}

impl Circuit {
    pub fn name(self) -> &'static str {
        match self {
            Circuit::Deployment => "create",
            Circuit::HitOrMiss => "move",
        }
    }

    /// Number of public signals a proof for this circuit carries.
    pub fn public_signal_count(self) -> usize {
        match self {
            Circuit::Deployment => 2,
            Circuit::HitOrMiss => 4,
        }
    }
}

/// Private and public inputs for a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitInputs {
    Deployment {
        nonce: String,
        ships: [[u64; 3]; NUM_SHIPS],
        invite: RecordId,
    },
    HitOrMiss {
        nonce: String,
        ships: [[u64; 3]; NUM_SHIPS],
        invite: RecordId,
        board_hash: String,
        guess: [u64; 2],
    },
}

impl CircuitInputs {
    pub fn deployment(ships: &[Ship; NUM_SHIPS], salt: &str, invite: RecordId) -> Self {
        CircuitInputs::Deployment {
            nonce: salt.to_string(),
            ships: ships.map(|s| s.as_signal()),
            invite,
        }
    }

    pub fn hit_or_miss(
        ships: &[Ship; NUM_SHIPS],
        salt: &str,
        invite: RecordId,
        board_hash: &str,
        guess: Shot,
    ) -> Self {
        CircuitInputs::HitOrMiss {
            nonce: salt.to_string(),
            ships: ships.map(|s| s.as_signal()),
            invite,
            board_hash: board_hash.to_string(),
            guess: [guess.x as u64, guess.y as u64],
        }
    }

    pub fn circuit(&self) -> Circuit {
        match self {
            CircuitInputs::Deployment { .. } => Circuit::Deployment,
            CircuitInputs::HitOrMiss { .. } => Circuit::HitOrMiss,
        }
    }
}

/// What a successful `prove` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutput {
    pub proof: SerializedProof,
    pub public_signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProverError {
    #[error("inputs are for circuit {inputs:?}, not {circuit:?}")]
    CircuitMismatch { circuit: Circuit, inputs: Circuit },
    #[error("constraint not satisfied: {0}")]
    ConstraintUnsatisfied(String),
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    #[error("malformed public signals: {0}")]
    MalformedSignals(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

/// A zero-knowledge proving backend.
///
/// `prove` is CPU-bound and may take seconds; callers run it on the blocking
/// pool, never on the poll loop.
pub trait ProvingSystem: Send + Sync {
    fn prove(&self, circuit: Circuit, inputs: &CircuitInputs) -> Result<ProofOutput, ProverError>;

    fn verify(
        &self,
        circuit: Circuit,
        proof: &SerializedProof,
        public_signals: &[String],
    ) -> Result<bool, ProverError>;
}

/// Public signals for a hit/miss proof, in circuit order.
pub fn hit_or_miss_signals(hit: bool, board_hash: &str, shot: &Shot) -> Vec<String> {
    vec![
        if hit { "1" } else { "0" }.to_string(),
        board_hash.to_string(),
        shot.x.to_string(),
        shot.y.to_string(),
    ]
}

/// Public signals for a deployment proof, in circuit order.
pub fn deployment_signals(commitment: &str, invite: &RecordId) -> Vec<String> {
    vec![commitment.to_string(), invite.to_string()]
}
