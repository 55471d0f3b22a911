//! Records exchanged through the replicated ledger, and their content
//! addresses.

pub mod error;

pub use error::GameError;

use serde::{Deserialize, Serialize};

use crate::core::{AgentKey, RecordId, Ship, Shot, NUM_SHIPS};

/// Serialized proof as produced by the proving backend.
pub type SerializedProof = String;

/// Private ship layout. Only ever read back by its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipDeployment {
    pub invite: RecordId,
    pub ships: [Ship; NUM_SHIPS],
    pub salt: String,
}

/// Public commitment to a `ShipDeployment`, with a proof that the committed
/// layout is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipDeploymentCommitment {
    pub invite: RecordId,
    pub private_entry: RecordId,
    pub commitment: String,
    pub proof: SerializedProof,
}

/// Proof that `shot` did or did not hit the board behind
/// `deployment_commitment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitOrMissProof {
    pub deployment_proof: RecordId,
    pub deployment_commitment: String,
    pub shot: Shot,
    pub hit: bool,
    pub proof: SerializedProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireShotInput {
    pub game_invite_hash: RecordId,
    pub shot: Shot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProveHitOrMissInput {
    pub game_invite_hash: RecordId,
    pub hit_or_miss_proof: HitOrMissProof,
}

/// Kinds of records, mixed into content addresses so that equal payloads of
/// different kinds never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    GameInvite,
    ShipDeployment,
    ShipDeploymentCommitment,
    GameTranscript,
    HitOrMissProof,
}

/// A committed fact as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: RecordId,
    pub author: AgentKey,
    pub entry: T,
}

impl<T: Serialize> Record<T> {
    /// Seal `entry` under its content address.
    pub fn new(kind: RecordKind, author: AgentKey, entry: T) -> Result<Self, GameError> {
        let id = content_address(kind, &author, &entry)?;
        Ok(Record { id, author, entry })
    }
}

/// BLAKE3 over the bincode encoding of `(kind, author, entry)`.
pub fn content_address<T: Serialize>(
    kind: RecordKind,
    author: &AgentKey,
    entry: &T,
) -> Result<RecordId, GameError> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&bincode::serialize(&kind)?);
    hasher.update(&author.0);
    hasher.update(&bincode::serialize(entry)?);
    Ok(RecordId(*hasher.finalize().as_bytes()))
}
