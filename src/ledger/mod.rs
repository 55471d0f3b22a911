//! The replication substrate, reached by function name and payload.
//!
//! Every method runs on behalf of the handle's own agent: "your" deployment
//! means the caller's. Implementations must tolerate the same mutating call
//! arriving twice; content addressing makes the second one a no-op.

pub mod in_memory;
pub mod validation;

pub use in_memory::InMemoryLedger;

use crate::core::{AgentKey, GameInvite, GameState, GameTranscript, RecordId};
use crate::protocol::{
    FireShotInput, GameError, HitOrMissProof, ProveHitOrMissInput, Record, ShipDeployment,
    ShipDeploymentCommitment,
};

#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Agent this handle acts for.
    fn agent(&self) -> AgentKey;

    async fn create_game_invite(&self, invite: GameInvite) -> Result<Record<GameInvite>, GameError>;

    async fn create_ship_deployment(
        &self,
        deployment: ShipDeployment,
    ) -> Result<Record<ShipDeployment>, GameError>;

    async fn create_ship_deployment_proof(
        &self,
        commitment: ShipDeploymentCommitment,
    ) -> Result<Record<ShipDeploymentCommitment>, GameError>;

    async fn fire_shot(&self, input: FireShotInput) -> Result<Record<GameTranscript>, GameError>;

    async fn prove_hit_or_miss(
        &self,
        input: ProveHitOrMissInput,
    ) -> Result<Record<HitOrMissProof>, GameError>;

    async fn get_game_state(&self, invite: RecordId) -> Result<GameState, GameError>;

    async fn get_game_invite(&self, invite: RecordId) -> Result<Option<Record<GameInvite>>, GameError>;

    async fn get_your_ship_deployment_for_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<ShipDeployment>>, GameError>;

    async fn get_your_ship_deployment_proof_for_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<ShipDeploymentCommitment>>, GameError>;

    async fn get_latest_game_transcript_for_game_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<GameTranscript>>, GameError>;

    /// Invites in which `participant` plays either side.
    async fn get_invites(&self, participant: AgentKey) -> Result<Vec<Record<GameInvite>>, GameError>;

    /// Invites in which `recipient` is the invited (away) player.
    async fn get_my_incoming_invites(
        &self,
        recipient: AgentKey,
    ) -> Result<Vec<Record<GameInvite>>, GameError>;
}
