use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::core::{
    derive_state, AgentKey, GameInvite, GameState, GameTranscript, RecordId, Shot, ShotOutcome,
    Side,
};
use crate::protocol::{
    FireShotInput, GameError, HitOrMissProof, ProveHitOrMissInput, Record, RecordKind,
    ShipDeployment, ShipDeploymentCommitment,
};
use crate::prover::ProvingSystem;

use super::validation;
use super::Ledger;

struct Stored<T> {
    record: Record<T>,
    published_at: Instant,
}

#[derive(Default)]
struct Store {
    invites: Vec<Stored<GameInvite>>,
    deployments: Vec<Stored<ShipDeployment>>,
    commitments: Vec<Stored<ShipDeploymentCommitment>>,
    proofs: Vec<Stored<HitOrMissProof>>,
    /// Every transcript version, oldest first.
    transcripts: Vec<Stored<GameTranscript>>,
}

impl Store {
    fn invite(&self, id: &RecordId) -> Result<Record<GameInvite>, GameError> {
        self.invites
            .iter()
            .find(|s| s.record.id == *id)
            .map(|s| s.record.clone())
            .ok_or(GameError::NotFound("game invite"))
    }

    fn commitment_of(&self, invite: &RecordId, author: &AgentKey) -> Option<&Stored<ShipDeploymentCommitment>> {
        self.commitments
            .iter()
            .find(|s| s.record.entry.invite == *invite && s.record.author == *author)
    }

    fn deployment_of(&self, invite: &RecordId, author: &AgentKey) -> Option<&Stored<ShipDeployment>> {
        self.deployments
            .iter()
            .find(|s| s.record.entry.invite == *invite && s.record.author == *author)
    }

    fn proof(&self, id: &RecordId) -> Option<Record<HitOrMissProof>> {
        self.proofs
            .iter()
            .find(|s| s.record.id == *id)
            .map(|s| s.record.clone())
    }

    fn transcripts_for<'a>(
        &'a self,
        invite: &'a RecordId,
    ) -> impl DoubleEndedIterator<Item = &'a Stored<GameTranscript>> + 'a {
        self.transcripts
            .iter()
            .filter(move |s| s.record.entry.invite == *invite)
    }

    /// Newest transcript regardless of replication.
    fn latest_transcript(&self, invite: &RecordId) -> Option<Record<GameTranscript>> {
        self.transcripts_for(invite).next_back().map(|s| s.record.clone())
    }

    /// The transcript that appended `shot`, if it is `side`'s most recent shot.
    fn transcript_ending_with(
        &self,
        invite: &RecordId,
        side: Side,
        shot: &Shot,
    ) -> Option<Record<GameTranscript>> {
        let latest = self.transcripts_for(invite).next_back()?;
        let shots = latest.record.entry.shots(side);
        if shots.last() != Some(shot) {
            return None;
        }
        let count = shots.len();
        self.transcripts_for(invite)
            .find(|s| s.record.entry.shots(side).len() == count)
            .map(|s| s.record.clone())
    }

    /// State as the substrate sees it, with every fact replicated.
    fn authoritative_state(&self, invite: &Record<GameInvite>) -> GameState {
        let transcript = self.latest_transcript(&invite.id);
        derive_state(
            &invite.id,
            self.commitment_of(&invite.id, &invite.entry.home_player).is_some(),
            self.commitment_of(&invite.id, &invite.entry.away_player).is_some(),
            transcript.as_ref().map(|r| &r.entry),
        )
    }
}

struct Shared {
    store: Mutex<Store>,
    verifier: Arc<dyn ProvingSystem>,
}

/// A replication substrate kept in process memory.
///
/// Each handle acts for one agent; handles made with [`InMemoryLedger::join`]
/// share the same store. Facts authored by other agents become visible to a
/// handle only after its replication lag has elapsed, so peers can disagree
/// for a while about the latest transcript. Validation always runs against
/// the full store.
#[derive(Clone)]
pub struct InMemoryLedger {
    shared: Arc<Shared>,
    agent: AgentKey,
    lag: Duration,
}

impl InMemoryLedger {
    pub fn new(agent: AgentKey, verifier: Arc<dyn ProvingSystem>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(Store::default()),
                verifier,
            }),
            agent,
            lag: Duration::ZERO,
        }
    }

    /// Another agent's handle onto the same store, with the same lag.
    pub fn join(&self, agent: AgentKey) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            agent,
            lag: self.lag,
        }
    }

    /// Delay before facts authored by others become visible to this handle.
    pub fn with_replication_lag(mut self, lag: Duration) -> Self {
        self.lag = lag;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.shared
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn visible<T>(&self, stored: &Stored<T>) -> bool {
        stored.record.author == self.agent || stored.published_at + self.lag <= Instant::now()
    }

    fn publish<T: Clone>(list: &mut Vec<Stored<T>>, record: Record<T>) -> Record<T> {
        list.push(Stored {
            record: record.clone(),
            published_at: Instant::now(),
        });
        record
    }
}

#[async_trait::async_trait]
impl Ledger for InMemoryLedger {
    fn agent(&self) -> AgentKey {
        self.agent
    }

    async fn create_game_invite(&self, invite: GameInvite) -> Result<Record<GameInvite>, GameError> {
        validation::check_invite(&self.agent, &invite)?;
        let record = Record::new(RecordKind::GameInvite, self.agent, invite)?;
        let mut store = self.lock();
        if let Some(existing) = store.invites.iter().find(|s| s.record.id == record.id) {
            return Ok(existing.record.clone());
        }
        log::info!("{} invited {} to game {}", self.agent, record.entry.away_player, record.id);
        Ok(Self::publish(&mut store.invites, record))
    }

    async fn create_ship_deployment(
        &self,
        deployment: ShipDeployment,
    ) -> Result<Record<ShipDeployment>, GameError> {
        let record = Record::new(RecordKind::ShipDeployment, self.agent, deployment)?;
        let mut store = self.lock();
        let invite = store.invite(&record.entry.invite)?;
        validation::check_deployment(&self.agent, &invite, &record.entry)?;
        if let Some(existing) = store.deployment_of(&invite.id, &self.agent) {
            if existing.record.id == record.id {
                return Ok(existing.record.clone());
            }
            return Err(GameError::Rejected("ships already deployed for this game".into()));
        }
        log::debug!("{} stored private deployment {}", self.agent, record.id);
        Ok(Self::publish(&mut store.deployments, record))
    }

    async fn create_ship_deployment_proof(
        &self,
        commitment: ShipDeploymentCommitment,
    ) -> Result<Record<ShipDeploymentCommitment>, GameError> {
        let record = Record::new(RecordKind::ShipDeploymentCommitment, self.agent, commitment)?;
        let mut store = self.lock();
        let invite = store.invite(&record.entry.invite)?;
        if let Some(existing) = store.commitment_of(&invite.id, &self.agent) {
            if existing.record.id == record.id {
                return Ok(existing.record.clone());
            }
            return Err(GameError::Rejected("deployment already committed for this game".into()));
        }
        let private_entry = store
            .deployments
            .iter()
            .find(|s| s.record.id == record.entry.private_entry)
            .map(|s| s.record.clone())
            .ok_or(GameError::NotFound("ship deployment"))?;
        let side = validation::check_deployment_commitment(
            &self.agent,
            &invite,
            &private_entry,
            &record.entry,
            self.shared.verifier.as_ref(),
        )?;
        log::info!("{} ({:?}) committed deployment for game {}", self.agent, side, invite.id);
        Ok(Self::publish(&mut store.commitments, record))
    }

    async fn fire_shot(&self, input: FireShotInput) -> Result<Record<GameTranscript>, GameError> {
        let mut store = self.lock();
        let invite = store.invite(&input.game_invite_hash)?;
        let side = validation::side_of(&invite.entry, &self.agent)?;
        let state = store.authoritative_state(&invite);
        if !state.can_fire(side) {
            // Resubmitting the shot just taken returns the record it created.
            if let Some(existing) = store.transcript_ending_with(&invite.id, side, &input.shot) {
                return Ok(existing);
            }
        }
        let prev = store.latest_transcript(&invite.id);
        validation::check_shot(state, side, prev.as_ref().map(|r| &r.entry), &input.shot)?;

        let next = match &prev {
            None => {
                let home = store
                    .commitment_of(&invite.id, &invite.entry.home_player)
                    .map(|s| s.record.id)
                    .ok_or(GameError::NotFound("home deployment commitment"))?;
                let away = store
                    .commitment_of(&invite.id, &invite.entry.away_player)
                    .map(|s| s.record.id)
                    .ok_or(GameError::NotFound("away deployment commitment"))?;
                let mut next = GameTranscript::new(invite.id, home, away);
                next.shots_mut(side).push(input.shot);
                validation::check_transcript_creation(side, &next, &invite.id, &home, &away)?;
                next
            }
            Some(prev) => {
                let mut next = prev.entry.clone();
                next.shots_mut(side).push(input.shot);
                validation::check_transcript_update(
                    side,
                    state,
                    &prev.entry,
                    &next,
                    &invite.entry,
                    |id| store.proof(id),
                )?;
                next
            }
        };
        let record = Record::new(RecordKind::GameTranscript, self.agent, next)?;
        log::info!(
            "{} ({:?}) fired at ({}, {}) in game {}",
            self.agent,
            side,
            input.shot.x,
            input.shot.y,
            invite.id
        );
        Ok(Self::publish(&mut store.transcripts, record))
    }

    async fn prove_hit_or_miss(
        &self,
        input: ProveHitOrMissInput,
    ) -> Result<Record<HitOrMissProof>, GameError> {
        let proof = Record::new(RecordKind::HitOrMissProof, self.agent, input.hit_or_miss_proof)?;
        let mut store = self.lock();
        let invite = store.invite(&input.game_invite_hash)?;
        let side = validation::side_of(&invite.entry, &self.agent)?;
        let prev = store.latest_transcript(&invite.id);

        let already_recorded = prev
            .as_ref()
            .is_some_and(|t| t.entry.outcomes(side).iter().any(|o| o.proof_hash == proof.id));
        if already_recorded {
            if let Some(existing) = store.proof(&proof.id) {
                return Ok(existing);
            }
        }

        let state = store.authoritative_state(&invite);
        let prev = match prev {
            Some(prev) if state.owes_proof(side) => prev,
            _ => return Err(GameError::OutOfTurn { state }),
        };
        let own_commitment = store
            .commitment_of(&invite.id, &self.agent)
            .map(|s| s.record.clone())
            .ok_or(GameError::NotFound("deployment commitment"))?;
        let index = validation::check_outcome(
            state,
            side,
            &prev.entry,
            &own_commitment,
            &proof.entry,
            self.shared.verifier.as_ref(),
        )?;

        let mut next = prev.entry.clone();
        next.outcomes_mut(side).push(ShotOutcome {
            proof_hash: proof.id,
            hit: proof.entry.hit,
        });
        validation::check_transcript_update(side, state, &prev.entry, &next, &invite.entry, |id| {
            if *id == proof.id {
                Some(proof.clone())
            } else {
                store.proof(id)
            }
        })?;
        let transcript = Record::new(RecordKind::GameTranscript, self.agent, next)?;

        if store.proof(&proof.id).is_none() {
            Self::publish(&mut store.proofs, proof.clone());
        }
        Self::publish(&mut store.transcripts, transcript);
        log::info!(
            "{} ({:?}) answered shot #{} at ({}, {}): {}",
            self.agent,
            side,
            index,
            proof.entry.shot.x,
            proof.entry.shot.y,
            if proof.entry.hit { "hit" } else { "miss" }
        );
        Ok(proof)
    }

    async fn get_game_state(&self, invite: RecordId) -> Result<GameState, GameError> {
        let store = self.lock();
        let invite = store
            .invites
            .iter()
            .find(|s| s.record.id == invite && self.visible(s))
            .map(|s| s.record.clone())
            .ok_or(GameError::NotFound("game invite"))?;
        let committed = |player: &AgentKey| {
            store
                .commitment_of(&invite.id, player)
                .is_some_and(|s| self.visible(s))
        };
        let transcript = store
            .transcripts_for(&invite.id)
            .rev()
            .find(|s| self.visible(s))
            .map(|s| &s.record.entry);
        Ok(derive_state(
            &invite.id,
            committed(&invite.entry.home_player),
            committed(&invite.entry.away_player),
            transcript,
        ))
    }

    async fn get_game_invite(&self, invite: RecordId) -> Result<Option<Record<GameInvite>>, GameError> {
        let store = self.lock();
        Ok(store
            .invites
            .iter()
            .find(|s| s.record.id == invite && self.visible(s))
            .map(|s| s.record.clone()))
    }

    async fn get_your_ship_deployment_for_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<ShipDeployment>>, GameError> {
        let store = self.lock();
        Ok(store.deployment_of(&invite, &self.agent).map(|s| s.record.clone()))
    }

    async fn get_your_ship_deployment_proof_for_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<ShipDeploymentCommitment>>, GameError> {
        let store = self.lock();
        Ok(store.commitment_of(&invite, &self.agent).map(|s| s.record.clone()))
    }

    async fn get_latest_game_transcript_for_game_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<GameTranscript>>, GameError> {
        let store = self.lock();
        let latest = store
            .transcripts_for(&invite)
            .rev()
            .find(|s| self.visible(s))
            .map(|s| s.record.clone());
        Ok(latest)
    }

    async fn get_invites(&self, participant: AgentKey) -> Result<Vec<Record<GameInvite>>, GameError> {
        let store = self.lock();
        Ok(store
            .invites
            .iter()
            .filter(|s| self.visible(s))
            .filter(|s| s.record.entry.role_of(&participant).side().is_some())
            .map(|s| s.record.clone())
            .collect())
    }

    async fn get_my_incoming_invites(
        &self,
        recipient: AgentKey,
    ) -> Result<Vec<Record<GameInvite>>, GameError> {
        let store = self.lock();
        Ok(store
            .invites
            .iter()
            .filter(|s| self.visible(s) && s.record.entry.away_player == recipient)
            .map(|s| s.record.clone())
            .collect())
    }
}
