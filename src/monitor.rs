//! Proof obligation monitor.
//!
//! A peer never gets told that a shot landed on its board. It finds out by
//! polling: every tick re-fetches the transcript, re-derives the state, and
//! if this peer owes a hit/miss proof for a shot it has not proved yet, one
//! proof generation is started in the background. At most one generation is
//! in flight per game.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;

use crate::commitment;
use crate::core::{derive_state, GameState, GameTranscript, RecordId, Shot, Side, TranscriptLengths};
use crate::ledger::Ledger;
use crate::protocol::{
    GameError, HitOrMissProof, ProveHitOrMissInput, Record, ShipDeployment, ShipDeploymentCommitment,
};
use crate::prover::ProvingSystem;

/// Something a client may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum GameEvent {
    DeploymentCreated { invite: RecordId, deployment: RecordId },
    DeploymentProofCreated { invite: RecordId, commitment: RecordId },
    ShotFired { invite: RecordId, shot: Shot },
    OpponentFired { invite: RecordId, index: usize, shot: Shot },
    OutcomeRecorded { invite: RecordId, shooter: Side, shot: Shot, hit: bool },
    StateChanged { invite: RecordId, state: GameState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Single-flight bookkeeping shared with the background proving task and
/// with every other session a client runs for the same game.
#[derive(Debug, Default)]
pub(crate) struct Flight {
    in_flight: AtomicBool,
    /// One past the highest shot index proved or found already answered.
    next_unproved: AtomicUsize,
}

/// Per-game state a peer keeps between ticks. None of it is authoritative;
/// it can all be rebuilt from the ledger.
#[derive(Debug)]
pub struct GameSession {
    pub invite: RecordId,
    pub side: Side,
    last_seen: TranscriptLengths,
    last_state: Option<GameState>,
    deployment: Option<(Record<ShipDeployment>, Record<ShipDeploymentCommitment>)>,
    flight: Arc<Flight>,
}

impl GameSession {
    pub fn new(invite: RecordId, side: Side) -> Self {
        Self::sharing(invite, side, Arc::default())
    }

    /// A session whose in-flight latch is shared with others for the game.
    pub(crate) fn sharing(invite: RecordId, side: Side, flight: Arc<Flight>) -> Self {
        Self {
            invite,
            side,
            last_seen: TranscriptLengths::default(),
            last_state: None,
            deployment: None,
            flight,
        }
    }

    /// Whether a proof generation is running for this game.
    pub fn proving(&self) -> bool {
        self.flight.in_flight.load(Ordering::Acquire)
    }

    /// Number of opponent shots this peer has answered or seen answered.
    pub fn proved_count(&self) -> usize {
        self.flight.next_unproved.load(Ordering::Acquire)
    }

    pub fn last_state(&self) -> Option<GameState> {
        self.last_state
    }
}

pub struct ProofObligationMonitor {
    ledger: Arc<dyn Ledger>,
    prover: Arc<dyn ProvingSystem>,
    events: broadcast::Sender<GameEvent>,
    config: MonitorConfig,
}

impl ProofObligationMonitor {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        prover: Arc<dyn ProvingSystem>,
        events: broadcast::Sender<GameEvent>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            ledger,
            prover,
            events,
            config,
        }
    }

    fn emit(&self, event: GameEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// One poll: refresh, report what changed, and start a proof if one is
    /// owed and none is running. Returns the state observed.
    pub async fn tick(&self, session: &mut GameSession) -> Result<GameState, GameError> {
        let invite = session.invite;
        let reported = self.ledger.get_game_state(invite).await?;
        let transcript = self
            .ledger
            .get_latest_game_transcript_for_game_invite(invite)
            .await?
            .map(|r| r.entry);
        // Both commitments are visible once the game has started; re-derive
        // against the transcript fetched second so the two agree.
        let state = match reported {
            GameState::AwaitingBothDeployments
            | GameState::AwaitingHomeDeployment
            | GameState::AwaitingAwayDeployment => reported,
            _ => derive_state(&invite, true, true, transcript.as_ref()),
        };

        if let Some(t) = &transcript {
            self.report_new_facts(session, t);
        }
        if session.last_state != Some(state) {
            log::info!("game {} ({:?}): {:?}", invite, session.side, state);
            session.last_state = Some(state);
            self.emit(GameEvent::StateChanged { invite, state });
        }

        if state.owes_proof(session.side) {
            if let Some(t) = &transcript {
                self.maybe_start_proof(session, t).await?;
            }
        }
        Ok(state)
    }

    fn report_new_facts(&self, session: &mut GameSession, transcript: &GameTranscript) {
        let invite = session.invite;
        let lengths = transcript.lengths();
        let opponent = session.side.opponent();
        let fired_at_us = transcript.shots(opponent);
        for index in session.last_seen.shots(opponent)..lengths.shots(opponent) {
            self.emit(GameEvent::OpponentFired {
                invite,
                index,
                shot: fired_at_us[index],
            });
        }
        for shooter in [Side::Home, Side::Away] {
            let shots = transcript.shots(shooter);
            let outcomes = transcript.outcomes(shooter.opponent());
            let seen = session.last_seen.outcomes(shooter.opponent());
            for (shot, outcome) in shots.iter().zip(outcomes).skip(seen) {
                self.emit(GameEvent::OutcomeRecorded {
                    invite,
                    shooter,
                    shot: *shot,
                    hit: outcome.hit,
                });
            }
        }
        session.last_seen = lengths;
    }

    async fn cached_deployment(
        &self,
        session: &mut GameSession,
    ) -> Result<(Record<ShipDeployment>, Record<ShipDeploymentCommitment>), GameError> {
        if let Some(cached) = &session.deployment {
            return Ok(cached.clone());
        }
        let deployment = self
            .ledger
            .get_your_ship_deployment_for_invite(session.invite)
            .await?
            .ok_or(GameError::NotFound("ship deployment"))?;
        let commitment = self
            .ledger
            .get_your_ship_deployment_proof_for_invite(session.invite)
            .await?
            .ok_or(GameError::NotFound("deployment commitment"))?;
        session.deployment = Some((deployment.clone(), commitment.clone()));
        Ok((deployment, commitment))
    }

    async fn maybe_start_proof(
        &self,
        session: &mut GameSession,
        transcript: &GameTranscript,
    ) -> Result<(), GameError> {
        let (index, shot) = match transcript.unanswered_shot_against(session.side) {
            Some(owed) => owed,
            None => return Ok(()),
        };
        if index < session.flight.next_unproved.load(Ordering::Acquire) {
            log::debug!("shot #{} already proved, waiting for replication", index);
            return Ok(());
        }
        if session.proving() {
            log::debug!("proof already in flight for game {}", session.invite);
            return Ok(());
        }
        let (deployment, commitment) = self.cached_deployment(session).await?;
        if session.flight.in_flight.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        log::info!(
            "game {} ({:?}): proving shot #{} at ({}, {})",
            session.invite,
            session.side,
            index,
            shot.x,
            shot.y
        );
        let task = ProofTask {
            ledger: Arc::clone(&self.ledger),
            prover: Arc::clone(&self.prover),
            invite: session.invite,
            side: session.side,
            deployment,
            commitment,
            index,
            shot,
        };
        let flight = Arc::clone(&session.flight);
        tokio::spawn(async move {
            match task.run().await {
                Ok(_) => {
                    flight.next_unproved.fetch_max(index + 1, Ordering::AcqRel);
                }
                Err(e) => log::warn!("proof for shot #{} failed, will retry: {}", index, e),
            }
            flight.in_flight.store(false, Ordering::Release);
        });
        Ok(())
    }

    /// Poll on a fixed interval until the game ends or `shutdown` flips to
    /// true. Ticks never overlap; missed ticks are skipped.
    pub async fn run(self, mut session: GameSession, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            match self.tick(&mut session).await {
                Ok(GameState::GameOver { winner }) => {
                    log::info!("game {} over, {:?} won", session.invite, winner);
                    break;
                }
                Ok(GameState::Corrupt) => {
                    log::warn!("game {} has a corrupt transcript", session.invite);
                }
                Ok(_) => {}
                Err(e) if e.is_retryable() => log::debug!("tick failed, retrying: {}", e),
                Err(e) => log::warn!("tick failed: {}", e),
            }
        }
        log::debug!("monitor for game {} stopped", session.invite);
    }
}

/// One background hit/miss proof: prove, re-check, submit.
struct ProofTask {
    ledger: Arc<dyn Ledger>,
    prover: Arc<dyn ProvingSystem>,
    invite: RecordId,
    side: Side,
    deployment: Record<ShipDeployment>,
    commitment: Record<ShipDeploymentCommitment>,
    index: usize,
    shot: Shot,
}

impl ProofTask {
    /// Returns `false` if the result was discarded because the obligation
    /// had already been met.
    async fn run(self) -> Result<bool, GameError> {
        let (hit, proof) = commitment::prove_hit_or_miss(
            self.prover,
            &self.deployment.entry,
            &self.commitment.entry.commitment,
            self.shot,
        )
        .await?;

        let latest = self
            .ledger
            .get_latest_game_transcript_for_game_invite(self.invite)
            .await?;
        let owed = latest
            .as_ref()
            .and_then(|t| t.entry.unanswered_shot_against(self.side))
            .map(|(index, _)| index);
        if owed != Some(self.index) {
            log::debug!(
                "shot #{} no longer owed in game {}, discarding proof",
                self.index,
                self.invite
            );
            return Ok(false);
        }

        self.ledger
            .prove_hit_or_miss(ProveHitOrMissInput {
                game_invite_hash: self.invite,
                hit_or_miss_proof: HitOrMissProof {
                    deployment_proof: self.commitment.id,
                    deployment_commitment: self.commitment.entry.commitment.clone(),
                    shot: self.shot,
                    hit,
                    proof,
                },
            })
            .await?;
        Ok(true)
    }
}
