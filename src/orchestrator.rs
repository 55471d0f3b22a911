//! Client-facing game operations.
//!
//! `GameClient` composes the ledger, the prover and the monitor. It holds no
//! authoritative state: every answer is derived from what the ledger shows
//! at the moment of asking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::commitment::commit_deployment;
use crate::core::{
    shot_is_on_board, validate_layout, AgentKey, BoardView, GameInvite, GameState, GameTranscript,
    RecordId, Ship, Shot, Side, ViewerRole, NUM_SHIPS,
};
use crate::ledger::Ledger;
use crate::monitor::{Flight, GameEvent, GameSession, MonitorConfig, ProofObligationMonitor};
use crate::protocol::{FireShotInput, GameError, Record, ShipDeployment, ShipDeploymentCommitment};
use crate::prover::ProvingSystem;

const EVENT_CAPACITY: usize = 1024;

/// The two boards as one player sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardViews {
    /// Own ships, with the opponent's shots marked.
    pub own: BoardView,
    /// What this player's shots have revealed about the opponent.
    pub opponent: BoardView,
}

/// Running poll loop for one game.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Ask the loop to stop and wait for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// Wait for the loop to end on its own, which it does at game over.
    pub async fn join(self) {
        let _ = self.task.await;
        drop(self.shutdown);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[derive(Clone)]
pub struct GameClient {
    ledger: Arc<dyn Ledger>,
    prover: Arc<dyn ProvingSystem>,
    events: broadcast::Sender<GameEvent>,
    config: MonitorConfig,
    /// One latch per game, shared by every session this client and its
    /// clones create, so a peer never proves twice at once for a game.
    flights: Arc<Mutex<HashMap<RecordId, Arc<Flight>>>>,
}

impl GameClient {
    pub fn new(ledger: Arc<dyn Ledger>, prover: Arc<dyn ProvingSystem>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ledger,
            prover,
            events,
            config: MonitorConfig::default(),
            flights: Arc::default(),
        }
    }

    pub fn with_monitor_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn agent(&self) -> AgentKey {
        self.ledger.agent()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: GameEvent) {
        let _ = self.events.send(event);
    }

    /// Invite `away` to a game hosted by this agent. Returns the game id.
    pub async fn create_invite(&self, away: AgentKey) -> Result<RecordId, GameError> {
        let record = self
            .ledger
            .create_game_invite(GameInvite {
                home_player: self.agent(),
                away_player: away,
            })
            .await?;
        Ok(record.id)
    }

    pub async fn incoming_invites(&self) -> Result<Vec<Record<GameInvite>>, GameError> {
        self.ledger.get_my_incoming_invites(self.agent()).await
    }

    pub async fn viewer_role(&self, invite: RecordId) -> Result<ViewerRole, GameError> {
        let record = self
            .ledger
            .get_game_invite(invite)
            .await?
            .ok_or(GameError::NotFound("game invite"))?;
        Ok(record.entry.role_of(&self.agent()))
    }

    async fn side_in(&self, invite: RecordId) -> Result<Side, GameError> {
        self.viewer_role(invite)
            .await?
            .side()
            .ok_or(GameError::NotAParticipant)
    }

    pub async fn game_state(&self, invite: RecordId) -> Result<GameState, GameError> {
        self.ledger.get_game_state(invite).await
    }

    pub async fn transcript(&self, invite: RecordId) -> Result<Option<GameTranscript>, GameError> {
        Ok(self
            .ledger
            .get_latest_game_transcript_for_game_invite(invite)
            .await?
            .map(|r| r.entry))
    }

    /// Commit to `ships` for `invite`: prove the commitment, then publish the
    /// private deployment and the public commitment that points at it.
    pub async fn submit_deployment(
        &self,
        invite: RecordId,
        ships: [Ship; NUM_SHIPS],
        salt: String,
    ) -> Result<Record<ShipDeploymentCommitment>, GameError> {
        validate_layout(&ships)?;
        self.side_in(invite).await?;
        let (commitment, proof) =
            commit_deployment(Arc::clone(&self.prover), invite, &ships, &salt).await?;

        let deployment = self
            .ledger
            .create_ship_deployment(ShipDeployment { invite, ships, salt })
            .await?;
        self.emit(GameEvent::DeploymentCreated {
            invite,
            deployment: deployment.id,
        });

        let record = self
            .ledger
            .create_ship_deployment_proof(ShipDeploymentCommitment {
                invite,
                private_entry: deployment.id,
                commitment,
                proof,
            })
            .await?;
        self.emit(GameEvent::DeploymentProofCreated {
            invite,
            commitment: record.id,
        });
        log::info!("{} deployed ships for game {}", self.agent(), invite);
        Ok(record)
    }

    /// Fire at `(x, y)`. Turn and duplicate checks run locally first so an
    /// obviously bad shot never leaves this peer.
    pub async fn fire_shot(
        &self,
        invite: RecordId,
        x: usize,
        y: usize,
    ) -> Result<Record<GameTranscript>, GameError> {
        let shot = Shot::new(x, y);
        if !shot_is_on_board(&shot) {
            return Err(GameError::ShotOutOfBounds { x, y });
        }
        let side = self.side_in(invite).await?;
        let state = self.game_state(invite).await?;
        if !state.can_fire(side) {
            return Err(GameError::OutOfTurn { state });
        }
        if let Some(transcript) = self.transcript(invite).await? {
            if transcript.has_targeted(side, &shot) {
                return Err(GameError::DuplicateShot { x, y });
            }
        }
        let record = self
            .ledger
            .fire_shot(FireShotInput {
                game_invite_hash: invite,
                shot,
            })
            .await?;
        self.emit(GameEvent::ShotFired { invite, shot });
        Ok(record)
    }

    /// Own board with ships and incoming shots, and the opponent's board as
    /// far as this player's answered shots reveal it.
    pub async fn board_views(&self, invite: RecordId) -> Result<BoardViews, GameError> {
        let side = self.side_in(invite).await?;
        let mut own = BoardView::default();
        if let Some(deployment) = self.ledger.get_your_ship_deployment_for_invite(invite).await? {
            own.ships = validate_layout(&deployment.entry.ships)?;
        }
        let mut opponent = BoardView::default();
        if let Some(transcript) = self.transcript(invite).await? {
            for (shot, outcome) in transcript.shots_with_outcomes(side.opponent()) {
                own.mark(&shot, outcome)?;
            }
            for (shot, outcome) in transcript.shots_with_outcomes(side) {
                opponent.mark(&shot, outcome)?;
            }
        }
        Ok(BoardViews { own, opponent })
    }

    /// A monitor sharing this client's ledger, prover and event stream.
    pub fn monitor(&self) -> ProofObligationMonitor {
        ProofObligationMonitor::new(
            Arc::clone(&self.ledger),
            Arc::clone(&self.prover),
            self.events.clone(),
            self.config,
        )
    }

    /// Session for driving `monitor()` by hand. Sessions for the same game
    /// share one in-flight latch.
    pub async fn session(&self, invite: RecordId) -> Result<GameSession, GameError> {
        let side = self.side_in(invite).await?;
        let flight = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(flights.entry(invite).or_default())
        };
        Ok(GameSession::sharing(invite, side, flight))
    }

    /// Spawn the proof obligation loop for `invite`.
    pub async fn start_monitor(&self, invite: RecordId) -> Result<MonitorHandle, GameError> {
        let session = self.session(invite).await?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.monitor().run(session, shutdown_rx));
        Ok(MonitorHandle { shutdown, task })
    }
}
