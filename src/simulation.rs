//! Two local peers playing a full match over an [`InMemoryLedger`].

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::commitment::generate_salt;
use crate::core::{random_layout, AgentKey, GameState, RecordId, Shot, Side, BOARD_SIZE};
use crate::ledger::InMemoryLedger;
use crate::monitor::MonitorConfig;
use crate::orchestrator::GameClient;
use crate::protocol::GameError;
use crate::prover::{ProvingSystem, SimulatedProver};

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub seed: u64,
    pub poll_interval: Duration,
    pub replication_lag: Duration,
    pub prove_delay: Duration,
    /// Shots each player may fire before the match is called off.
    pub max_rounds: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            poll_interval: Duration::from_millis(20),
            replication_lag: Duration::ZERO,
            prove_delay: Duration::ZERO,
            max_rounds: (BOARD_SIZE as usize) * (BOARD_SIZE as usize),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub agent: String,
    pub shots: usize,
    pub hits: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub invite: String,
    pub state: GameState,
    pub winner: Option<Side>,
    pub home: PlayerSummary,
    pub away: PlayerSummary,
}

/// Both clients of a local match, sharing one store and one prover setup.
pub struct LocalMatch {
    pub home: GameClient,
    pub away: GameClient,
    pub invite: RecordId,
    config: MatchConfig,
}

impl LocalMatch {
    /// Invite, wait for the invite to replicate, and deploy both fleets.
    pub async fn setup(config: MatchConfig) -> Result<Self, GameError> {
        let prover: Arc<dyn ProvingSystem> =
            Arc::new(SimulatedProver::new("local-match").with_delay(config.prove_delay));
        let home_key = AgentKey::from_seed(1);
        let away_key = AgentKey::from_seed(2);
        let home_ledger = InMemoryLedger::new(home_key, Arc::clone(&prover))
            .with_replication_lag(config.replication_lag);
        let away_ledger = home_ledger.join(away_key);
        let monitor = MonitorConfig {
            poll_interval: config.poll_interval,
        };
        let home = GameClient::new(Arc::new(home_ledger), Arc::clone(&prover))
            .with_monitor_config(monitor);
        let away = GameClient::new(Arc::new(away_ledger), prover).with_monitor_config(monitor);

        let invite = home.create_invite(away_key).await?;
        while !away.incoming_invites().await?.iter().any(|r| r.id == invite) {
            tokio::time::sleep(config.poll_interval).await;
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        for client in [&home, &away] {
            let ships = random_layout(&mut rng)?;
            client
                .submit_deployment(invite, ships, generate_salt(&mut rng))
                .await?;
        }
        Ok(Self {
            home,
            away,
            invite,
            config,
        })
    }

    /// Run both monitors and both shooters until the game ends or both
    /// players have used up their shots.
    pub async fn play(&self) -> Result<MatchSummary, GameError> {
        let home_monitor = self.home.start_monitor(self.invite).await?;
        let away_monitor = self.away.start_monitor(self.invite).await?;
        let home_rng = SmallRng::seed_from_u64(self.config.seed.wrapping_add(1));
        let away_rng = SmallRng::seed_from_u64(self.config.seed.wrapping_add(2));

        let played = tokio::try_join!(
            self.shoot(&self.home, home_rng),
            self.shoot(&self.away, away_rng)
        );
        home_monitor.stop().await;
        away_monitor.stop().await;
        played?;
        self.summary().await
    }

    async fn shoot(&self, client: &GameClient, mut rng: SmallRng) -> Result<(), GameError> {
        let side = client
            .viewer_role(self.invite)
            .await?
            .side()
            .ok_or(GameError::NotAParticipant)?;
        let mut fired = 0;
        while fired < self.config.max_rounds {
            let state = client.game_state(self.invite).await?;
            match state {
                GameState::GameOver { .. } => return Ok(()),
                GameState::Corrupt => return Err(GameError::CorruptTranscript),
                s if s.can_fire(side) => {
                    let (x, y) = self.pick_target(client, side, &mut rng).await?;
                    match client.fire_shot(self.invite, x, y).await {
                        Ok(_) => fired += 1,
                        Err(e) if e.is_retryable() => log::debug!("shot not accepted yet: {}", e),
                        Err(e) => return Err(e),
                    }
                }
                _ => {}
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        Ok(())
    }

    async fn pick_target(
        &self,
        client: &GameClient,
        side: Side,
        rng: &mut SmallRng,
    ) -> Result<(usize, usize), GameError> {
        let transcript = client.transcript(self.invite).await?;
        let n = BOARD_SIZE as usize;
        let open: Vec<(usize, usize)> = (0..n * n)
            .map(|i| (i % n, i / n))
            .filter(|&(x, y)| {
                transcript
                    .as_ref()
                    .map_or(true, |t| !t.has_targeted(side, &Shot::new(x, y)))
            })
            .collect();
        if open.is_empty() {
            return Err(GameError::Rejected("no untargeted cells left".into()));
        }
        Ok(open[rng.random_range(0..open.len())])
    }

    pub async fn summary(&self) -> Result<MatchSummary, GameError> {
        let state = self.home.game_state(self.invite).await?;
        let transcript = self.home.transcript(self.invite).await?;
        let player = |client: &GameClient, side: Side| PlayerSummary {
            agent: client.agent().to_string(),
            shots: transcript.as_ref().map_or(0, |t| t.shots(side).len()),
            hits: transcript.as_ref().map_or(0, |t| t.hits_landed(side)),
        };
        Ok(MatchSummary {
            invite: self.invite.to_string(),
            state,
            winner: match state {
                GameState::GameOver { winner } => Some(winner),
                _ => None,
            },
            home: player(&self.home, Side::Home),
            away: player(&self.away, Side::Away),
        })
    }
}
