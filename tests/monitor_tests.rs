mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use tokio::sync::broadcast;
use zk_battleships::{
    AgentKey, Circuit, CircuitInputs, FireShotInput, GameClient, GameError, GameEvent, GameInvite,
    GameSession,
    GameState, GameTranscript, GameTurn, HitOrMissProof, InMemoryLedger, Ledger, MonitorConfig,
    ProofObligationMonitor, ProofOutput, ProveHitOrMissInput, ProverError, ProvingSystem, Record,
    RecordId, SerializedProof, ShipDeployment, ShipDeploymentCommitment, Shot, Side,
    SimulatedProver,
};

/// Forwards to an `InMemoryLedger`, counting hit/miss submissions.
struct CountingLedger {
    inner: InMemoryLedger,
    submissions: AtomicUsize,
}

#[async_trait::async_trait]
impl Ledger for CountingLedger {
    fn agent(&self) -> AgentKey {
        self.inner.agent()
    }

    async fn create_game_invite(&self, invite: GameInvite) -> Result<Record<GameInvite>, GameError> {
        self.inner.create_game_invite(invite).await
    }

    async fn create_ship_deployment(
        &self,
        deployment: ShipDeployment,
    ) -> Result<Record<ShipDeployment>, GameError> {
        self.inner.create_ship_deployment(deployment).await
    }

    async fn create_ship_deployment_proof(
        &self,
        commitment: ShipDeploymentCommitment,
    ) -> Result<Record<ShipDeploymentCommitment>, GameError> {
        self.inner.create_ship_deployment_proof(commitment).await
    }

    async fn fire_shot(&self, input: FireShotInput) -> Result<Record<GameTranscript>, GameError> {
        self.inner.fire_shot(input).await
    }

    async fn prove_hit_or_miss(
        &self,
        input: ProveHitOrMissInput,
    ) -> Result<Record<HitOrMissProof>, GameError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.inner.prove_hit_or_miss(input).await
    }

    async fn get_game_state(&self, invite: RecordId) -> Result<GameState, GameError> {
        self.inner.get_game_state(invite).await
    }

    async fn get_game_invite(&self, invite: RecordId) -> Result<Option<Record<GameInvite>>, GameError> {
        self.inner.get_game_invite(invite).await
    }

    async fn get_your_ship_deployment_for_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<ShipDeployment>>, GameError> {
        self.inner.get_your_ship_deployment_for_invite(invite).await
    }

    async fn get_your_ship_deployment_proof_for_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<ShipDeploymentCommitment>>, GameError> {
        self.inner.get_your_ship_deployment_proof_for_invite(invite).await
    }

    async fn get_latest_game_transcript_for_game_invite(
        &self,
        invite: RecordId,
    ) -> Result<Option<Record<GameTranscript>>, GameError> {
        self.inner.get_latest_game_transcript_for_game_invite(invite).await
    }

    async fn get_invites(&self, participant: AgentKey) -> Result<Vec<Record<GameInvite>>, GameError> {
        self.inner.get_invites(participant).await
    }

    async fn get_my_incoming_invites(
        &self,
        recipient: AgentKey,
    ) -> Result<Vec<Record<GameInvite>>, GameError> {
        self.inner.get_my_incoming_invites(recipient).await
    }
}

/// Fails the first `failures` hit/miss proofs, then behaves.
struct FlakyProver {
    inner: SimulatedProver,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyProver {
    fn new(inner: SimulatedProver, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }
}

impl ProvingSystem for FlakyProver {
    fn prove(&self, circuit: Circuit, inputs: &CircuitInputs) -> Result<ProofOutput, ProverError> {
        if circuit == Circuit::HitOrMiss {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(ProverError::Backend("flaky".into()));
            }
        }
        self.inner.prove(circuit, inputs)
    }

    fn verify(
        &self,
        circuit: Circuit,
        proof: &SerializedProof,
        public_signals: &[String],
    ) -> Result<bool, ProverError> {
        self.inner.verify(circuit, proof, public_signals)
    }
}

/// Sleeps through every hit/miss proof and records how many overlapped.
struct GaugedProver {
    inner: SimulatedProver,
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl GaugedProver {
    fn new(inner: SimulatedProver, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }
}

impl ProvingSystem for GaugedProver {
    fn prove(&self, circuit: Circuit, inputs: &CircuitInputs) -> Result<ProofOutput, ProverError> {
        if circuit != Circuit::HitOrMiss {
            return self.inner.prove(circuit, inputs);
        }
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        let output = self.inner.prove(circuit, inputs);
        self.current.fetch_sub(1, Ordering::SeqCst);
        output
    }

    fn verify(
        &self,
        circuit: Circuit,
        proof: &SerializedProof,
        public_signals: &[String],
    ) -> Result<bool, ProverError> {
        self.inner.verify(circuit, proof, public_signals)
    }
}

struct Harness {
    peers: Peers,
    invite: RecordId,
    ledger: Arc<CountingLedger>,
}

/// Started game where away has fired at (0, 0), a hit on home's board.
async fn harness() -> Harness {
    let peers = peers(Duration::ZERO);
    let invite = started_game(&peers).await;
    peers
        .away
        .fire_shot(FireShotInput {
            game_invite_hash: invite,
            shot: Shot::new(0, 0),
        })
        .await
        .unwrap();
    let ledger = Arc::new(CountingLedger {
        inner: peers.home.clone(),
        submissions: AtomicUsize::new(0),
    });
    Harness {
        peers,
        invite,
        ledger,
    }
}

fn home_monitor(h: &Harness, prover: Arc<dyn ProvingSystem>) -> (ProofObligationMonitor, broadcast::Receiver<GameEvent>) {
    let (tx, rx) = broadcast::channel(64);
    let monitor = ProofObligationMonitor::new(h.ledger.clone(), prover, tx, MonitorConfig::default());
    (monitor, rx)
}

async fn settle(session: &GameSession) {
    for _ in 0..500 {
        if !session.proving() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("proof generation never finished");
}

fn started(turn: GameTurn) -> GameState {
    GameState::GameStarted { turn }
}

#[tokio::test(flavor = "multi_thread")]
async fn only_one_proof_in_flight() {
    let h = harness().await;
    let slow = Arc::new(FlakyProver::new(
        SimulatedProver::new("tests").with_delay(Duration::from_millis(300)),
        0,
    ));
    let (monitor, _rx) = home_monitor(&h, slow.clone());
    let mut session = GameSession::new(h.invite, Side::Home);

    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeProof));
    assert!(session.proving());
    // Second tick while the first proof is still being generated.
    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeProof));
    assert!(session.proving());

    settle(&session).await;
    assert_eq!(slow.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.submissions.load(Ordering::SeqCst), 1);
    assert_eq!(session.proved_count(), 1);

    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeShot));
    assert!(!session.proving());
    assert_eq!(h.ledger.submissions.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn result_is_discarded_when_obligation_already_met() {
    let h = harness().await;
    let slow: Arc<dyn ProvingSystem> =
        Arc::new(SimulatedProver::new("tests").with_delay(Duration::from_millis(300)));
    let (monitor, _rx) = home_monitor(&h, slow);
    let mut session = GameSession::new(h.invite, Side::Home);

    monitor.tick(&mut session).await.unwrap();
    assert!(session.proving());

    // Another home client answers first.
    answer(&h.peers.home, &h.peers.prover, h.invite, Shot::new(0, 0))
        .await
        .unwrap();

    settle(&session).await;
    assert_eq!(h.ledger.submissions.load(Ordering::SeqCst), 0);
    assert_eq!(session.proved_count(), 1);
    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeShot));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_proof_is_retried_on_a_later_tick() {
    let h = harness().await;
    let flaky = Arc::new(FlakyProver::new(SimulatedProver::new("tests"), 1));
    let (monitor, _rx) = home_monitor(&h, flaky.clone());
    let mut session = GameSession::new(h.invite, Side::Home);

    monitor.tick(&mut session).await.unwrap();
    settle(&session).await;
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.submissions.load(Ordering::SeqCst), 0);
    assert_eq!(session.proved_count(), 0);

    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeProof));
    settle(&session).await;
    assert_eq!(flaky.attempts.load(Ordering::SeqCst), 2);
    assert_eq!(h.ledger.submissions.load(Ordering::SeqCst), 1);

    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeShot));
}

#[tokio::test(flavor = "multi_thread")]
async fn ticks_report_new_facts() {
    let h = harness().await;
    let (monitor, mut rx) = home_monitor(&h, h.peers.prover.clone());
    let mut session = GameSession::new(h.invite, Side::Home);

    monitor.tick(&mut session).await.unwrap();
    assert_eq!(
        rx.try_recv().unwrap(),
        GameEvent::OpponentFired {
            invite: h.invite,
            index: 0,
            shot: Shot::new(0, 0)
        }
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        GameEvent::StateChanged {
            invite: h.invite,
            state: started(GameTurn::HomeProof)
        }
    );

    settle(&session).await;
    monitor.tick(&mut session).await.unwrap();
    assert_eq!(
        rx.try_recv().unwrap(),
        GameEvent::OutcomeRecorded {
            invite: h.invite,
            shooter: Side::Away,
            shot: Shot::new(0, 0),
            hit: true
        }
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        GameEvent::StateChanged {
            invite: h.invite,
            state: started(GameTurn::HomeShot)
        }
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(session.last_state(), Some(started(GameTurn::HomeShot)));
}

#[tokio::test(flavor = "multi_thread")]
async fn away_monitor_has_nothing_to_prove() {
    let h = harness().await;
    let away_ledger: Arc<dyn Ledger> = Arc::new(h.peers.away.clone());
    let (tx, _rx) = broadcast::channel(8);
    let monitor = ProofObligationMonitor::new(away_ledger, h.peers.prover.clone(), tx, MonitorConfig::default());
    let mut session = GameSession::new(h.invite, Side::Away);
    assert_eq!(monitor.tick(&mut session).await.unwrap(), started(GameTurn::HomeProof));
    assert!(!session.proving());
}

#[tokio::test(flavor = "multi_thread")]
async fn two_monitors_for_one_game_prove_once() {
    let h = harness().await;
    let gauged = Arc::new(GaugedProver::new(
        SimulatedProver::new("tests"),
        Duration::from_millis(400),
    ));
    let client = GameClient::new(Arc::new(h.peers.home.clone()), gauged.clone())
        .with_monitor_config(MonitorConfig {
            poll_interval: Duration::from_millis(10),
        });
    let first = client.start_monitor(h.invite).await.unwrap();
    let second = client.clone().start_monitor(h.invite).await.unwrap();

    let invite = h.invite;
    let answered = eventually(Duration::from_secs(5), || {
        let client = client.clone();
        async move { client.game_state(invite).await.unwrap() == started(GameTurn::HomeShot) }
    })
    .await;
    assert!(answered);
    first.stop().await;
    second.stop().await;

    assert_eq!(gauged.peak.load(Ordering::SeqCst), 1);
    assert_eq!(gauged.total.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn client_sessions_share_the_in_flight_latch() {
    let h = harness().await;
    let slow: Arc<dyn ProvingSystem> =
        Arc::new(SimulatedProver::new("tests").with_delay(Duration::from_millis(300)));
    let client = GameClient::new(h.ledger.clone(), slow);
    let monitor = client.monitor();
    let mut a = client.session(h.invite).await.unwrap();
    let mut b = client.session(h.invite).await.unwrap();

    monitor.tick(&mut a).await.unwrap();
    assert!(a.proving());
    assert!(b.proving());
    monitor.tick(&mut b).await.unwrap();

    settle(&a).await;
    assert_eq!(h.ledger.submissions.load(Ordering::SeqCst), 1);
    assert_eq!(b.proved_count(), 1);
    assert_eq!(monitor.tick(&mut b).await.unwrap(), started(GameTurn::HomeShot));
}
