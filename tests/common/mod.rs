#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use zk_battleships::{
    commit_deployment, prove_hit_or_miss, AgentKey, GameError, GameInvite, HitOrMissProof,
    InMemoryLedger, Ledger, ProveHitOrMissInput, ProvingSystem, Record, RecordId, Ship,
    ShipDeployment, ShipDeploymentCommitment, Shot, SimulatedProver, NUM_SHIPS,
};

pub const HOME_SALT: &str = "271828182845904523536028747135266249775";
pub const AWAY_SALT: &str = "314159265358979323846264338327950288419";

/// All five ships vertical in columns 0..=4, starting on row 0.
pub fn home_ships() -> [Ship; NUM_SHIPS] {
    [
        Ship::new(0, 0, false),
        Ship::new(1, 0, false),
        Ship::new(2, 0, false),
        Ship::new(3, 0, false),
        Ship::new(4, 0, false),
    ]
}

/// All five ships horizontal on rows 5..=9, starting in column 0.
pub fn away_ships() -> [Ship; NUM_SHIPS] {
    [
        Ship::new(0, 5, true),
        Ship::new(0, 6, true),
        Ship::new(0, 7, true),
        Ship::new(0, 8, true),
        Ship::new(0, 9, true),
    ]
}

pub fn home_key() -> AgentKey {
    AgentKey::from_seed(1)
}

pub fn away_key() -> AgentKey {
    AgentKey::from_seed(2)
}

pub fn stranger_key() -> AgentKey {
    AgentKey::from_seed(3)
}

pub fn prover() -> Arc<dyn ProvingSystem> {
    Arc::new(SimulatedProver::new("tests"))
}

pub struct Peers {
    pub home: InMemoryLedger,
    pub away: InMemoryLedger,
    pub prover: Arc<dyn ProvingSystem>,
}

pub fn peers(lag: Duration) -> Peers {
    let prover = prover();
    let home = InMemoryLedger::new(home_key(), Arc::clone(&prover)).with_replication_lag(lag);
    let away = home.join(away_key());
    Peers { home, away, prover }
}

pub async fn invite(peers: &Peers) -> RecordId {
    peers
        .home
        .create_game_invite(GameInvite {
            home_player: home_key(),
            away_player: away_key(),
        })
        .await
        .unwrap()
        .id
}

pub async fn deploy(
    ledger: &InMemoryLedger,
    prover: &Arc<dyn ProvingSystem>,
    invite: RecordId,
    ships: [Ship; NUM_SHIPS],
    salt: &str,
) -> Result<Record<ShipDeploymentCommitment>, GameError> {
    let (commitment, proof) = commit_deployment(Arc::clone(prover), invite, &ships, salt).await?;
    let deployment = ledger
        .create_ship_deployment(ShipDeployment {
            invite,
            ships,
            salt: salt.to_string(),
        })
        .await?;
    ledger
        .create_ship_deployment_proof(ShipDeploymentCommitment {
            invite,
            private_entry: deployment.id,
            commitment,
            proof,
        })
        .await
}

/// Invite plus both deployments committed.
pub async fn started_game(peers: &Peers) -> RecordId {
    let invite = invite(peers).await;
    deploy(&peers.home, &peers.prover, invite, home_ships(), HOME_SALT)
        .await
        .unwrap();
    deploy(&peers.away, &peers.prover, invite, away_ships(), AWAY_SALT)
        .await
        .unwrap();
    invite
}

/// Build an honest hit/miss proof for `shot` against `ledger`'s own board.
pub async fn honest_proof(
    ledger: &InMemoryLedger,
    prover: &Arc<dyn ProvingSystem>,
    invite: RecordId,
    shot: Shot,
) -> HitOrMissProof {
    let deployment = ledger
        .get_your_ship_deployment_for_invite(invite)
        .await
        .unwrap()
        .unwrap();
    let commitment = ledger
        .get_your_ship_deployment_proof_for_invite(invite)
        .await
        .unwrap()
        .unwrap();
    let (hit, proof) = prove_hit_or_miss(
        Arc::clone(prover),
        &deployment.entry,
        &commitment.entry.commitment,
        shot,
    )
    .await
    .unwrap();
    HitOrMissProof {
        deployment_proof: commitment.id,
        deployment_commitment: commitment.entry.commitment,
        shot,
        hit,
        proof,
    }
}

pub async fn answer(
    ledger: &InMemoryLedger,
    prover: &Arc<dyn ProvingSystem>,
    invite: RecordId,
    shot: Shot,
) -> Result<Record<HitOrMissProof>, GameError> {
    let proof = honest_proof(ledger, prover, invite, shot).await;
    ledger
        .prove_hit_or_miss(ProveHitOrMissInput {
            game_invite_hash: invite,
            hit_or_miss_proof: proof,
        })
        .await
}

/// Poll `check` every few milliseconds until it holds or `within` elapses.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
