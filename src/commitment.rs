//! Commitment builder and hit/miss prover: the two places the client turns
//! its private board into public proofs.

use std::sync::Arc;

use rand::Rng;

use crate::core::{ship_at, validate_layout, RecordId, Ship, Shot, NUM_SHIPS};
use crate::protocol::{GameError, SerializedProof, ShipDeployment};
use crate::prover::{
    deployment_signals, hit_or_miss_signals, Circuit, CircuitInputs, ProofOutput, ProvingSystem,
};

/// Fresh secret nonce for one deployment. Never shared between games.
pub fn generate_salt<R: Rng>(rng: &mut R) -> String {
    rng.random::<u128>().to_string()
}

/// Run the prover on the blocking pool so the caller's task keeps running.
async fn prove_off_thread(
    prover: Arc<dyn ProvingSystem>,
    circuit: Circuit,
    inputs: CircuitInputs,
) -> Result<ProofOutput, GameError> {
    tokio::task::spawn_blocking(move || prover.prove(circuit, &inputs))
        .await
        .map_err(|e| GameError::ProvingFailed(format!("prover task failed: {}", e)))?
        .map_err(GameError::from)
}

/// Commit to `ships` under `salt` for `invite`, returning the public
/// commitment and the proof that it hides a valid layout.
///
/// The layout is checked locally first; an invalid one never reaches the
/// prover.
pub async fn commit_deployment(
    prover: Arc<dyn ProvingSystem>,
    invite: RecordId,
    ships: &[Ship; NUM_SHIPS],
    salt: &str,
) -> Result<(String, SerializedProof), GameError> {
    validate_layout(ships)?;
    let inputs = CircuitInputs::deployment(ships, salt, invite);
    let output = prove_off_thread(prover, Circuit::Deployment, inputs).await?;
    let commitment = match output.public_signals.as_slice() {
        [commitment, bound_invite] if *bound_invite == invite.to_string() => commitment.clone(),
        other => {
            return Err(GameError::ProvingFailed(format!(
                "unexpected deployment public signals: {:?}",
                other
            )))
        }
    };
    log::debug!("committed deployment for invite {}: {}", invite, commitment);
    Ok((commitment, output.proof))
}

/// Check a deployment proof against its commitment.
pub fn verify_deployment(
    prover: &dyn ProvingSystem,
    invite: &RecordId,
    commitment: &str,
    proof: &SerializedProof,
) -> Result<bool, GameError> {
    Ok(prover.verify(Circuit::Deployment, proof, &deployment_signals(commitment, invite))?)
}

/// Prove whether `shot` hits `deployment`, which must be the layout behind
/// `commitment`. Returns the hit bit and the proof. The bit the prover
/// reports must agree with the local board.
pub async fn prove_hit_or_miss(
    prover: Arc<dyn ProvingSystem>,
    deployment: &ShipDeployment,
    commitment: &str,
    shot: Shot,
) -> Result<(bool, SerializedProof), GameError> {
    let inputs = CircuitInputs::hit_or_miss(
        &deployment.ships,
        &deployment.salt,
        deployment.invite,
        commitment,
        shot,
    );
    let output = prove_off_thread(prover, Circuit::HitOrMiss, inputs).await?;
    let hit = match output.public_signals.first().map(String::as_str) {
        Some("1") => true,
        Some("0") => false,
        _ => {
            return Err(GameError::ProvingFailed(format!(
                "unexpected hit/miss public signals: {:?}",
                output.public_signals
            )))
        }
    };
    if hit != ship_at(&deployment.ships, shot.x, shot.y).is_some() {
        return Err(GameError::ProvingFailed(format!(
            "prover claims {} at ({}, {}), own board disagrees",
            if hit { "a hit" } else { "a miss" },
            shot.x,
            shot.y
        )));
    }
    if output.public_signals != hit_or_miss_signals(hit, commitment, &shot) {
        return Err(GameError::ProvingFailed(
            "hit/miss proof is bound to a different board or shot".into(),
        ));
    }
    Ok((hit, output.proof))
}

/// Check a hit/miss proof against the public statement it claims.
pub fn verify_hit_or_miss(
    prover: &dyn ProvingSystem,
    commitment: &str,
    shot: &Shot,
    hit: bool,
    proof: &SerializedProof,
) -> Result<bool, GameError> {
    Ok(prover.verify(Circuit::HitOrMiss, proof, &hit_or_miss_signals(hit, commitment, shot))?)
}
