//! Integrity rules the substrate applies before accepting a fact.
//!
//! These are plain functions over records so that any `Ledger` backend can
//! run them. They never look at replication state, only at what they are
//! handed.

use crate::commitment::{verify_deployment, verify_hit_or_miss};
use crate::core::{
    shot_is_on_board, validate_layout, AgentKey, GameInvite, GameState, GameTranscript, RecordId,
    Shot, ShotOutcome, Side,
};
use crate::protocol::{GameError, HitOrMissProof, Record, ShipDeployment, ShipDeploymentCommitment};
use crate::prover::ProvingSystem;

/// The single fact a transcript update appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Shot { side: Side, shot: Shot },
    Outcome { side: Side, outcome: ShotOutcome },
}

fn reject(reason: &str) -> GameError {
    GameError::Rejected(reason.to_string())
}

pub fn side_of(invite: &GameInvite, agent: &AgentKey) -> Result<Side, GameError> {
    invite.role_of(agent).side().ok_or(GameError::NotAParticipant)
}

pub fn check_invite(author: &AgentKey, invite: &GameInvite) -> Result<(), GameError> {
    if invite.home_player != *author {
        return Err(reject("only the home player can create an invite"));
    }
    if invite.away_player == invite.home_player {
        return Err(reject("home and away player must differ"));
    }
    Ok(())
}

pub fn check_deployment(
    author: &AgentKey,
    invite: &Record<GameInvite>,
    deployment: &ShipDeployment,
) -> Result<Side, GameError> {
    if deployment.invite != invite.id {
        return Err(reject("deployment names a different invite"));
    }
    let side = side_of(&invite.entry, author)?;
    validate_layout(&deployment.ships)?;
    Ok(side)
}

/// A commitment must point at the author's own deployment for the same
/// invite and carry a proof that verifies for `[commitment, invite]`.
pub fn check_deployment_commitment(
    author: &AgentKey,
    invite: &Record<GameInvite>,
    private_entry: &Record<ShipDeployment>,
    commitment: &ShipDeploymentCommitment,
    verifier: &dyn ProvingSystem,
) -> Result<Side, GameError> {
    let side = side_of(&invite.entry, author)?;
    if private_entry.author != *author || private_entry.id != commitment.private_entry {
        return Err(reject("commitment must reference the author's own deployment"));
    }
    if commitment.invite != invite.id || private_entry.entry.invite != invite.id {
        return Err(reject("commitment and deployment name different invites"));
    }
    let verified = verify_deployment(verifier, &invite.id, &commitment.commitment, &commitment.proof);
    if !matches!(verified, Ok(true)) {
        return Err(GameError::ProofVerificationFailed);
    }
    Ok(side)
}

pub fn check_shot(
    state: GameState,
    side: Side,
    transcript: Option<&GameTranscript>,
    shot: &Shot,
) -> Result<(), GameError> {
    if !state.can_fire(side) {
        return Err(GameError::OutOfTurn { state });
    }
    if !shot_is_on_board(shot) {
        return Err(GameError::ShotOutOfBounds { x: shot.x, y: shot.y });
    }
    if transcript.is_some_and(|t| t.has_targeted(side, shot)) {
        return Err(GameError::DuplicateShot { x: shot.x, y: shot.y });
    }
    Ok(())
}

/// Checks a hit/miss proof submitted by `side` and returns the index of the
/// shot it answers.
pub fn check_outcome(
    state: GameState,
    side: Side,
    transcript: &GameTranscript,
    own_commitment: &Record<ShipDeploymentCommitment>,
    proof: &HitOrMissProof,
    verifier: &dyn ProvingSystem,
) -> Result<usize, GameError> {
    if !state.owes_proof(side) {
        return Err(GameError::OutOfTurn { state });
    }
    let expected = transcript.unanswered_shot_against(side);
    let submitted = transcript
        .shots(side.opponent())
        .iter()
        .position(|shot| *shot == proof.shot)
        .ok_or_else(|| reject("proof answers a shot that was never fired"))?;
    match expected {
        Some((index, _)) if index == submitted => {}
        _ => {
            return Err(GameError::StaleObligation {
                expected: expected.map(|(index, _)| index),
                submitted,
            })
        }
    }
    if own_commitment.id != *transcript.deployment_proof(side)
        || proof.deployment_proof != own_commitment.id
    {
        return Err(reject("proof must reference the prover's deployment in this game"));
    }
    if proof.deployment_commitment != own_commitment.entry.commitment {
        return Err(reject("proof is against a different commitment"));
    }
    let verified = verify_hit_or_miss(
        verifier,
        &proof.deployment_commitment,
        &proof.shot,
        proof.hit,
        &proof.proof,
    );
    if !matches!(verified, Ok(true)) {
        return Err(GameError::ProofVerificationFailed);
    }
    Ok(submitted)
}

/// A new transcript holds exactly the opening away shot and references both
/// players' commitments.
pub fn check_transcript_creation(
    author: Side,
    transcript: &GameTranscript,
    invite: &RecordId,
    home_commitment: &RecordId,
    away_commitment: &RecordId,
) -> Result<(), GameError> {
    if author != Side::Away {
        return Err(reject("only the away player opens the transcript"));
    }
    if transcript.invite != *invite
        || transcript.home_player_deployment_proof != *home_commitment
        || transcript.away_player_deployment_proof != *away_commitment
    {
        return Err(reject("transcript must reference this game's commitments"));
    }
    match transcript.away_player_shots.as_slice() {
        [shot] if transcript.lengths().total() == 1 => {
            if !shot_is_on_board(shot) {
                return Err(GameError::ShotOutOfBounds { x: shot.x, y: shot.y });
            }
            Ok(())
        }
        _ => Err(reject("a new transcript holds exactly one away shot")),
    }
}

fn appended_one<T: PartialEq + Copy>(prev: &[T], next: &[T]) -> Result<Option<T>, GameError> {
    if next.len() == prev.len() && next == prev {
        return Ok(None);
    }
    match next.split_last() {
        Some((last, head)) if head == prev => Ok(Some(*last)),
        _ => Err(reject("transcript history was rewritten")),
    }
}

/// The single fact `next` appends to `prev`.
pub fn diff_transcripts(prev: &GameTranscript, next: &GameTranscript) -> Result<Appended, GameError> {
    if prev.invite != next.invite
        || prev.home_player_deployment_proof != next.home_player_deployment_proof
        || prev.away_player_deployment_proof != next.away_player_deployment_proof
    {
        return Err(reject("transcript header changed"));
    }
    let mut appended = Vec::new();
    for side in [Side::Home, Side::Away] {
        if let Some(shot) = appended_one(prev.shots(side), next.shots(side))? {
            appended.push(Appended::Shot { side, shot });
        }
        if let Some(outcome) = appended_one(prev.outcomes(side), next.outcomes(side))? {
            appended.push(Appended::Outcome { side, outcome });
        }
    }
    match appended.as_slice() {
        [one] => Ok(*one),
        [] => Err(reject("transcript update appends nothing")),
        _ => Err(reject("transcript update appends more than one fact")),
    }
}

/// Validate `next` as `author`'s update of `prev`. `lookup_proof` resolves
/// the proof record an appended outcome points at.
pub fn check_transcript_update<F>(
    author: Side,
    state: GameState,
    prev: &GameTranscript,
    next: &GameTranscript,
    invite: &GameInvite,
    lookup_proof: F,
) -> Result<Appended, GameError>
where
    F: Fn(&RecordId) -> Option<Record<HitOrMissProof>>,
{
    let appended = diff_transcripts(prev, next)?;
    match appended {
        Appended::Shot { side, shot } => {
            if side != author {
                return Err(reject("players may only append their own shots"));
            }
            check_shot(state, side, Some(prev), &shot)?;
        }
        Appended::Outcome { side, outcome } => {
            if side != author || !state.owes_proof(side) {
                return Err(GameError::OutOfTurn { state });
            }
            let proof = lookup_proof(&outcome.proof_hash)
                .ok_or(GameError::NotFound("hit/miss proof"))?;
            let (_, shot) = prev
                .unanswered_shot_against(side)
                .ok_or(GameError::CorruptTranscript)?;
            if proof.author != *invite.player(side)
                || proof.entry.deployment_proof != *prev.deployment_proof(side)
                || proof.entry.shot != shot
                || proof.entry.hit != outcome.hit
            {
                return Err(reject("outcome does not match its proof"));
            }
        }
    }
    Ok(appended)
}
