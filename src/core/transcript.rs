//! The replicated shot/outcome log every game state is derived from.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use super::common::{RecordId, Side};

/// A single fired coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shot {
    pub x: usize,
    pub y: usize,
}

impl Shot {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Answer to one opponent shot, pointing at the proof record backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotOutcome {
    pub proof_hash: RecordId,
    pub hit: bool,
}

/// Sequence lengths of a transcript, in turn order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLengths {
    pub away_shots: usize,
    pub home_outcomes: usize,
    pub home_shots: usize,
    pub away_outcomes: usize,
}

impl TranscriptLengths {
    pub fn shots(&self, side: Side) -> usize {
        match side {
            Side::Home => self.home_shots,
            Side::Away => self.away_shots,
        }
    }

    pub fn outcomes(&self, side: Side) -> usize {
        match side {
            Side::Home => self.home_outcomes,
            Side::Away => self.away_outcomes,
        }
    }

    /// Total number of facts appended so far.
    pub fn total(&self) -> usize {
        self.away_shots + self.home_outcomes + self.home_shots + self.away_outcomes
    }
}

/// Append-only history of a game.
///
/// `home_player_hit_or_miss_proofs[i]` answers `away_player_shots[i]` and
/// `away_player_hit_or_miss_proofs[i]` answers `home_player_shots[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTranscript {
    pub invite: RecordId,
    pub home_player_deployment_proof: RecordId,
    pub away_player_deployment_proof: RecordId,
    pub home_player_shots: Vec<Shot>,
    pub away_player_shots: Vec<Shot>,
    pub home_player_hit_or_miss_proofs: Vec<ShotOutcome>,
    pub away_player_hit_or_miss_proofs: Vec<ShotOutcome>,
}

impl GameTranscript {
    /// An empty transcript for an invite whose two deployments are committed.
    pub fn new(invite: RecordId, home_deployment_proof: RecordId, away_deployment_proof: RecordId) -> Self {
        Self {
            invite,
            home_player_deployment_proof: home_deployment_proof,
            away_player_deployment_proof: away_deployment_proof,
            home_player_shots: Vec::new(),
            away_player_shots: Vec::new(),
            home_player_hit_or_miss_proofs: Vec::new(),
            away_player_hit_or_miss_proofs: Vec::new(),
        }
    }

    pub fn lengths(&self) -> TranscriptLengths {
        TranscriptLengths {
            away_shots: self.away_player_shots.len(),
            home_outcomes: self.home_player_hit_or_miss_proofs.len(),
            home_shots: self.home_player_shots.len(),
            away_outcomes: self.away_player_hit_or_miss_proofs.len(),
        }
    }

    /// Shots fired by `side`.
    pub fn shots(&self, side: Side) -> &[Shot] {
        match side {
            Side::Home => &self.home_player_shots,
            Side::Away => &self.away_player_shots,
        }
    }

    /// Outcomes produced by `side`, answering the opponent's shots.
    pub fn outcomes(&self, side: Side) -> &[ShotOutcome] {
        match side {
            Side::Home => &self.home_player_hit_or_miss_proofs,
            Side::Away => &self.away_player_hit_or_miss_proofs,
        }
    }

    pub fn deployment_proof(&self, side: Side) -> &RecordId {
        match side {
            Side::Home => &self.home_player_deployment_proof,
            Side::Away => &self.away_player_deployment_proof,
        }
    }

    pub fn shots_mut(&mut self, side: Side) -> &mut Vec<Shot> {
        match side {
            Side::Home => &mut self.home_player_shots,
            Side::Away => &mut self.away_player_shots,
        }
    }

    pub fn outcomes_mut(&mut self, side: Side) -> &mut Vec<ShotOutcome> {
        match side {
            Side::Home => &mut self.home_player_hit_or_miss_proofs,
            Side::Away => &mut self.away_player_hit_or_miss_proofs,
        }
    }

    /// The oldest shot fired at `side` that `side` has not answered yet.
    pub fn unanswered_shot_against(&self, side: Side) -> Option<(usize, Shot)> {
        let index = self.outcomes(side).len();
        self.shots(side.opponent()).get(index).map(|shot| (index, *shot))
    }

    pub fn has_targeted(&self, shooter: Side, shot: &Shot) -> bool {
        self.shots(shooter).contains(shot)
    }

    /// Hits `shooter` has landed, as answered by the opponent.
    pub fn hits_landed(&self, shooter: Side) -> usize {
        self.outcomes(shooter.opponent()).iter().filter(|o| o.hit).count()
    }

    /// Each side's outcomes trail the opponent's shots by zero or one.
    pub fn outcome_lag_holds(&self) -> bool {
        [Side::Home, Side::Away].iter().all(|&side| {
            let shots = self.shots(side.opponent()).len();
            let outcomes = self.outcomes(side).len();
            outcomes <= shots && shots - outcomes <= 1
        })
    }

    /// Pairs each shot fired by `shooter` with its outcome, if answered.
    pub fn shots_with_outcomes(&self, shooter: Side) -> impl Iterator<Item = (Shot, Option<bool>)> + '_ {
        let outcomes = self.outcomes(shooter.opponent());
        self.shots(shooter)
            .iter()
            .enumerate()
            .map(move |(i, shot)| (*shot, outcomes.get(i).map(|o| o.hit)))
    }
}
