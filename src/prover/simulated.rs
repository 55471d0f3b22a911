//! A designated-verifier stand-in for the Groth16 backend.
//!
//! It checks the same statements the circuits constrain and binds the
//! commitment with BLAKE3, but a "proof" is a keyed hash over the circuit and
//! its public signals. Anyone holding the setup key can forge proofs, so it is
//! only suitable for local play and tests.

use std::time::Duration;

use crate::core::{ship_at, validate_layout, RecordId, Ship, Shot, NUM_SHIPS};
use crate::protocol::SerializedProof;

use super::{Circuit, CircuitInputs, ProofOutput, ProverError, ProvingSystem};

const COMMITMENT_DOMAIN: &[u8] = b"zk-battleships/deployment-commitment/v1";

#[derive(Debug, Clone)]
pub struct SimulatedProver {
    setup_key: [u8; 32],
    delay: Duration,
}

impl SimulatedProver {
    /// Backend whose keys are derived from `seed`. Peers that should accept
    /// each other's proofs must share the seed.
    pub fn new(seed: &str) -> Self {
        Self {
            setup_key: blake3::derive_key("zk-battleships simulated setup", seed.as_bytes()),
            delay: Duration::ZERO,
        }
    }

    /// Make every `prove` call sleep for `delay`, imitating real proving time.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn mac(&self, circuit: Circuit, public_signals: &[String]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.setup_key);
        hasher.update(circuit.name().as_bytes());
        for signal in public_signals {
            hasher.update(&(signal.len() as u64).to_le_bytes());
            hasher.update(signal.as_bytes());
        }
        hasher.finalize()
    }
}

/// Commitment to a layout, bound to the nonce and the invite.
pub fn layout_commitment(ships: &[[u64; 3]; NUM_SHIPS], nonce: &str, invite: &RecordId) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(COMMITMENT_DOMAIN);
    hasher.update(&invite.0);
    hasher.update(&(nonce.len() as u64).to_le_bytes());
    hasher.update(nonce.as_bytes());
    for ship in ships {
        for v in ship {
            hasher.update(&v.to_le_bytes());
        }
    }
    format!("0x{}", hasher.finalize().to_hex())
}

fn decode_ships(ships: &[[u64; 3]; NUM_SHIPS]) -> Result<[Ship; NUM_SHIPS], ProverError> {
    let mut out = [Ship::new(0, 0, false); NUM_SHIPS];
    for (slot, [x, y, h]) in out.iter_mut().zip(ships.iter()) {
        if *h > 1 {
            return Err(ProverError::ConstraintUnsatisfied(format!(
                "orientation flag must be 0 or 1, got {}",
                h
            )));
        }
        *slot = Ship::new(*x as usize, *y as usize, *h == 1);
    }
    Ok(out)
}

impl ProvingSystem for SimulatedProver {
    fn prove(&self, circuit: Circuit, inputs: &CircuitInputs) -> Result<ProofOutput, ProverError> {
        if inputs.circuit() != circuit {
            return Err(ProverError::CircuitMismatch {
                circuit,
                inputs: inputs.circuit(),
            });
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let public_signals = match inputs {
            CircuitInputs::Deployment { nonce, ships, invite } => {
                let layout = decode_ships(ships)?;
                validate_layout(&layout)
                    .map_err(|e| ProverError::ConstraintUnsatisfied(e.to_string()))?;
                super::deployment_signals(&layout_commitment(ships, nonce, invite), invite)
            }
            CircuitInputs::HitOrMiss {
                nonce,
                ships,
                invite,
                board_hash,
                guess,
            } => {
                let layout = decode_ships(ships)?;
                validate_layout(&layout)
                    .map_err(|e| ProverError::ConstraintUnsatisfied(e.to_string()))?;
                if layout_commitment(ships, nonce, invite) != *board_hash {
                    return Err(ProverError::ConstraintUnsatisfied(
                        "board does not match commitment".into(),
                    ));
                }
                let [x, y] = *guess;
                let hit = ship_at(&layout, x as usize, y as usize).is_some();
                super::hit_or_miss_signals(
                    hit,
                    board_hash,
                    &Shot::new(x as usize, y as usize),
                )
            }
        };
        let proof = self.mac(circuit, &public_signals).to_hex().to_string();
        Ok(ProofOutput { proof, public_signals })
    }

    fn verify(
        &self,
        circuit: Circuit,
        proof: &SerializedProof,
        public_signals: &[String],
    ) -> Result<bool, ProverError> {
        if public_signals.len() != circuit.public_signal_count() {
            return Err(ProverError::MalformedSignals(format!(
                "{} expects {} public signals, got {}",
                circuit.name(),
                circuit.public_signal_count(),
                public_signals.len()
            )));
        }
        let claimed = blake3::Hash::from_hex(proof.as_str())
            .map_err(|e| ProverError::MalformedProof(e.to_string()))?;
        Ok(claimed == self.mac(circuit, public_signals))
    }
}
