#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod core;

#[cfg(feature = "std")]
pub mod commitment;
#[cfg(feature = "std")]
pub mod ledger;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
pub mod monitor;
#[cfg(feature = "std")]
pub mod orchestrator;
#[cfg(feature = "std")]
pub mod protocol;
#[cfg(feature = "std")]
pub mod prover;
#[cfg(feature = "std")]
pub mod simulation;

pub use crate::core::*;

#[cfg(feature = "std")]
pub use commitment::{commit_deployment, generate_salt, prove_hit_or_miss, verify_deployment, verify_hit_or_miss};
#[cfg(feature = "std")]
pub use ledger::{InMemoryLedger, Ledger};
#[cfg(feature = "std")]
pub use logging::{init_logging, LOG_ENV};
#[cfg(feature = "std")]
pub use monitor::{GameEvent, GameSession, MonitorConfig, ProofObligationMonitor};
#[cfg(feature = "std")]
pub use orchestrator::{BoardViews, GameClient, MonitorHandle};
#[cfg(feature = "std")]
pub use protocol::*;
#[cfg(feature = "std")]
pub use prover::{Circuit, CircuitInputs, ProofOutput, ProverError, ProvingSystem, SimulatedProver};
