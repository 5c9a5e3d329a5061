//! `merge_core`: deterministic merge-event simulation.
//!
//! No file IO outside the metrics writer. All randomness via the passed-in Rng.

pub mod board;
mod config;
mod engine;
mod error;
pub mod generation;
pub mod ledger;
pub mod metrics;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use board::Board;
pub use config::{
    default_secondary_table, SimConfig, DEFAULT_FALLBACK_PROBABILITY, DEFAULT_MAX_STAGES,
    MIN_TARGET_TIER,
};
pub use engine::{advance_stage, run, stage_reward, MoveSource, NoMoves, SCHEMA_VERSION};
pub use error::{ConfigError, Fault, SimError};
pub use generation::GenerationState;
pub use ledger::TierLedger;
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use types::*;

#[cfg(test)]
mod tests;
