//! Error taxonomy for `merge_core`.
//!
//! Configuration problems are rejected before any state exists. Structural
//! faults abort a run in progress and carry the state at the point of failure.
//! Gridlock and timeout are not errors; see [`crate::RunStatus`].

use thiserror::Error;

use crate::{Position, SimState, Tier};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("target tier must be at least {min}, got {found}")]
    TargetTierTooLow { min: Tier, found: Tier },

    #[error("start stage must be at least 1")]
    StartStageZero,

    #[error("max_stages must be at least 1")]
    MaxStagesZero,

    #[error("secondary probability for tier {tier} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { tier: Tier, value: f64 },

    #[error("fallback secondary probability must be within [0, 1], got {0}")]
    FallbackProbabilityOutOfRange(f64),

    #[error("bonus tier {tier} is outside 1..={target}")]
    BonusTierOutOfRange { tier: Tier, target: Tier },

    #[error("board layout must have at least one row and one column")]
    EmptyBoard,

    #[error("board row {row} has {found} cells, expected {expected}")]
    RaggedBoard {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid board generation spec: {0}")]
    InvalidBoardSpec(String),

    #[error("`board` and `generate_board` cannot both be set")]
    ConflictingBoardSources,
}

/// A structural invariant violation raised by a board or ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("cell {0} is outside the board")]
    OutOfBounds(Position),

    #[error("cell {0} is not open")]
    NotOpen(Position),

    #[error("cell {pos} already holds tier {tier}")]
    Occupied { pos: Position, tier: Tier },

    #[error("cannot place an empty item at {0}")]
    EmptyItem(Position),

    #[error("cell {0} holds no item to merge")]
    EmptyCell(Position),

    #[error("merge source and destination are the same cell {0}")]
    SameCell(Position),

    #[error("cannot merge tier {from_tier} at {from} into tier {to_tier} at {to}")]
    TierMismatch {
        from: Position,
        from_tier: Tier,
        to: Position,
        to_tier: Tier,
    },

    #[error("cannot merge {from} into {to}: source must be open and destination visible")]
    NotMergeable { from: Position, to: Position },

    #[error("merging into {0} would exceed the highest representable tier")]
    TierOverflow(Position),

    #[error("tier {tier} is outside the ledger range 1..={capacity}")]
    TierOutOfRange { tier: Tier, capacity: Tier },
}

#[derive(Debug, Error)]
pub enum SimError {
    /// The run was aborted; `snapshot` is the full state when the fault fired.
    #[error("structural fault at stage {stage}: {fault}")]
    Structural {
        stage: u64,
        fault: Fault,
        snapshot: Box<SimState>,
    },
}
