//! Type definitions for `merge_core`.
//!
//! Board coordinates, cell state, run status, milestones, events, and the
//! serializable `SimState` that fully describes a run in progress.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::generation::GenerationState;
use crate::ledger::TierLedger;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Item level. 0 marks an empty board cell; 1 is the lowest collectible.
pub type Tier = u32;

// ---------------------------------------------------------------------------
// Board primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Closed,
    SemiOpen,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub tier: Tier,
    pub visibility: Visibility,
}

impl Cell {
    pub fn open(tier: Tier) -> Self {
        Self {
            tier,
            visibility: Visibility::Open,
        }
    }

    pub fn semi_open(tier: Tier) -> Self {
        Self {
            tier,
            visibility: Visibility::SemiOpen,
        }
    }

    pub fn closed(tier: Tier) -> Self {
        Self {
            tier,
            visibility: Visibility::Closed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tier == 0
    }
}

/// Zero-based grid coordinate. Ordering is row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Merge `source` into `dest`; `dest` keeps the upgraded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub source: Position,
    pub dest: Position,
}

// ---------------------------------------------------------------------------
// Run status & progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Gridlocked,
    TimedOut,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Gridlocked => "gridlocked",
            RunStatus::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// First stage at which each tier was reached. Entries are write-once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneRecord(BTreeMap<Tier, u64>);

impl MilestoneRecord {
    /// Records `tier` at `stage` unless already present. Returns whether it was new.
    pub fn record(&mut self, tier: Tier, stage: u64) -> bool {
        if self.0.contains_key(&tier) {
            return false;
        }
        self.0.insert(tier, stage);
        true
    }

    pub fn get(&self, tier: Tier) -> Option<u64> {
        self.0.get(&tier).copied()
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.0.contains_key(&tier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates `(tier, stage)` in ascending tier order.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, u64)> + '_ {
        self.0.iter().map(|(&tier, &stage)| (tier, stage))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Highest tier ever produced in this run.
    pub max_tier: Tier,
    pub milestones: MilestoneRecord,
}

impl Progress {
    pub fn starting_at(max_tier: Tier) -> Self {
        Self {
            max_tier,
            milestones: MilestoneRecord::default(),
        }
    }

    /// Raises the maximum if `tier` exceeds it, recording a milestone.
    /// Returns whether `tier` was a new maximum.
    pub fn raise(&mut self, tier: Tier, stage: u64) -> bool {
        if tier <= self.max_tier {
            return false;
        }
        self.max_tier = tier;
        self.milestones.record(tier, stage);
        true
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub stage: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ItemGenerated {
        tier: Tier,
        /// Board cell that received the item; `None` for the ledger.
        at: Option<Position>,
    },
    Merged {
        /// Tier produced by the merge.
        tier: Tier,
        /// Board move, `None` for ledger cascades.
        mv: Option<Move>,
        count: u32,
    },
    MilestoneReached {
        tier: Tier,
    },
    BonusGranted {
        tier: Tier,
        count: u32,
    },
    StatusChanged {
        status: RunStatus,
    },
}

impl Event {
    /// Events only reported at [`EventLevel::Debug`].
    pub fn is_debug(&self) -> bool {
        matches!(self, Event::ItemGenerated { .. } | Event::Merged { .. })
    }
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// The play area: tier counts without geometry, or a spatial board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Ledger(TierLedger),
    Board(Board),
}

impl Field {
    pub fn variant(&self) -> &'static str {
        match self {
            Field::Ledger(_) => "ledger",
            Field::Board(_) => "board",
        }
    }

    pub fn item_count(&self) -> u64 {
        match self {
            Field::Ledger(ledger) => ledger.item_count(),
            Field::Board(board) => board.item_count(),
        }
    }

    /// Highest tier currently held.
    pub fn max_tier(&self) -> Tier {
        match self {
            Field::Ledger(ledger) => ledger.max_tier(),
            Field::Board(board) => board.max_tier(),
        }
    }

    pub fn has_placement_target(&self) -> bool {
        match self {
            Field::Ledger(_) => true,
            Field::Board(board) => board.has_empty_open_cell(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaState {
    pub seed: u64,
    pub start_stage: u64,
    /// Last completed stage; `start_stage - 1` before the first stage.
    pub stage: u64,
    pub schema_version: u32,
}

impl MetaState {
    pub fn stages_played(&self) -> u64 {
        (self.stage + 1).saturating_sub(self.start_stage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    pub meta: MetaState,
    pub energy: u64,
    pub field: Field,
    pub generation: GenerationState,
    pub progress: Progress,
    pub status: RunStatus,
}

/// Final report of a run that reached a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub final_stage: u64,
    pub stages_played: u64,
    pub milestones: MilestoneRecord,
    pub energy_left: u64,
    pub field: Field,
}
