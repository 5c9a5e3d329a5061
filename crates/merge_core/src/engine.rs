use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::Board;
use crate::generation::GenerationState;
use crate::ledger::TierLedger;
use crate::{
    ConfigError, Event, EventEnvelope, EventLevel, Fault, Field, MetaState, Move, Progress,
    RunOutcome, RunStatus, SimConfig, SimError, SimState,
};

pub const SCHEMA_VERSION: u32 = 1;

/// Picks the next merge to apply on a board, or `None` when no move remains.
pub trait MoveSource {
    fn next_move(&mut self, board: &Board) -> Option<Move>;
}

impl<M: MoveSource + ?Sized> MoveSource for Box<M> {
    fn next_move(&mut self, board: &Board) -> Option<Move> {
        (**self).next_move(board)
    }
}

/// A move source that never merges. Ledger runs resolve their own cascades.
pub struct NoMoves;

impl MoveSource for NoMoves {
    fn next_move(&mut self, _board: &Board) -> Option<Move> {
        None
    }
}

/// Energy granted for completing `stage`: stages ending in 9 are super hard,
/// stages ending in 5 are hard.
pub fn stage_reward(stage: u64) -> u64 {
    match stage % 10 {
        9 => 5,
        5 => 3,
        _ => 1,
    }
}

impl SimState {
    pub fn new_ledger(config: &SimConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let ledger = TierLedger::new(config.target_tier, &config.bonuses);
        Ok(Self::fresh(config, seed, Field::Ledger(ledger), 0))
    }

    /// Starts a board run. Items already Open count as achieved; hidden
    /// items do not until they are merged into.
    pub fn new_board(config: &SimConfig, board: Board, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let achieved = board
            .iter()
            .filter(|(_, cell)| cell.visibility == crate::Visibility::Open)
            .map(|(_, cell)| cell.tier)
            .max()
            .unwrap_or(0);
        Ok(Self::fresh(config, seed, Field::Board(board), achieved))
    }

    fn fresh(config: &SimConfig, seed: u64, field: Field, achieved: crate::Tier) -> Self {
        Self {
            meta: MetaState {
                seed,
                start_stage: config.start_stage,
                stage: config.start_stage - 1,
                schema_version: SCHEMA_VERSION,
            },
            energy: 0,
            field,
            generation: GenerationState::new(achieved),
            progress: Progress::starting_at(achieved),
            status: RunStatus::Running,
        }
    }

    pub fn target_reached(&self, config: &SimConfig) -> bool {
        self.progress.max_tier >= config.target_tier
    }

    pub fn outcome(&self) -> RunOutcome {
        RunOutcome {
            status: self.status,
            final_stage: self.meta.stage,
            stages_played: self.meta.stages_played(),
            milestones: self.progress.milestones.clone(),
            energy_left: self.energy,
            field: self.field.clone(),
        }
    }
}

/// Play one stage.
///
/// Order of operations:
/// 1. Advance the stage counter and collect its energy reward.
/// 2. Drain any merge already available on the board, so a starting or
///    resumed layout can free cells before the first draw.
/// 3. Spend energy one unit at a time: draw a tier, place or deposit it, and
///    drain every merge it enables before the next draw.
/// 4. Settle the run status.
///
/// A terminal state is left untouched. Returns the events of this stage,
/// filtered by `event_level`.
pub fn advance_stage(
    state: &mut SimState,
    config: &SimConfig,
    moves: &mut impl MoveSource,
    rng: &mut impl Rng,
    event_level: EventLevel,
) -> Result<Vec<EventEnvelope>, SimError> {
    if state.status.is_terminal() {
        return Ok(Vec::new());
    }

    state.meta.stage += 1;
    let stage = state.meta.stage;
    state.energy += stage_reward(stage);

    let mut events = Vec::new();
    if let Err(fault) = spend_energy(state, config, moves, rng, &mut events) {
        tracing::error!(stage, %fault, "structural fault, aborting run");
        return Err(SimError::Structural {
            stage,
            fault,
            snapshot: Box::new(state.clone()),
        });
    }

    let status = settle_status(state, config, moves);
    if status != state.status {
        state.status = status;
        tracing::info!(
            stage,
            %status,
            stages_played = state.meta.stages_played(),
            "run finished"
        );
        events.push(Event::StatusChanged { status });
    }

    Ok(events
        .into_iter()
        .filter(|event| event_level == EventLevel::Debug || !event.is_debug())
        .map(|event| EventEnvelope { stage, event })
        .collect())
}

/// Play stages until the run reaches a terminal status.
pub fn run(
    state: &mut SimState,
    config: &SimConfig,
    moves: &mut impl MoveSource,
    rng: &mut impl Rng,
) -> Result<RunOutcome, SimError> {
    while !state.status.is_terminal() {
        advance_stage(state, config, moves, rng, EventLevel::Normal)?;
    }
    Ok(state.outcome())
}

fn spend_energy(
    state: &mut SimState,
    config: &SimConfig,
    moves: &mut impl MoveSource,
    rng: &mut impl Rng,
    events: &mut Vec<Event>,
) -> Result<(), Fault> {
    let stage = state.meta.stage;
    if let Field::Board(board) = &mut state.field {
        drain_moves(board, moves, stage, &mut state.progress, events)?;
        state.generation.observe(state.progress.max_tier, config);
    }

    while state.energy > 0 && !state.target_reached(config) && state.field.has_placement_target()
    {
        state.energy -= 1;
        let tier = state.generation.next_tier(config, rng);
        receive_item(state, tier, moves, rng, events)?;
        state.generation.observe(state.progress.max_tier, config);
    }
    Ok(())
}

fn receive_item(
    state: &mut SimState,
    tier: crate::Tier,
    moves: &mut impl MoveSource,
    rng: &mut impl Rng,
    events: &mut Vec<Event>,
) -> Result<(), Fault> {
    let stage = state.meta.stage;
    match &mut state.field {
        Field::Ledger(ledger) => {
            events.push(Event::ItemGenerated { tier, at: None });
            ledger.deposit(tier, stage, &mut state.progress, events)
        }
        Field::Board(board) => {
            let targets = board.find_empty_open_cells();
            let Some(&at) = targets.choose(rng) else {
                return Ok(());
            };
            board.place(at, tier)?;
            events.push(Event::ItemGenerated { tier, at: Some(at) });
            drain_moves(board, moves, stage, &mut state.progress, events)
        }
    }
}

/// Applies moves until the source has none left.
fn drain_moves(
    board: &mut Board,
    moves: &mut impl MoveSource,
    stage: u64,
    progress: &mut Progress,
    events: &mut Vec<Event>,
) -> Result<(), Fault> {
    while let Some(mv) = moves.next_move(board) {
        let produced = board.merge(mv)?;
        events.push(Event::Merged {
            tier: produced,
            mv: Some(mv),
            count: 1,
        });
        if progress.raise(produced, stage) {
            tracing::debug!(tier = produced, stage, "board reached new tier");
            events.push(Event::MilestoneReached { tier: produced });
        }
    }
    Ok(())
}

/// Gridlock needs unspent energy, no placement target and no legal move.
fn settle_status(state: &SimState, config: &SimConfig, moves: &mut impl MoveSource) -> RunStatus {
    if state.target_reached(config) {
        RunStatus::Success
    } else if state.energy > 0
        && !state.field.has_placement_target()
        && !has_legal_move(&state.field, moves)
    {
        RunStatus::Gridlocked
    } else if state.meta.stages_played() >= config.max_stages {
        RunStatus::TimedOut
    } else {
        RunStatus::Running
    }
}

fn has_legal_move(field: &Field, moves: &mut impl MoveSource) -> bool {
    match field {
        Field::Ledger(_) => false,
        Field::Board(board) => moves.next_move(board).is_some(),
    }
}
