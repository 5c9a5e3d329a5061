use anyhow::{Context, Result};
use merge_control::GreedySelector;
use merge_core::{run, Field, MoveSource, NoMoves, RunOutcome};
use merge_world::{build_initial_state, ConfigFile, Variant};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use uuid::Uuid;

pub struct SeedResult {
    pub seed: u64,
    pub run_id: String,
    pub outcome: RunOutcome,
    pub wall_time_ms: u64,
}

/// Plays one seed to a terminal status. Each seed owns its state and RNG,
/// so seeds can run on any thread.
pub fn run_seed(config: &ConfigFile, variant: Variant, seed: u64) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = build_initial_state(config, variant, seed, &mut rng)
        .with_context(|| format!("building initial state for seed {seed}"))?;
    let mut moves: Box<dyn MoveSource> = match state.field {
        Field::Board(_) => Box::new(GreedySelector),
        Field::Ledger(_) => Box::new(NoMoves),
    };
    let outcome = run(&mut state, &config.sim, &mut moves, &mut rng)
        .with_context(|| format!("seed {seed} aborted"))?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    tracing::debug!(seed, status = %outcome.status, final_stage = outcome.final_stage, "seed finished");

    Ok(SeedResult {
        seed,
        run_id,
        outcome,
        wall_time_ms,
    })
}
