mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use merge_control::GreedySelector;
use merge_core::{
    advance_stage, compute_metrics, Event, EventLevel, Field, MetricsFileWriter, MoveSource,
    NoMoves, SimConfig, SimState,
};
use merge_world::{
    build_initial_state, create_run_dir, generate_run_id, load_config, load_state, save_state,
    write_run_info, ConfigFile, RunInfo, Variant,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "merge_cli", about = "Merge-event stage simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play stages until the run succeeds, gridlocks or times out.
    Run {
        #[arg(long, default_value = "./content/config.json")]
        config: PathBuf,
        /// Seed for a fresh run. Mutually exclusive with --state.
        #[arg(long, conflicts_with = "state_file")]
        seed: Option<u64>,
        /// Resume from a checkpoint written by --save-state. Mutually exclusive with --seed.
        #[arg(long = "state", conflicts_with = "seed")]
        state_file: Option<PathBuf>,
        #[arg(long, default_value = "board", value_parser = ["board", "ledger"])]
        variant: String,
        #[arg(long, default_value_t = 100)]
        print_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
        /// Sample metrics every N stages.
        #[arg(long, default_value_t = 10)]
        metrics_every: u64,
        /// Disable automatic metrics collection to runs/ directory.
        #[arg(long)]
        no_metrics: bool,
        /// Stop after this many stages, even if the run is still going.
        #[arg(long)]
        stages: Option<u64>,
        /// Write a checkpoint here when the run ends or the stage limit is hit.
        #[arg(long)]
        save_state: Option<PathBuf>,
    },
}

struct RunOptions {
    config_path: PathBuf,
    seed: Option<u64>,
    state_file: Option<PathBuf>,
    variant: Variant,
    print_every: u64,
    event_level: EventLevel,
    metrics_every: u64,
    collect_metrics: bool,
    stages: Option<u64>,
    save_state: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn start_state(options: &RunOptions, config: &ConfigFile) -> Result<(SimState, ChaCha8Rng)> {
    if let Some(path) = &options.state_file {
        return load_state(path);
    }
    let seed = options.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let state = build_initial_state(config, options.variant, seed, &mut rng)?;
    Ok((state, rng))
}

/// The variant comes from the state, which may be a resumed checkpoint.
fn run_info(options: &RunOptions, state: &SimState, config: &SimConfig) -> Result<RunInfo> {
    Ok(RunInfo {
        seed: state.meta.seed,
        variant: state.field.variant().parse()?,
        target_tier: config.target_tier,
        start_stage: config.start_stage,
        max_stages: config.max_stages,
        config_path: options.config_path.display().to_string(),
        metrics_every: options.metrics_every,
        print_every: options.print_every,
    })
}

fn open_metrics(
    options: &RunOptions,
    state: &SimState,
    config: &SimConfig,
) -> Result<Option<MetricsFileWriter>> {
    if !options.collect_metrics {
        return Ok(None);
    }
    let run_id = generate_run_id(state.meta.seed);
    let run_dir = create_run_dir(Path::new("runs"), &run_id)?;
    write_run_info(&run_dir, &run_id, &run_info(options, state, config)?)?;
    let writer = MetricsFileWriter::new(run_dir.clone())
        .with_context(|| format!("opening metrics CSV in {}", run_dir.display()))?;
    println!("Run directory: {}", run_dir.display());
    Ok(Some(writer))
}

fn run(options: &RunOptions) -> Result<()> {
    let config = load_config(&options.config_path)?;
    let (mut state, mut rng) = start_state(options, &config)?;
    let mut metrics_writer = open_metrics(options, &state, &config.sim)?;

    println!(
        "Starting run: variant={} seed={} target_tier={} start_stage={} stage={}",
        state.field.variant(),
        state.meta.seed,
        config.sim.target_tier,
        config.sim.start_stage,
        state.meta.stage,
    );
    println!("{}", "-".repeat(80));

    play(
        options,
        &config.sim,
        &mut state,
        &mut rng,
        metrics_writer.as_mut(),
    )?;

    println!("{}", "-".repeat(80));
    if !state.status.is_terminal() {
        println!("Stopped at stage={} with the run still going.", state.meta.stage);
    }
    print_summary(&state);

    if let Some(ref mut writer) = metrics_writer {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }

    if let Some(path) = &options.save_state {
        save_state(path, &state, &rng)?;
        println!("State saved to {}", path.display());
    }

    Ok(())
}

/// Plays stages until the run ends or `options.stages` have been played.
fn play(
    options: &RunOptions,
    config: &SimConfig,
    state: &mut SimState,
    rng: &mut ChaCha8Rng,
    mut metrics_writer: Option<&mut MetricsFileWriter>,
) -> Result<()> {
    let mut moves: Box<dyn MoveSource> = match state.field {
        Field::Board(_) => Box::new(GreedySelector),
        Field::Ledger(_) => Box::new(NoMoves),
    };

    let mut played = 0;
    while !state.status.is_terminal() && options.stages.is_none_or(|limit| played < limit) {
        let events = advance_stage(state, config, &mut moves, rng, options.event_level)?;
        played += 1;

        for envelope in &events {
            print_event(envelope.stage, &envelope.event);
        }

        if state.meta.stage % options.print_every == 0 {
            print_status(state);
        }

        if let Some(writer) = metrics_writer.as_deref_mut() {
            if state.meta.stage % options.metrics_every == 0 || state.status.is_terminal() {
                let snapshot = compute_metrics(state);
                writer.write_row(&snapshot).context("writing metrics row")?;
            }
        }
    }
    Ok(())
}

fn print_event(stage: u64, event: &Event) {
    match event {
        Event::MilestoneReached { tier } => {
            println!("*** TIER {tier} REACHED at stage={stage} ***");
        }
        Event::BonusGranted { tier, count } => {
            println!("    bonus: {count} item(s) of tier {tier} at stage={stage}");
        }
        Event::StatusChanged { status } => {
            println!("=== run {status} at stage={stage} ===");
        }
        Event::ItemGenerated { tier, at } => match at {
            Some(pos) => println!("    [stage={stage}] tier {tier} placed at {pos}"),
            None => println!("    [stage={stage}] tier {tier} deposited"),
        },
        Event::Merged { tier, mv, count } => match mv {
            Some(mv) => println!(
                "    [stage={stage}] merged {} -> {} into tier {tier}",
                mv.source, mv.dest
            ),
            None => println!("    [stage={stage}] {count} merge(s) into tier {tier}"),
        },
    }
}

fn print_status(state: &SimState) {
    println!(
        "[stage={:05}]  energy={:3}  max_tier={:2}  items={:4}  secondary_p={:.2}",
        state.meta.stage,
        state.energy,
        state.progress.max_tier,
        state.field.item_count(),
        state.generation.secondary_probability,
    );
}

fn print_summary(state: &SimState) {
    let outcome = state.outcome();
    println!(
        "Done. status={} final_stage={} stages_played={} energy_left={}",
        outcome.status, outcome.final_stage, outcome.stages_played, outcome.energy_left
    );
    println!();
    print!("{}", render::milestone_table(&outcome.milestones));
    println!();
    print!("{}", render::field(&outcome.field));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            seed,
            state_file,
            variant,
            print_every,
            event_level,
            metrics_every,
            no_metrics,
            stages,
            save_state,
        } => {
            let event_level = match event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };
            run(&RunOptions {
                config_path: config,
                seed,
                state_file,
                variant: variant.parse()?,
                print_every: print_every.max(1),
                event_level,
                metrics_every: metrics_every.max(1),
                collect_metrics: !no_metrics,
                stages,
                save_state,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipped_config() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../content/config.json")
    }

    fn ledger_options(state_file: Option<PathBuf>, stages: Option<u64>) -> RunOptions {
        RunOptions {
            config_path: shipped_config(),
            seed: state_file.is_none().then_some(11),
            state_file,
            variant: Variant::Ledger,
            print_every: u64::MAX,
            event_level: EventLevel::Normal,
            metrics_every: 10,
            collect_metrics: false,
            stages,
            save_state: None,
        }
    }

    #[test]
    fn stage_limit_stops_a_run_early() {
        let options = ledger_options(None, Some(30));
        let config = load_config(&options.config_path).unwrap();
        let (mut state, mut rng) = start_state(&options, &config).unwrap();

        play(&options, &config.sim, &mut state, &mut rng, None).unwrap();

        assert!(!state.status.is_terminal());
        assert_eq!(state.meta.stages_played(), 30);
    }

    #[test]
    fn checkpoint_from_a_bounded_run_resumes_like_an_uninterrupted_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let full = ledger_options(None, None);
        let config = load_config(&full.config_path).unwrap();

        let (mut uninterrupted, mut rng) = start_state(&full, &config).unwrap();
        play(&full, &config.sim, &mut uninterrupted, &mut rng, None).unwrap();
        assert!(uninterrupted.status.is_terminal());

        let first_leg = ledger_options(None, Some(25));
        let (mut state, mut rng) = start_state(&first_leg, &config).unwrap();
        play(&first_leg, &config.sim, &mut state, &mut rng, None).unwrap();
        assert!(!state.status.is_terminal());
        save_state(&path, &state, &rng).unwrap();

        let second_leg = ledger_options(Some(path), None);
        let (mut resumed, mut rng) = start_state(&second_leg, &config).unwrap();
        assert_eq!(resumed, state);
        play(&second_leg, &config.sim, &mut resumed, &mut rng, None).unwrap();

        assert_eq!(resumed, uninterrupted);
    }

    #[test]
    fn run_info_records_the_checkpoint_variant_over_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let config = load_config(&shipped_config()).unwrap();
        let (state, rng) = start_state(&ledger_options(None, None), &config).unwrap();
        save_state(&path, &state, &rng).unwrap();

        let mut options = ledger_options(Some(path), None);
        options.variant = Variant::Board;
        let (resumed, _) = start_state(&options, &config).unwrap();
        let info = run_info(&options, &resumed, &config.sim).unwrap();

        assert_eq!(info.variant, Variant::Ledger);
        assert_eq!(info.seed, 11);
    }
}
