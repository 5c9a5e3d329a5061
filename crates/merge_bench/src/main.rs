use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod overrides;
mod run_result;
mod runner;
mod scenario;
mod summary;

use run_result::RunRecord;

#[derive(Parser)]
#[command(
    name = "merge_bench",
    about = "Batch scenario runner for the merge-event simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file across multiple seeds.
    Run {
        /// Path to the scenario JSON file.
        #[arg(long)]
        scenario: String,
        /// Output directory (default: runs/).
        #[arg(long, default_value = "runs")]
        output_dir: String,
    },
}

fn run(scenario_path: &str, output_dir: &str) -> Result<()> {
    let scenario = scenario::load_scenario(Path::new(scenario_path))?;
    let seeds = scenario.seeds.expand();

    let mut config = merge_world::load_config(&scenario.config)?;
    overrides::apply_overrides(&mut config.sim, &scenario.overrides)?;

    println!(
        "Loading scenario '{}': {} seeds, variant={}, target_tier={}",
        scenario.name,
        seeds.len(),
        scenario.variant,
        config.sim.target_tier
    );

    let scenario_params = serde_json::json!({
        "config": scenario.config,
        "variant": scenario.variant,
        "target_tier": config.sim.target_tier,
        "start_stage": config.sim.start_stage,
        "max_stages": config.sim.max_stages,
        "overrides": scenario.overrides,
    });

    // Create timestamped output directory.
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_dir = PathBuf::from(output_dir).join(format!("{}_{}", scenario.name, timestamp));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating output directory: {}", run_dir.display()))?;
    std::fs::copy(scenario_path, run_dir.join("scenario.json")).context("copying scenario file")?;

    println!("Output: {}", run_dir.display());
    println!("Running {} seeds in parallel...", seeds.len());

    let results: Vec<Result<runner::SeedResult>> = seeds
        .par_iter()
        .map(|&seed| runner::run_seed(&config, scenario.variant, seed))
        .collect();

    let mut seed_results = Vec::new();
    for result in results {
        match result {
            Ok(seed_result) => seed_results.push(seed_result),
            Err(err) => {
                tracing::error!("{err:#}");
                eprintln!("Seed failed: {err:#}");
            }
        }
    }

    if seed_results.is_empty() {
        anyhow::bail!("all seeds failed");
    }

    let records: Vec<RunRecord> = seed_results
        .iter()
        .map(|r| RunRecord::from_outcome(r.seed, &r.run_id, &r.outcome, r.wall_time_ms))
        .collect();
    let runs_path = run_dir.join("runs.csv");
    run_result::write_runs_csv(&runs_path, &records)?;

    let stats = summary::compute_summary(&seed_results);
    summary::print_summary(&scenario.name, &stats);

    let summary_path = run_dir.join("summary.json");
    let summary_json = serde_json::to_string_pretty(&stats).context("serializing summary")?;
    std::fs::write(&summary_path, summary_json)
        .with_context(|| format!("writing {}", summary_path.display()))?;

    let run_ids: Vec<&str> = seed_results.iter().map(|r| r.run_id.as_str()).collect();
    let batch_summary = serde_json::json!({
        "batch_schema_version": 1,
        "batch_id": Uuid::new_v4().to_string(),
        "git_sha": run_result::git_sha(),
        "git_dirty": run_result::git_dirty(),
        "scenario_name": scenario.name,
        "scenario_params": scenario_params,
        "seed_count": seed_results.len(),
        "failed_seed_count": seeds.len() - seed_results.len(),
        "run_ids": run_ids,
        "status_counts": stats.status_counts,
    });
    let batch_path = run_dir.join("batch_summary.json");
    run_result::write_json_atomic(&batch_path, &batch_summary)?;

    println!("Runs written to {}", runs_path.display());
    println!("Summary written to {}", summary_path.display());
    println!("Batch summary written to {}", batch_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            scenario,
            output_dir,
        } => run(&scenario, &output_dir)?,
    }
    Ok(())
}
