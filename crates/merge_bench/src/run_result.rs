use anyhow::{Context, Result};
use merge_core::RunOutcome;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One row of `runs.csv`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub seed: u64,
    pub run_id: String,
    pub status: &'static str,
    pub final_stage: u64,
    pub stages_played: u64,
    pub energy_left: u64,
    pub max_tier: u32,
    pub milestones_reached: usize,
    pub item_count: u64,
    pub wall_time_ms: u64,
}

impl RunRecord {
    pub fn from_outcome(seed: u64, run_id: &str, outcome: &RunOutcome, wall_time_ms: u64) -> Self {
        Self {
            seed,
            run_id: run_id.to_string(),
            status: outcome.status.label(),
            final_stage: outcome.final_stage,
            stages_played: outcome.stages_played,
            energy_left: outcome.energy_left,
            max_tier: outcome.field.max_tier(),
            milestones_reached: outcome.milestones.len(),
            item_count: outcome.field.item_count(),
            wall_time_ms,
        }
    }
}

pub fn write_runs_csv(path: &Path, records: &[RunRecord]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("writing row for seed {}", record.seed))?;
    }
    writer.flush().context("flushing runs.csv")?;
    Ok(())
}

/// Write JSON atomically: write to `.tmp` then rename.
pub fn write_json_atomic(path: &Path, value: &impl Serialize) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value).context("serializing JSON")?;
    let mut file = std::fs::File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("writing {}", tmp_path.display()))?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming to {}", path.display()))?;
    Ok(())
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}
