//! Config loading, board construction and checkpoint files shared between
//! merge_cli and merge_bench.

mod board_gen;

pub use board_gen::{generate_board, BoardGenSpec};

use anyhow::{bail, Context, Result};
use merge_core::{
    default_secondary_table, Board, ConfigError, SimConfig, SimState, Tier,
    DEFAULT_FALLBACK_PROBABILITY, DEFAULT_MAX_STAGES,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Which field a run plays on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Board,
    Ledger,
}

impl std::str::FromStr for Variant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "board" => Ok(Self::Board),
            "ledger" => Ok(Self::Ledger),
            other => bail!("unknown variant '{other}', expected 'board' or 'ledger'"),
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Board => "board",
            Self::Ledger => "ledger",
        })
    }
}

/// Where the starting board comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardSource {
    Layout(Board),
    Generated(BoardGenSpec),
}

/// A parsed config file: run parameters plus the starting board.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub sim: SimConfig,
    pub board: BoardSource,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfigFile {
    target_tier: Tier,
    #[serde(default = "default_start_stage")]
    start_stage: u64,
    #[serde(default = "default_max_stages")]
    max_stages: u64,
    secondary_probabilities: Option<BTreeMap<Tier, f64>>,
    #[serde(default = "default_fallback_probability")]
    fallback_secondary_probability: f64,
    #[serde(default)]
    bonuses: BTreeMap<Tier, u32>,
    board: Option<Board>,
    generate_board: Option<BoardGenSpec>,
}

fn default_start_stage() -> u64 {
    1
}

fn default_max_stages() -> u64 {
    DEFAULT_MAX_STAGES
}

fn default_fallback_probability() -> f64 {
    DEFAULT_FALLBACK_PROBABILITY
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self, ConfigError> {
        let board = match (raw.board, raw.generate_board) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingBoardSources),
            (Some(layout), None) => BoardSource::Layout(layout),
            (None, Some(spec)) => {
                spec.validate()?;
                BoardSource::Generated(spec)
            }
            (None, None) => BoardSource::Generated(BoardGenSpec::default()),
        };
        let sim = SimConfig {
            target_tier: raw.target_tier,
            start_stage: raw.start_stage,
            max_stages: raw.max_stages,
            secondary_probabilities: raw
                .secondary_probabilities
                .unwrap_or_else(|| default_secondary_table(raw.target_tier)),
            fallback_secondary_probability: raw.fallback_secondary_probability,
            bonuses: raw.bonuses,
        };
        sim.validate()?;
        Ok(Self { sim, board })
    }
}

/// Parses and validates a config from JSON text.
pub fn parse_config(json: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = serde_json::from_str(json).context("parsing config JSON")?;
    let config = ConfigFile::try_from(raw).context("validating config")?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    let config = parse_config(&json).with_context(|| format!("loading {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        target_tier = config.sim.target_tier,
        start_stage = config.sim.start_stage,
        "loaded config"
    );
    Ok(config)
}

/// Builds the starting state for `variant`. Generated boards draw their
/// hidden tiers from `rng`, so the same seed gives the same board.
pub fn build_initial_state(
    config: &ConfigFile,
    variant: Variant,
    seed: u64,
    rng: &mut impl Rng,
) -> Result<SimState> {
    let state = match variant {
        Variant::Ledger => SimState::new_ledger(&config.sim, seed)?,
        Variant::Board => {
            let board = match &config.board {
                BoardSource::Layout(board) => board.clone(),
                BoardSource::Generated(spec) => generate_board(spec, rng)?,
            };
            SimState::new_board(&config.sim, board, seed)?
        }
    };
    Ok(state)
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

/// A saved run: the state plus how far its RNG stream has advanced.
#[derive(Serialize, Deserialize)]
struct Checkpoint {
    rng_word_pos: u128,
    state: SimState,
}

/// Writes `state` and the position of `rng` as pretty JSON, atomically:
/// write to `.tmp` then rename.
pub fn save_state(path: &Path, state: &SimState, rng: &ChaCha8Rng) -> Result<()> {
    let checkpoint = Checkpoint {
        rng_word_pos: rng.get_word_pos(),
        state: state.clone(),
    };
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(&checkpoint).context("serializing checkpoint")?;
    let mut file = std::fs::File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    file.write_all(json.as_bytes())
        .context("writing checkpoint")?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming checkpoint to {}", path.display()))?;
    Ok(())
}

/// Reads a checkpoint back. The returned RNG is re-seeded from the state's
/// seed and fast-forwarded, so a run started with
/// `ChaCha8Rng::seed_from_u64(seed)` continues exactly where it stopped.
pub fn load_state(path: &Path) -> Result<(SimState, ChaCha8Rng)> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading state file: {}", path.display()))?;
    let checkpoint: Checkpoint = serde_json::from_str(&json)
        .with_context(|| format!("parsing state file: {}", path.display()))?;
    let mut rng = ChaCha8Rng::seed_from_u64(checkpoint.state.meta.seed);
    rng.set_word_pos(checkpoint.rng_word_pos);
    tracing::debug!(
        path = %path.display(),
        stage = checkpoint.state.meta.stage,
        "loaded checkpoint"
    );
    Ok((checkpoint.state, rng))
}

// ---------------------------------------------------------------------------
// Run directories
// ---------------------------------------------------------------------------

pub fn generate_run_id(seed: u64) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("{timestamp}_seed{seed}")
}

pub fn create_run_dir(root: &Path, run_id: &str) -> Result<PathBuf> {
    let dir = root.join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

/// Writes `run_info.json` describing a CLI run.
pub fn write_run_info(dir: &Path, run_id: &str, info: &RunInfo) -> Result<()> {
    let value = serde_json::json!({
        "run_id": run_id,
        "seed": info.seed,
        "start_time": run_id.split('_').take(2).collect::<Vec<_>>().join("_"),
        "variant": info.variant,
        "target_tier": info.target_tier,
        "start_stage": info.start_stage,
        "max_stages": info.max_stages,
        "metrics_every": info.metrics_every,
        "runner": "merge_cli",
        "args": {
            "config": info.config_path,
            "print_every": info.print_every,
        }
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &value)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RunInfo {
    pub seed: u64,
    pub variant: Variant,
    pub target_tier: Tier,
    pub start_stage: u64,
    pub max_stages: u64,
    pub config_path: String,
    pub metrics_every: u64,
    pub print_every: u64,
}
