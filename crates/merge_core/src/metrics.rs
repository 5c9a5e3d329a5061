//! Snapshot metrics computed from `SimState`.
//!
//! A single `compute_metrics(&SimState) -> MetricsSnapshot` function samples
//! the current state for per-stage time series. No state mutation.

use crate::{Field, SimState, Visibility};
use serde::Serialize;
use std::io::Write;

/// Current schema version. Bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub stage: u64,
    pub metrics_version: u32,
    pub stages_played: u64,
    pub energy: u64,
    pub max_tier: u32,
    pub milestones_reached: u32,
    pub item_count: u64,

    // Board occupancy (all zero for ledger runs)
    pub open_cells: u32,
    pub semi_open_cells: u32,
    pub closed_cells: u32,
    pub empty_open_cells: u32,

    // Generation
    pub secondary_probability: f64,
}

#[allow(clippy::cast_possible_truncation)] // board cell and milestone counts fit in u32
pub fn compute_metrics(state: &SimState) -> MetricsSnapshot {
    let (open_cells, semi_open_cells, closed_cells, empty_open_cells) = match &state.field {
        Field::Ledger(_) => (0, 0, 0, 0),
        Field::Board(board) => (
            board.count_visibility(Visibility::Open) as u32,
            board.count_visibility(Visibility::SemiOpen) as u32,
            board.count_visibility(Visibility::Closed) as u32,
            board.find_empty_open_cells().len() as u32,
        ),
    };

    MetricsSnapshot {
        stage: state.meta.stage,
        metrics_version: METRICS_VERSION,
        stages_played: state.meta.stages_played(),
        energy: state.energy,
        max_tier: state.progress.max_tier,
        milestones_reached: state.progress.milestones.len() as u32,
        item_count: state.field.item_count(),
        open_cells,
        semi_open_cells,
        closed_cells,
        empty_open_cells,
        secondary_probability: state.generation.secondary_probability,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "stage,metrics_version,stages_played,energy,max_tier,milestones_reached,item_count,\
         open_cells,semi_open_cells,closed_cells,empty_open_cells,\
         secondary_probability"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{:.4}",
        snapshot.stage,
        snapshot.metrics_version,
        snapshot.stages_played,
        snapshot.energy,
        snapshot.max_tier,
        snapshot.milestones_reached,
        snapshot.item_count,
        snapshot.open_cells,
        snapshot.semi_open_cells,
        snapshot.closed_cells,
        snapshot.empty_open_cells,
        snapshot.secondary_probability,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Automatically splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
