//! Plain-text rendering of final run results.

use merge_core::{Board, Field, MilestoneRecord, TierLedger, Visibility};
use std::fmt::Write;

/// Open cells show their tier, SemiOpen cells are bracketed, Closed cells
/// hide their tier behind `#`. Empty cells render as `.`.
pub fn board(board: &Board) -> String {
    let mut out = String::new();
    for row in 0..board.rows() {
        let line: Vec<String> = board
            .row_cells(row)
            .iter()
            .map(|cell| match cell.visibility {
                Visibility::Closed => "  # ".to_string(),
                _ if cell.is_empty() => "  . ".to_string(),
                Visibility::Open => format!("{:>3} ", cell.tier),
                Visibility::SemiOpen => format!("[{:>2}]", cell.tier),
            })
            .collect();
        let _ = writeln!(out, "{}", line.join(" ").trim_end());
    }
    out
}

pub fn ledger(ledger: &TierLedger) -> String {
    let mut out = String::from("tier  count\n");
    for (index, count) in ledger.counts().iter().enumerate() {
        let _ = writeln!(out, "{:>4}  {count}", index + 1);
    }
    out
}

pub fn field(field: &Field) -> String {
    match field {
        Field::Board(b) => board(b),
        Field::Ledger(l) => ledger(l),
    }
}

pub fn milestone_table(milestones: &MilestoneRecord) -> String {
    if milestones.is_empty() {
        return "no milestones reached\n".to_string();
    }
    let mut out = String::from("tier  first stage\n");
    for (tier, stage) in milestones.iter() {
        let _ = writeln!(out, "{tier:>4}  {stage}");
    }
    out
}
