//! Shared test fixtures for merge_core and downstream crates.
//!
//! `base_config()` clears the secondary probability table and caps runs at
//! 1000 stages. With a target of 5 or below only primary items are ever
//! generated. `FirstPairMoves` is a minimal move source that merges the first
//! two Open items of equal tier in row-major order.

use crate::{Board, Cell, Move, MoveSource, Position, SimConfig, SimState, Tier, Visibility};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Target `target_tier`, start stage 1, empty probability table, no bonuses.
pub fn base_config(target_tier: Tier) -> SimConfig {
    SimConfig {
        target_tier,
        start_stage: 1,
        max_stages: 1_000,
        secondary_probabilities: BTreeMap::new(),
        fallback_secondary_probability: 0.3,
        bonuses: BTreeMap::new(),
    }
}

pub fn open_board(rows: usize, cols: usize) -> Board {
    Board::open(rows, cols).expect("non-empty board dimensions")
}

/// Builds a board from a compact layout: each cell is `<tier><o|s|c>`,
/// e.g. `["0o 1s", "2c 0o"]`.
pub fn board_from_layout(rows: &[&str]) -> Board {
    let cells = rows
        .iter()
        .map(|row| {
            row.split_whitespace()
                .map(|token| {
                    let (tier, vis) = token.split_at(token.len() - 1);
                    let tier: Tier = tier.parse().expect("numeric tier");
                    match vis {
                        "o" => Cell::open(tier),
                        "s" => Cell::semi_open(tier),
                        "c" => Cell::closed(tier),
                        other => panic!("unknown visibility marker {other}"),
                    }
                })
                .collect()
        })
        .collect();
    Board::from_rows(cells).expect("rectangular layout")
}

pub fn board_state(config: &SimConfig, board: Board) -> SimState {
    SimState::new_board(config, board, 0).expect("valid test config")
}

pub fn ledger_state(config: &SimConfig) -> SimState {
    SimState::new_ledger(config, 0).expect("valid test config")
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// Merges the first two Open items of equal tier, later one into earlier one.
pub struct FirstPairMoves;

impl MoveSource for FirstPairMoves {
    fn next_move(&mut self, board: &Board) -> Option<Move> {
        let open: Vec<(Position, Tier)> = board
            .iter()
            .filter(|(_, cell)| !cell.is_empty() && cell.visibility == Visibility::Open)
            .map(|(pos, cell)| (pos, cell.tier))
            .collect();
        open.iter().enumerate().find_map(|(i, &(dest, tier))| {
            open[i + 1..]
                .iter()
                .find(|&&(_, other)| other == tier)
                .map(|&(source, _)| Move { source, dest })
        })
    }
}
