use std::collections::BTreeMap;

use merge_core::{Board, Move, MoveSource, Position, Tier, Visibility};

/// Drives board runs with a greedy two-priority heuristic:
/// 1. Unlock: merge an Open item into a SemiOpen item of the same tier,
///    revealing as much Closed territory as possible.
/// 2. Consolidate: merge two Open items of the highest shared tier.
pub struct GreedySelector;

impl MoveSource for GreedySelector {
    fn next_move(&mut self, board: &Board) -> Option<Move> {
        let mv = find_best_move(board);
        if let Some(mv) = mv {
            tracing::trace!(source = %mv.source, dest = %mv.dest, "selected move");
        }
        mv
    }
}

/// Occupied Open and SemiOpen cells of one tier, each list row-major.
#[derive(Default)]
struct TierGroup {
    open: Vec<Position>,
    semi_open: Vec<Position>,
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn group_by_tier(board: &Board) -> BTreeMap<Tier, TierGroup> {
    let mut groups: BTreeMap<Tier, TierGroup> = BTreeMap::new();
    for (pos, cell) in board.iter() {
        if cell.is_empty() {
            continue;
        }
        match cell.visibility {
            Visibility::Open => groups.entry(cell.tier).or_default().open.push(pos),
            Visibility::SemiOpen => groups.entry(cell.tier).or_default().semi_open.push(pos),
            Visibility::Closed => {}
        }
    }
    groups
}

/// The candidate with the most Closed neighbors. Candidates arrive
/// row-major, so the first maximum wins ties.
fn most_revealing(board: &Board, candidates: &[Position]) -> Option<Position> {
    let mut best: Option<(Position, usize)> = None;
    for &pos in candidates {
        let closed = board.closed_neighbor_count(pos);
        if best.is_none_or(|(_, most)| closed > most) {
            best = Some((pos, closed));
        }
    }
    best.map(|(pos, _)| pos)
}

/// Priority 1: highest tier with both an Open and a SemiOpen item.
fn unlock_move(board: &Board, groups: &BTreeMap<Tier, TierGroup>) -> Option<Move> {
    let group = groups
        .values()
        .rev()
        .find(|g| !g.open.is_empty() && !g.semi_open.is_empty())?;
    let source = group.open[0];
    let dest = most_revealing(board, &group.semi_open)?;
    Some(Move { source, dest })
}

/// Priority 2: highest tier with at least two Open items.
fn consolidate_move(board: &Board, groups: &BTreeMap<Tier, TierGroup>) -> Option<Move> {
    let group = groups.values().rev().find(|g| g.open.len() >= 2)?;
    let dest = most_revealing(board, &group.open)?;
    let source = group.open.iter().copied().find(|&pos| pos != dest)?;
    Some(Move { source, dest })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Picks the best merge on `board`, or `None` when no Open item shares a
/// tier with another Open or SemiOpen item.
///
/// Deterministic: ties on revealed neighbors go to the first cell in
/// row-major order, and sources are always the first eligible Open cell.
pub fn find_best_move(board: &Board) -> Option<Move> {
    let groups = group_by_tier(board);
    unlock_move(board, &groups).or_else(|| consolidate_move(board, &groups))
}
