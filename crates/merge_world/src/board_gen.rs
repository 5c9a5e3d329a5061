//! Procedural board layouts.
//!
//! A centered rectangle of empty Open cells, a SemiOpen ring orthogonally
//! adjacent to it, and Closed cells everywhere else. Every hidden cell holds
//! a random tier so that unlock merges have something to target.

use merge_core::{Board, Cell, ConfigError, Tier};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGenSpec {
    pub rows: usize,
    pub cols: usize,
    pub open_rows: usize,
    pub open_cols: usize,
    /// Hidden cells draw their tier uniformly from `1..=hidden_tier_max`.
    pub hidden_tier_max: Tier,
}

impl Default for BoardGenSpec {
    fn default() -> Self {
        Self {
            rows: 7,
            cols: 9,
            open_rows: 3,
            open_cols: 3,
            hidden_tier_max: 4,
        }
    }
}

impl BoardGenSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidBoardSpec(reason));
        if self.rows == 0 || self.cols == 0 {
            return invalid(format!("board is {}x{}", self.rows, self.cols));
        }
        if self.open_rows == 0 || self.open_cols == 0 {
            return invalid(format!(
                "open area is {}x{}",
                self.open_rows, self.open_cols
            ));
        }
        if self.open_rows > self.rows || self.open_cols > self.cols {
            return invalid(format!(
                "open area {}x{} does not fit a {}x{} board",
                self.open_rows, self.open_cols, self.rows, self.cols
            ));
        }
        if self.hidden_tier_max == 0 {
            return invalid("hidden_tier_max must be at least 1".to_string());
        }
        Ok(())
    }

    /// Row and column ranges of the centered open rectangle. An odd margin
    /// leaves the extra row or column below and to the right.
    fn open_area(&self) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let top = (self.rows - self.open_rows) / 2;
        let left = (self.cols - self.open_cols) / 2;
        (top..top + self.open_rows, left..left + self.open_cols)
    }
}

pub fn generate_board(spec: &BoardGenSpec, rng: &mut impl Rng) -> Result<Board, ConfigError> {
    spec.validate()?;
    let (open_rows, open_cols) = spec.open_area();
    let inside = |r: usize, c: usize| open_rows.contains(&r) && open_cols.contains(&c);
    // Orthogonal neighbor inside the open area, without underflowing at 0.
    let touches_open = |r: usize, c: usize| {
        (r > 0 && inside(r - 1, c))
            || inside(r + 1, c)
            || (c > 0 && inside(r, c - 1))
            || inside(r, c + 1)
    };

    let rows = (0..spec.rows)
        .map(|r| {
            (0..spec.cols)
                .map(|c| {
                    if inside(r, c) {
                        return Cell::open(0);
                    }
                    let tier = rng.gen_range(1..=spec.hidden_tier_max);
                    if touches_open(r, c) {
                        Cell::semi_open(tier)
                    } else {
                        Cell::closed(tier)
                    }
                })
                .collect()
        })
        .collect();
    Board::from_rows(rows)
}
