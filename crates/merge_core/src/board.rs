//! Board model: a fixed grid of cells with adjacency-driven visibility.
//!
//! Placing or merging into a cell reveals its Closed orthogonal neighbors as
//! SemiOpen. A merge destination always becomes Open. Visibility never
//! regresses.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{Cell, ConfigError, Fault, Move, Position, Tier, Visibility};

pub type Neighbors = SmallVec<[Position; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Board {
    rows: usize,
    cols: usize,
    /// Row-major.
    cells: Vec<Cell>,
}

impl Board {
    /// All cells Open and empty.
    pub fn open(rows: usize, cols: usize) -> Result<Self, ConfigError> {
        Self::from_rows(vec![vec![Cell::open(0); cols]; rows])
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, ConfigError> {
        let cols = rows.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != cols)
            .map(|(i, r)| (i, r.len()))
        {
            return Err(ConfigError::RaggedBoard {
                row,
                expected: cols,
                found,
            });
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Position::new(row, col)))
    }

    /// `(position, cell)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.positions().zip(self.cells.iter())
    }

    pub fn row_cells(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// In-bounds orthogonal neighbors: up, left, right, down.
    pub fn neighbors(&self, pos: Position) -> Neighbors {
        let mut out = Neighbors::new();
        if pos.row > 0 {
            out.push(Position::new(pos.row - 1, pos.col));
        }
        if pos.col > 0 {
            out.push(Position::new(pos.row, pos.col - 1));
        }
        if pos.col + 1 < self.cols {
            out.push(Position::new(pos.row, pos.col + 1));
        }
        if pos.row + 1 < self.rows {
            out.push(Position::new(pos.row + 1, pos.col));
        }
        out
    }

    /// Closed neighbors that an item landing at `pos` would reveal.
    pub fn closed_neighbor_count(&self, pos: Position) -> usize {
        self.neighbors(pos)
            .into_iter()
            .filter(|&n| self.visibility_at(n) == Some(Visibility::Closed))
            .count()
    }

    /// Empty Open cells in row-major order. These are the placement targets.
    pub fn find_empty_open_cells(&self) -> Vec<Position> {
        self.iter()
            .filter(|(_, cell)| cell.is_empty() && cell.visibility == Visibility::Open)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn has_empty_open_cell(&self) -> bool {
        self.cells
            .iter()
            .any(|cell| cell.is_empty() && cell.visibility == Visibility::Open)
    }

    pub fn item_count(&self) -> u64 {
        self.cells.iter().filter(|cell| !cell.is_empty()).count() as u64
    }

    /// Highest tier on the board regardless of visibility, 0 when empty.
    pub fn max_tier(&self) -> Tier {
        self.cells.iter().map(|cell| cell.tier).max().unwrap_or(0)
    }

    pub fn count_visibility(&self, visibility: Visibility) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.visibility == visibility)
            .count()
    }

    /// Puts a new item into an empty Open cell.
    pub fn place(&mut self, pos: Position, tier: Tier) -> Result<(), Fault> {
        let index = self.index(pos).ok_or(Fault::OutOfBounds(pos))?;
        let cell = self.cells[index];
        if cell.visibility != Visibility::Open {
            return Err(Fault::NotOpen(pos));
        }
        if !cell.is_empty() {
            return Err(Fault::Occupied {
                pos,
                tier: cell.tier,
            });
        }
        if tier == 0 {
            return Err(Fault::EmptyItem(pos));
        }
        self.cells[index].tier = tier;
        self.reveal_around(pos);
        Ok(())
    }

    /// Merges two equal-tier items; returns the tier produced at `mv.dest`.
    pub fn merge(&mut self, mv: Move) -> Result<Tier, Fault> {
        let Move { source, dest } = mv;
        if source == dest {
            return Err(Fault::SameCell(source));
        }
        let from = self.index(source).ok_or(Fault::OutOfBounds(source))?;
        let to = self.index(dest).ok_or(Fault::OutOfBounds(dest))?;
        let (from_cell, to_cell) = (self.cells[from], self.cells[to]);

        if from_cell.is_empty() {
            return Err(Fault::EmptyCell(source));
        }
        if to_cell.is_empty() {
            return Err(Fault::EmptyCell(dest));
        }
        if from_cell.tier != to_cell.tier {
            return Err(Fault::TierMismatch {
                from: source,
                from_tier: from_cell.tier,
                to: dest,
                to_tier: to_cell.tier,
            });
        }
        if from_cell.visibility != Visibility::Open || to_cell.visibility == Visibility::Closed {
            return Err(Fault::NotMergeable {
                from: source,
                to: dest,
            });
        }

        let produced = to_cell.tier.checked_add(1).ok_or(Fault::TierOverflow(dest))?;
        self.cells[to] = Cell::open(produced);
        self.cells[from].tier = 0;
        self.reveal_around(dest);
        Ok(produced)
    }

    fn reveal_around(&mut self, pos: Position) {
        for n in self.neighbors(pos) {
            if let Some(i) = self.index(n) {
                if self.cells[i].visibility == Visibility::Closed {
                    self.cells[i].visibility = Visibility::SemiOpen;
                }
            }
        }
    }

    fn visibility_at(&self, pos: Position) -> Option<Visibility> {
        self.cell(pos).map(|cell| cell.visibility)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols).then(|| pos.row * self.cols + pos.col)
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Board {
    type Error = ConfigError;

    fn try_from(rows: Vec<Vec<Cell>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Board> for Vec<Vec<Cell>> {
    fn from(board: Board) -> Self {
        board
            .cells
            .chunks(board.cols)
            .map(<[Cell]>::to_vec)
            .collect()
    }
}
