//! Grid: 8x8 board of symbols. Row 0 is the top; gravity pulls toward row 7.

use crate::error::GameError;
use crate::symbol::Symbol;

/// Side length of the square board.
pub const SIZE: usize = 8;

/// A cell coordinate. Fields are public; use [`Pos::new`] when the values come from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    /// Checked constructor: fails with `InvalidCoordinate` outside `[0, 8)`.
    pub fn new(row: usize, col: usize) -> Result<Self, GameError> {
        if row < SIZE && col < SIZE {
            Ok(Self { row, col })
        } else {
            Err(GameError::InvalidCoordinate { row, col })
        }
    }

    pub fn in_bounds(&self) -> bool {
        self.row < SIZE && self.col < SIZE
    }

    /// True if the two cells share an edge (Manhattan distance 1).
    pub fn is_adjacent(&self, other: Pos) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    pub fn right(&self) -> Option<Pos> {
        (self.col + 1 < SIZE).then(|| Pos { row: self.row, col: self.col + 1 })
    }

    pub fn below(&self) -> Option<Pos> {
        (self.row + 1 < SIZE).then(|| Pos { row: self.row + 1, col: self.col })
    }

    /// Every cell in row-major order.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..SIZE).flat_map(|row| (0..SIZE).map(move |col| Pos { row, col }))
    }
}

/// Cell contents: `None` is the transient Empty marker used mid-resolution.
pub type Cell = Option<Symbol>;

/// The board. `Copy` so snapshots and hypothetical swaps are cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    cells: [[Cell; SIZE]; SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            cells: [[None; SIZE]; SIZE],
        }
    }

    /// Build a full grid from rows of symbols (row 0 first).
    #[cfg(test)]
    pub fn from_rows(rows: [[Symbol; SIZE]; SIZE]) -> Self {
        let mut grid = Self::empty();
        for (r, row) in rows.iter().enumerate() {
            for (c, sym) in row.iter().enumerate() {
                grid.cells[r][c] = Some(*sym);
            }
        }
        grid
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Cell {
        self.cells.get(pos.row).and_then(|row| row.get(pos.col)).copied().flatten()
    }

    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Cell) {
        if pos.in_bounds() {
            self.cells[pos.row][pos.col] = cell;
        }
    }

    /// Exchange two cells. Out-of-range positions are ignored.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        if a.in_bounds() && b.in_bounds() {
            let tmp = self.cells[a.row][a.col];
            self.cells[a.row][a.col] = self.cells[b.row][b.col];
            self.cells[b.row][b.col] = tmp;
        }
    }

    /// True if no cell holds the Empty marker.
    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    /// Every symbol in row-major order, skipping Empty cells.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.cells.iter().flatten().flatten().copied().collect()
    }
}
