//! Match detection: runs, live-match test, move search and hints.
//!
//! Every function here takes `&Grid`. Hypothetical swaps are tried on a private
//! copy, so callers (and anyone else reading the grid) never see an in-between state.

use crate::grid::{Grid, Pos, SIZE};
use crate::symbol::Symbol;

/// Minimum number of equal symbols in a line that counts as a match.
pub const MIN_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

/// A maximal line of at least [`MIN_RUN`] equal symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub axis: Axis,
    /// Row index for `Axis::Row`, column index for `Axis::Column`.
    pub line: usize,
    pub start: usize,
    pub len: usize,
    pub symbol: Symbol,
}

impl Run {
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        (self.start..self.start + self.len).map(move |i| match self.axis {
            Axis::Row => Pos { row: self.line, col: i },
            Axis::Column => Pos { row: i, col: self.line },
        })
    }
}

/// Which cells belong to at least one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchMask {
    marked: [[bool; SIZE]; SIZE],
}

impl MatchMask {
    pub fn contains(&self, pos: Pos) -> bool {
        pos.in_bounds() && self.marked[pos.row][pos.col]
    }

    fn mark(&mut self, pos: Pos) {
        self.marked[pos.row][pos.col] = true;
    }

    /// Distinct marked cells; a cell in both a row and a column run counts once.
    pub fn count(&self) -> usize {
        self.marked.iter().flatten().filter(|m| **m).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn cells(&self) -> Vec<Pos> {
        Pos::all().filter(|p| self.contains(*p)).collect()
    }
}

fn line_pos(axis: Axis, line: usize, i: usize) -> Pos {
    match axis {
        Axis::Row => Pos { row: line, col: i },
        Axis::Column => Pos { row: i, col: line },
    }
}

/// Symbol shared by the window of three starting at `i`, if all three are equal and non-empty.
#[inline]
fn triple_at(grid: &Grid, axis: Axis, line: usize, i: usize) -> Option<Symbol> {
    let a = grid.get(line_pos(axis, line, i))?;
    let b = grid.get(line_pos(axis, line, i + 1))?;
    let c = grid.get(line_pos(axis, line, i + 2))?;
    (a == b && b == c).then_some(a)
}

/// Scan every row, then every column, with a sliding window of three.
///
/// Consecutive positive windows extend the same run, so a line of five equal
/// symbols is reported once with `len == 5`.
pub fn find_runs(grid: &Grid) -> Vec<Run> {
    let mut runs = Vec::new();
    for axis in [Axis::Row, Axis::Column] {
        for line in 0..SIZE {
            let mut current: Option<Run> = None;
            for i in 0..=SIZE - MIN_RUN {
                let Some(symbol) = triple_at(grid, axis, line, i) else {
                    runs.extend(current.take());
                    continue;
                };
                match current.as_mut() {
                    Some(run) if run.symbol == symbol && run.start + run.len == i + 2 => {
                        run.len += 1;
                    }
                    _ => {
                        runs.extend(current.take());
                        current = Some(Run {
                            axis,
                            line,
                            start: i,
                            len: MIN_RUN,
                            symbol,
                        });
                    }
                }
            }
            runs.extend(current);
        }
    }
    runs
}

/// Mask of every cell covered by a positive window.
pub fn matched_cells(grid: &Grid) -> MatchMask {
    let mut mask = MatchMask::default();
    for run in find_runs(grid) {
        for pos in run.cells() {
            mask.mark(pos);
        }
    }
    mask
}

/// Same scan as [`find_runs`], stopping at the first triple.
pub fn has_any_match(grid: &Grid) -> bool {
    [Axis::Row, Axis::Column].into_iter().any(|axis| {
        (0..SIZE).any(|line| (0..=SIZE - MIN_RUN).any(|i| triple_at(grid, axis, line, i).is_some()))
    })
}

/// Every undirected adjacent pair exactly once: each cell with its right and lower neighbour.
fn candidate_swaps() -> impl Iterator<Item = (Pos, Pos)> {
    Pos::all().flat_map(|p| [p.right(), p.below()].into_iter().flatten().map(move |q| (p, q)))
}

/// First adjacent swap (in row-major scan order) that would produce a match.
pub fn find_hint(grid: &Grid) -> Option<(Pos, Pos)> {
    let mut scratch = *grid;
    candidate_swaps().find(|&(a, b)| {
        scratch.swap(a, b);
        let hit = has_any_match(&scratch);
        scratch.swap(a, b);
        hit
    })
}

/// False means the board is dead: no single swap can form a run.
pub fn has_any_possible_move(grid: &Grid) -> bool {
    find_hint(grid).is_some()
}
