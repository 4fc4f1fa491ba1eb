//! Cascade engine: clear runs, drop tiles, refill, repeat until stable, reshuffle dead boards.

use crate::error::GameError;
use crate::grid::{Grid, Pos, SIZE};
use crate::matcher::{self, Run};
use crate::pool::SymbolPool;
use crate::symbol::Symbol;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Points per cleared tile.
pub const POINTS_PER_TILE: u32 = 10;

/// Upper bound on clear/refill iterations for one swap.
pub const MAX_CASCADES: usize = 64;

/// Upper bound on shuffles under [`ReshufflePolicy::UntilPlayable`].
pub const MAX_RESHUFFLES: usize = 64;

/// Where new tiles and shuffles come from.
pub trait TileSource {
    /// Uniform pick from a non-empty slice.
    fn pick(&mut self, choices: &[Symbol]) -> Symbol;

    /// Uniform random permutation in place.
    fn shuffle(&mut self, tiles: &mut [Symbol]);
}

/// Seeded random tiles.
#[derive(Debug, Clone)]
pub struct RandomTiles {
    rng: StdRng,
}

impl RandomTiles {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TileSource for RandomTiles {
    fn pick(&mut self, choices: &[Symbol]) -> Symbol {
        choices[self.rng.random_range(0..choices.len())]
    }

    fn shuffle(&mut self, tiles: &mut [Symbol]) {
        tiles.shuffle(&mut self.rng);
    }
}

/// What to do after a reshuffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReshufflePolicy {
    /// Shuffle once and accept whatever comes out.
    #[default]
    Once,
    /// Shuffle until the board has no run and at least one move.
    UntilPlayable,
}

/// One clear iteration, as the board looked just before the clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeStep {
    pub before: Grid,
    pub runs: Vec<Run>,
    pub cleared: Vec<Pos>,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Distinct cells cleared, summed over every cascade iteration.
    pub cleared: u32,
    pub steps: Vec<CascadeStep>,
    pub reshuffled: bool,
}

impl Resolution {
    pub fn score_delta(&self) -> u32 {
        self.cleared * POINTS_PER_TILE
    }

    pub fn cascades(&self) -> usize {
        self.steps.len()
    }
}

/// Set every cell in `cells` to Empty. Returns how many were cleared.
pub fn clear_cells(grid: &mut Grid, cells: &[Pos]) -> u32 {
    let mut n = 0;
    for &pos in cells {
        if grid.get(pos).is_some() {
            grid.set(pos, None);
            n += 1;
        }
    }
    n
}

/// Compact each column downward, keeping order; Empty cells end up on top.
pub fn apply_gravity(grid: &mut Grid) {
    for col in 0..SIZE {
        let mut write = SIZE;
        for row in (0..SIZE).rev() {
            let pos = Pos { row, col };
            if let Some(sym) = grid.get(pos) {
                write -= 1;
                if write != row {
                    grid.set(Pos { row: write, col }, Some(sym));
                    grid.set(pos, None);
                }
            }
        }
    }
}

/// Fill every Empty cell (row-major) with a pick from `pool`.
pub fn refill(grid: &mut Grid, pool: &SymbolPool, source: &mut impl TileSource) {
    for pos in Pos::all() {
        if grid.get(pos).is_none() {
            grid.set(pos, Some(source.pick(pool.as_slice())));
        }
    }
    debug_assert!(grid.is_full());
}

/// Permute all symbols on a full board and write them back row-major.
pub fn reshuffle(grid: &mut Grid, source: &mut impl TileSource) {
    let mut tiles = grid.symbols();
    source.shuffle(&mut tiles);
    for (pos, sym) in Pos::all().zip(tiles) {
        grid.set(pos, Some(sym));
    }
}

/// Drive the grid from "just swapped" to stable, returning what was cleared.
///
/// Fails with `CascadeDivergence` if runs keep appearing for [`MAX_CASCADES`]
/// iterations; the grid is left mid-cascade in that case.
pub fn resolve(
    grid: &mut Grid,
    pool: &SymbolPool,
    source: &mut impl TileSource,
    policy: ReshufflePolicy,
) -> Result<Resolution, GameError> {
    let mut resolution = Resolution::default();

    loop {
        let mask = matcher::matched_cells(grid);
        if mask.is_empty() {
            break;
        }
        if resolution.steps.len() == MAX_CASCADES {
            return Err(GameError::CascadeDivergence {
                iterations: MAX_CASCADES,
            });
        }
        let step = CascadeStep {
            before: *grid,
            runs: matcher::find_runs(grid),
            cleared: mask.cells(),
        };
        let n = clear_cells(grid, &step.cleared);
        apply_gravity(grid);
        refill(grid, pool, source);
        debug!(
            iteration = resolution.steps.len() + 1,
            cleared = n,
            runs = step.runs.len(),
            "cascade step"
        );
        resolution.cleared += n;
        resolution.steps.push(step);
    }

    if !resolution.steps.is_empty() && !matcher::has_any_possible_move(grid) {
        warn!("no moves left, reshuffling");
        shuffle_dead_board(grid, source, policy)?;
        resolution.reshuffled = true;
    }
    Ok(resolution)
}

/// Reshuffle a board with no possible move according to `policy`.
pub fn shuffle_dead_board(
    grid: &mut Grid,
    source: &mut impl TileSource,
    policy: ReshufflePolicy,
) -> Result<(), GameError> {
    match policy {
        ReshufflePolicy::Once => {
            reshuffle(grid, source);
            Ok(())
        }
        ReshufflePolicy::UntilPlayable => {
            for attempt in 1..=MAX_RESHUFFLES {
                reshuffle(grid, source);
                if !matcher::has_any_match(grid) && matcher::has_any_possible_move(grid) {
                    debug!(attempt, "playable reshuffle");
                    return Ok(());
                }
            }
            Err(GameError::ReshuffleExhausted {
                attempts: MAX_RESHUFFLES,
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::matcher::tests::{diagonal_stripes, live_grid, stable_grid};
    use Symbol::*;

    /// Hands out a fixed sequence of symbols (cycling); "shuffles" by reversing.
    pub(crate) struct ScriptedTiles {
        script: Vec<Symbol>,
        next: usize,
    }

    impl ScriptedTiles {
        pub(crate) fn new(script: Vec<Symbol>) -> Self {
            Self { script, next: 0 }
        }
    }

    impl TileSource for ScriptedTiles {
        fn pick(&mut self, _choices: &[Symbol]) -> Symbol {
            let sym = self.script[self.next % self.script.len()];
            self.next += 1;
            sym
        }

        fn shuffle(&mut self, tiles: &mut [Symbol]) {
            tiles.reverse();
        }
    }

    fn sorted(mut tiles: Vec<Symbol>) -> Vec<Symbol> {
        tiles.sort_by_key(|s| s.index());
        tiles
    }

    #[test]
    fn test_gravity_compacts_columns() {
        let mut grid = stable_grid();
        let before = grid;
        grid.set(Pos { row: 7, col: 2 }, None);
        grid.set(Pos { row: 3, col: 2 }, None);
        apply_gravity(&mut grid);
        assert_eq!(grid.get(Pos { row: 0, col: 2 }), None);
        assert_eq!(grid.get(Pos { row: 1, col: 2 }), None);
        // Survivors keep their order, packed at the bottom.
        let expected: Vec<Symbol> = [0, 1, 2, 4, 5, 6]
            .iter()
            .map(|&row| before.get(Pos { row, col: 2 }).unwrap())
            .collect();
        let actual: Vec<Symbol> = (2..8)
            .map(|row| grid.get(Pos { row, col: 2 }).unwrap())
            .collect();
        assert_eq!(actual, expected);
        for col in [0, 1, 3, 4, 5, 6, 7] {
            for row in 0..SIZE {
                let pos = Pos { row, col };
                assert_eq!(grid.get(pos), before.get(pos));
            }
        }
    }

    #[test]
    fn test_refill_uses_pool() {
        let mut grid = Grid::empty();
        let pool = SymbolPool::new(&[Kiwi, Lemon]);
        refill(&mut grid, &pool, &mut RandomTiles::new(7));
        assert!(grid.is_full());
        assert!(grid.symbols().iter().all(|s| pool.contains(*s)));
    }

    #[test]
    fn test_resolve_noop_on_stable_grid() {
        let mut grid = live_grid();
        let before = grid;
        let res = resolve(
            &mut grid,
            &SymbolPool::default(),
            &mut RandomTiles::new(1),
            ReshufflePolicy::Once,
        )
        .unwrap();
        assert_eq!(res, Resolution::default());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_row_of_three_clears_exactly_three() {
        let mut grid = live_grid();
        for col in 0..3 {
            grid.set(Pos { row: 5, col }, Some(Apple));
        }
        let before = grid;
        let mut source = ScriptedTiles::new(vec![Mango, Kiwi, Tomato]);
        let res = resolve(&mut grid, &SymbolPool::default(), &mut source, ReshufflePolicy::Once)
            .unwrap();

        assert_eq!(res.cleared, 3);
        assert_eq!(res.score_delta(), 30);
        assert_eq!(res.cascades(), 1);
        assert!(!res.reshuffled);
        assert!(!matcher::has_any_match(&grid));

        // Columns 0..3 shifted down by one above the cleared row, refilled on top.
        for col in 0..3 {
            for row in 1..=5 {
                assert_eq!(
                    grid.get(Pos { row, col }),
                    before.get(Pos { row: row - 1, col })
                );
            }
            for row in 6..SIZE {
                assert_eq!(grid.get(Pos { row, col }), before.get(Pos { row, col }));
            }
        }
        assert_eq!(grid.get(Pos { row: 0, col: 0 }), Some(Mango));
        assert_eq!(grid.get(Pos { row: 0, col: 1 }), Some(Kiwi));
        assert_eq!(grid.get(Pos { row: 0, col: 2 }), Some(Tomato));
        for col in 3..SIZE {
            for row in 0..SIZE {
                let pos = Pos { row, col };
                assert_eq!(grid.get(pos), before.get(pos));
            }
        }
    }

    #[test]
    fn test_gravity_induced_vertical_cascade() {
        let mut grid = live_grid();
        for col in 0..3 {
            grid.set(Pos { row: 5, col }, Some(Apple));
        }
        // Kiwis at rows 3, 4 and 6 of column 0 line up once row 5 is cleared.
        for row in [3, 4, 6] {
            grid.set(Pos { row, col: 0 }, Some(Kiwi));
        }
        assert_eq!(matcher::find_runs(&grid).len(), 1);

        let mut source = ScriptedTiles::new(vec![Peach, Mango, Lemon, Tomato, Lemon, Peach]);
        let res = resolve(&mut grid, &SymbolPool::default(), &mut source, ReshufflePolicy::Once)
            .unwrap();

        assert_eq!(res.cascades(), 2);
        assert_eq!(res.steps[0].cleared.len(), 3);
        assert_eq!(res.steps[1].cleared.len(), 3);
        assert_eq!(res.steps[1].runs[0].symbol, Kiwi);
        assert_eq!(res.cleared, 6);
        assert_eq!(res.score_delta(), 60);
        assert!(!matcher::has_any_match(&grid));
        assert!(grid.is_full());
    }

    #[test]
    fn test_resolved_grids_are_stable() {
        let pool = SymbolPool::default();
        for seed in 0..40 {
            let mut source = RandomTiles::new(seed);
            let mut grid = Grid::empty();
            refill(&mut grid, &pool, &mut source);
            let res = resolve(&mut grid, &pool, &mut source, ReshufflePolicy::UntilPlayable)
                .unwrap();
            assert!(grid.is_full());
            assert!(!matcher::has_any_match(&grid), "seed {seed}: {res:?}");
            assert_eq!(
                res.cleared as usize,
                res.steps.iter().map(|s| s.cleared.len()).sum::<usize>()
            );
        }
    }

    #[test]
    fn test_single_symbol_pool_diverges() {
        let mut grid = live_grid();
        for col in 0..3 {
            grid.set(Pos { row: 5, col }, Some(Apple));
        }
        let pool = SymbolPool::new(&[Lemon]);
        let err = resolve(&mut grid, &pool, &mut RandomTiles::new(3), ReshufflePolicy::Once)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::CascadeDivergence {
                iterations: MAX_CASCADES
            }
        );
    }

    #[test]
    fn test_reshuffle_is_a_permutation() {
        let mut grid = diagonal_stripes();
        assert!(!matcher::has_any_possible_move(&grid));
        let before = sorted(grid.symbols());
        reshuffle(&mut grid, &mut RandomTiles::new(99));
        assert!(grid.is_full());
        assert_eq!(sorted(grid.symbols()), before);
    }

    #[test]
    fn test_dead_board_after_cascade_triggers_reshuffle() {
        // Kiwis on top of column 7; refilling them with the stripe values leaves a dead board.
        let stripes = diagonal_stripes();
        let mut grid = stripes;
        let refills: Vec<Symbol> = (0..3)
            .map(|row| stripes.get(Pos { row, col: 7 }).unwrap())
            .collect();
        for row in 0..3 {
            grid.set(Pos { row, col: 7 }, Some(Kiwi));
        }
        let mut source = ScriptedTiles::new(refills);
        let res = resolve(&mut grid, &SymbolPool::default(), &mut source, ReshufflePolicy::Once)
            .unwrap();
        assert_eq!(res.cleared, 3);
        assert!(res.reshuffled);
        assert_eq!(sorted(grid.symbols()), sorted(stripes.symbols()));
        // ScriptedTiles shuffles by reversing.
        assert_eq!(grid.get(Pos { row: 0, col: 0 }), stripes.get(Pos { row: 7, col: 7 }));
    }

    #[test]
    fn test_until_playable_gives_up_on_uniform_board() {
        let mut grid = Grid::from_rows([[Apple; SIZE]; SIZE]);
        let err = shuffle_dead_board(&mut grid, &mut RandomTiles::new(5), ReshufflePolicy::UntilPlayable)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::ReshuffleExhausted {
                attempts: MAX_RESHUFFLES
            }
        );
    }
}
