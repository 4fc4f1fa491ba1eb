//! Game state: one session's grid, score, symbol pool and selection.

use crate::GameConfig;
use crate::error::GameError;
use crate::grid::{Grid, Pos};
use crate::matcher;
use crate::pool::{self, SymbolPool, Unlock, UnlockTable};
use crate::resolver::{self, RandomTiles, ReshufflePolicy, Resolution, TileSource};
use crate::symbol::Symbol;
use tracing::{debug, instrument};

/// Redeal limit when a fresh board has no possible move.
const MAX_DEALS: usize = 64;

/// What a rendering layer needs to draw a stable board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub grid: Grid,
    pub score: u32,
    pub pool: Vec<Symbol>,
}

/// Notifications queued for the host; drained with [`GameState::drain_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// Emitted after every stabilised state: deal, rejected swap, resolved cascade.
    StateChanged(Snapshot),
    /// The board had no move left and was reshuffled.
    DeadBoard,
    SymbolUnlocked(Symbol),
}

/// Result of a swap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    /// The cells were adjacent and the swap was tried.
    pub applied: bool,
    /// The swap formed a run and was kept.
    pub matched: bool,
    pub resolution: Option<Resolution>,
}

impl SwapOutcome {
    fn rejected(applied: bool) -> Self {
        Self {
            applied,
            matched: false,
            resolution: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The cell is now the armed selection.
    Armed(Pos),
    /// The armed cell was picked again and released.
    Disarmed,
    Swapped(SwapOutcome),
}

/// Session controller. Owns everything; hosts create one per game.
#[derive(Debug)]
pub struct GameState<S = RandomTiles> {
    grid: Grid,
    score: u32,
    pool: SymbolPool,
    unlocks: UnlockTable,
    policy: ReshufflePolicy,
    selection: Option<Pos>,
    source: S,
    events: Vec<GameEvent>,
    turns: u32,
}

impl GameState<RandomTiles> {
    /// New session with seeded random tiles.
    pub fn new(config: &GameConfig, seed: u64) -> Result<Self, GameError> {
        Self::with_source(config, RandomTiles::new(seed))
    }

    /// Throw the session away and deal a fresh one.
    pub fn restart(&mut self, config: &GameConfig, seed: u64) -> Result<(), GameError> {
        *self = Self::new(config, seed)?;
        Ok(())
    }
}

impl<S: TileSource> GameState<S> {
    pub fn with_source(config: &GameConfig, mut source: S) -> Result<Self, GameError> {
        let pool = SymbolPool::new(&config.initial_pool);
        let grid = deal(&pool, &mut source)?;
        let mut state = Self {
            grid,
            score: 0,
            pool,
            unlocks: config.unlocks.clone(),
            policy: config.reshuffle,
            selection: None,
            source,
            events: Vec::new(),
            turns: 0,
        };
        state.emit_state();
        Ok(state)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn pool(&self) -> &SymbolPool {
        &self.pool
    }

    pub fn selection(&self) -> Option<Pos> {
        self.selection
    }

    /// Number of swaps that formed a match.
    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn next_unlock(&self) -> Option<Unlock> {
        self.unlocks.next_after(self.score, &self.pool)
    }

    /// A swap that would form a run, if any. Read-only.
    pub fn hint(&self) -> Option<(Pos, Pos)> {
        matcher::find_hint(&self.grid)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.grid,
            score: self.score,
            pool: self.pool.as_slice().to_vec(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit_state(&mut self) {
        let snapshot = self.snapshot();
        self.events.push(GameEvent::StateChanged(snapshot));
    }

    /// The player's only input: pick a cell.
    ///
    /// First pick arms the cell; picking it again releases it. A second pick next to the
    /// armed cell attempts the swap; anywhere else it becomes the new armed cell.
    pub fn select_cell(&mut self, row: usize, col: usize) -> Result<SelectOutcome, GameError> {
        let pos = Pos::new(row, col)?;
        match self.selection {
            None => {
                self.selection = Some(pos);
                Ok(SelectOutcome::Armed(pos))
            }
            Some(armed) if armed == pos => {
                self.selection = None;
                Ok(SelectOutcome::Disarmed)
            }
            Some(armed) if armed.is_adjacent(pos) => {
                let outcome = self.attempt_swap(armed, pos)?;
                Ok(SelectOutcome::Swapped(outcome))
            }
            Some(_) => {
                self.selection = Some(pos);
                Ok(SelectOutcome::Armed(pos))
            }
        }
    }

    /// Swap two cells if they are adjacent and the swap forms a run; otherwise leave the grid as is.
    #[instrument(skip(self))]
    pub fn attempt_swap(&mut self, a: Pos, b: Pos) -> Result<SwapOutcome, GameError> {
        for pos in [a, b] {
            if !pos.in_bounds() {
                return Err(GameError::InvalidCoordinate {
                    row: pos.row,
                    col: pos.col,
                });
            }
        }
        if !a.is_adjacent(b) {
            return Ok(SwapOutcome::rejected(false));
        }

        self.selection = None;
        self.grid.swap(a, b);
        if !matcher::has_any_match(&self.grid) {
            self.grid.swap(a, b);
            debug!("swap formed no run, reverted");
            self.emit_state();
            return Ok(SwapOutcome::rejected(true));
        }

        let resolution = resolver::resolve(&mut self.grid, &self.pool, &mut self.source, self.policy)?;
        self.turns += 1;
        self.score += resolution.score_delta();
        debug!(
            cleared = resolution.cleared,
            cascades = resolution.cascades(),
            score = self.score,
            "swap resolved"
        );
        for sym in pool::unlock_check(self.score, &mut self.pool, &self.unlocks) {
            self.events.push(GameEvent::SymbolUnlocked(sym));
        }
        if resolution.reshuffled {
            self.events.push(GameEvent::DeadBoard);
        }
        self.emit_state();
        Ok(SwapOutcome {
            applied: true,
            matched: true,
            resolution: Some(resolution),
        })
    }
}

/// True if placing `sym` at `pos` would complete a triple with the two cells left of or above it.
fn completes_triple(grid: &Grid, pos: Pos, sym: Symbol) -> bool {
    let Pos { row, col } = pos;
    let left = col >= 2
        && grid.get(Pos { row, col: col - 1 }) == Some(sym)
        && grid.get(Pos { row, col: col - 2 }) == Some(sym);
    let up = row >= 2
        && grid.get(Pos { row: row - 1, col }) == Some(sym)
        && grid.get(Pos { row: row - 2, col }) == Some(sym);
    left || up
}

/// Fill a board row by row so no run ever forms; redeal if the result has no move.
fn deal(pool: &SymbolPool, source: &mut impl TileSource) -> Result<Grid, GameError> {
    if pool.len() < matcher::MIN_RUN {
        return Err(GameError::PoolTooSmall { len: pool.len() });
    }
    for attempt in 1..=MAX_DEALS {
        let mut grid = Grid::empty();
        for pos in Pos::all() {
            let allowed: Vec<Symbol> = pool
                .as_slice()
                .iter()
                .copied()
                .filter(|&sym| !completes_triple(&grid, pos, sym))
                .collect();
            grid.set(pos, Some(source.pick(&allowed)));
        }
        if matcher::has_any_possible_move(&grid) {
            debug!(attempt, "board dealt");
            return Ok(grid);
        }
    }
    Err(GameError::DealExhausted {
        attempts: MAX_DEALS,
    })
}

#[cfg(test)]
impl<S: TileSource> GameState<S> {
    /// Session starting from a hand-built board.
    pub(crate) fn from_parts(config: &GameConfig, grid: Grid, source: S) -> Self {
        Self {
            grid,
            score: 0,
            pool: SymbolPool::new(&config.initial_pool),
            unlocks: config.unlocks.clone(),
            policy: config.reshuffle,
            selection: None,
            source,
            events: Vec::new(),
            turns: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::SIZE;
    use crate::matcher::tests::{diagonal_stripes, live_grid};
    use crate::resolver::tests::ScriptedTiles;
    use Symbol::*;

    fn p(row: usize, col: usize) -> Pos {
        Pos { row, col }
    }

    fn live_game() -> GameState {
        GameState::from_parts(&GameConfig::default(), live_grid(), RandomTiles::new(11))
    }

    #[test]
    fn test_deal_is_full_stable_and_playable() {
        for seed in 0..20 {
            let game = GameState::new(&GameConfig::default(), seed).unwrap();
            let grid = game.grid();
            assert!(grid.is_full());
            assert!(!matcher::has_any_match(grid));
            assert!(matcher::has_any_possible_move(grid));
            assert!(grid.symbols().iter().all(|s| Symbol::STARTER.contains(s)));
        }
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = GameState::new(&GameConfig::default(), 1234).unwrap();
        let b = GameState::new(&GameConfig::default(), 1234).unwrap();
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn test_new_game_emits_initial_state() {
        let mut game = GameState::new(&GameConfig::default(), 5).unwrap();
        let events = game.drain_events();
        assert_eq!(events, vec![GameEvent::StateChanged(game.snapshot())]);
        assert!(game.drain_events().is_empty());
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_restart_resets_session() {
        let config = GameConfig::default();
        let mut game = GameState::new(&config, 3).unwrap();
        let (a, b) = game.hint().unwrap();
        game.attempt_swap(a, b).unwrap();
        assert!(game.score() > 0);
        game.restart(&config, 3).unwrap();
        assert_eq!(game.score(), 0);
        assert_eq!(game.turns(), 0);
        assert_eq!(*game.grid(), *GameState::new(&config, 3).unwrap().grid());
    }

    #[test]
    fn test_small_pool_rejected() {
        let config = GameConfig {
            initial_pool: vec![Apple, Banana],
            ..GameConfig::default()
        };
        assert_eq!(
            GameState::new(&config, 0).unwrap_err(),
            GameError::PoolTooSmall { len: 2 }
        );
    }

    #[test]
    fn test_non_adjacent_swap_is_noop() {
        let mut game = live_game();
        let before = *game.grid();
        let outcome = game.attempt_swap(p(0, 0), p(7, 7)).unwrap();
        assert_eq!(
            outcome,
            SwapOutcome {
                applied: false,
                matched: false,
                resolution: None
            }
        );
        assert_eq!(*game.grid(), before);
        assert!(game.drain_events().is_empty());
    }

    #[test]
    fn test_every_non_adjacent_pair_is_noop() {
        let mut game = live_game();
        let before = *game.grid();
        for a in Pos::all() {
            for b in Pos::all().filter(|b| !a.is_adjacent(*b)) {
                let outcome = game.attempt_swap(a, b).unwrap();
                assert!(!outcome.applied);
                assert_eq!(*game.grid(), before);
            }
        }
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_invalid_coordinate_fails_fast() {
        let mut game = live_game();
        let before = *game.grid();
        assert_eq!(
            game.attempt_swap(p(0, 0), p(0, 8)).unwrap_err(),
            GameError::InvalidCoordinate { row: 0, col: 8 }
        );
        assert_eq!(
            game.select_cell(9, 1).unwrap_err(),
            GameError::InvalidCoordinate { row: 9, col: 1 }
        );
        assert_eq!(*game.grid(), before);
        assert_eq!(game.selection(), None);
    }

    #[test]
    fn test_swap_without_match_is_reverted() {
        let mut game = live_game();
        let before = *game.grid();
        let outcome = game.attempt_swap(p(0, 0), p(0, 1)).unwrap();
        assert!(outcome.applied);
        assert!(!outcome.matched);
        assert_eq!(*game.grid(), before);
        assert_eq!(game.score(), 0);
        assert_eq!(
            game.drain_events(),
            vec![GameEvent::StateChanged(game.snapshot())]
        );
    }

    #[test]
    fn test_matching_swap_scores_cleared_cells() {
        let mut game = live_game();
        let (a, b) = game.hint().unwrap();
        let outcome = game.attempt_swap(a, b).unwrap();
        assert!(outcome.applied && outcome.matched);
        let resolution = outcome.resolution.unwrap();
        assert!(resolution.cleared >= 3);
        assert_eq!(game.score(), 10 * resolution.cleared);
        assert_eq!(game.turns(), 1);
        assert!(game.grid().is_full());
        if !resolution.reshuffled {
            assert!(!matcher::has_any_match(game.grid()));
        }
        let events = game.drain_events();
        assert_eq!(events.last(), Some(&GameEvent::StateChanged(game.snapshot())));
    }

    #[test]
    fn test_select_cell_flow() {
        let mut game = live_game();
        assert_eq!(game.select_cell(2, 2).unwrap(), SelectOutcome::Armed(p(2, 2)));
        assert_eq!(game.select_cell(2, 2).unwrap(), SelectOutcome::Disarmed);
        assert_eq!(game.selection(), None);

        game.select_cell(0, 0).unwrap();
        assert_eq!(game.select_cell(5, 5).unwrap(), SelectOutcome::Armed(p(5, 5)));
        assert_eq!(game.selection(), Some(p(5, 5)));

        let before = *game.grid();
        match game.select_cell(4, 5).unwrap() {
            SelectOutcome::Swapped(outcome) => {
                assert!(outcome.applied);
                assert!(!outcome.matched);
            }
            other => panic!("expected a swap, got {other:?}"),
        }
        assert_eq!(game.selection(), None);
        assert_eq!(*game.grid(), before);
    }

    #[test]
    fn test_select_cell_swaps_hint_pair() {
        let mut game = live_game();
        let (a, b) = game.hint().unwrap();
        game.select_cell(a.row, a.col).unwrap();
        let outcome = game.select_cell(b.row, b.col).unwrap();
        assert!(matches!(outcome, SelectOutcome::Swapped(SwapOutcome { matched: true, .. })));
        assert!(game.score() >= 30);
    }

    #[test]
    fn test_unlock_after_score_threshold() {
        let config = GameConfig {
            unlocks: UnlockTable::new(vec![Unlock {
                threshold: 30,
                symbol: Lemon,
            }]),
            ..GameConfig::default()
        };
        let mut game = GameState::from_parts(&config, live_grid(), RandomTiles::new(2));
        assert_eq!(game.next_unlock().map(|u| u.symbol), Some(Lemon));
        let (a, b) = game.hint().unwrap();
        game.attempt_swap(a, b).unwrap();
        assert!(game.pool().contains(Lemon));
        assert!(game.drain_events().contains(&GameEvent::SymbolUnlocked(Lemon)));
        assert_eq!(game.next_unlock(), None);
    }

    #[test]
    fn test_dead_board_event() {
        let stripes = diagonal_stripes();
        let mut grid = stripes;
        grid.set(p(0, 7), Some(Kiwi));
        grid.set(p(1, 7), Some(Kiwi));
        grid.set(p(2, 6), Some(Kiwi));
        grid.set(p(2, 7), stripes.get(p(2, 6)));
        assert!(!matcher::has_any_match(&grid));

        let refills = (0..3).map(|row| stripes.get(p(row, 7)).unwrap()).collect();
        let mut game =
            GameState::from_parts(&GameConfig::default(), grid, ScriptedTiles::new(refills));
        let outcome = game.attempt_swap(p(2, 6), p(2, 7)).unwrap();
        assert!(outcome.matched);
        assert_eq!(game.score(), 30);
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::DeadBoard));
        assert!(outcome.resolution.unwrap().reshuffled);
        assert_eq!(game.grid().symbols().len(), SIZE * SIZE);
    }

    #[test]
    fn test_score_never_decreases() {
        let mut game = GameState::new(&GameConfig::default(), 77).unwrap();
        let mut last = game.score();
        for _ in 0..30 {
            let Some((a, b)) = game.hint() else { break };
            let outcome = game.attempt_swap(a, b).unwrap();
            let gained = outcome.resolution.map_or(0, |r| r.score_delta());
            assert_eq!(game.score(), last + gained);
            last = game.score();
        }
        assert!(game.turns() > 0);
    }
}
