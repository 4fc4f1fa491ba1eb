//! Engine errors. A non-adjacent swap is an outcome, not an error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("coordinate ({row}, {col}) is outside the 8x8 grid")]
    InvalidCoordinate { row: usize, col: usize },
    /// The board kept producing runs after refill; usually too few distinct symbols.
    #[error("cascade did not settle after {iterations} iterations")]
    CascadeDivergence { iterations: usize },
    #[error("no playable reshuffle found after {attempts} attempts")]
    ReshuffleExhausted { attempts: usize },
    #[error("no playable deal found after {attempts} attempts")]
    DealExhausted { attempts: usize },
    #[error("symbol pool needs at least 3 symbols to deal a stable board, got {len}")]
    PoolTooSmall { len: usize },
}
