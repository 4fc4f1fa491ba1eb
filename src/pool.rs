//! Symbol pool and the score-threshold unlock table.

use crate::symbol::{Symbol, UnknownSymbol};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Ordered, append-only set of symbols eligible for random generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPool {
    symbols: Vec<Symbol>,
}

impl Default for SymbolPool {
    fn default() -> Self {
        Self::new(&Symbol::STARTER)
    }
}

impl SymbolPool {
    /// Pool seeded with `initial`, duplicates dropped, order kept.
    pub fn new(initial: &[Symbol]) -> Self {
        let mut pool = Self {
            symbols: Vec::with_capacity(Symbol::COUNT),
        };
        for &sym in initial {
            pool.push(sym);
        }
        pool
    }

    /// Append `sym` unless already present. Returns true if it was added.
    pub fn push(&mut self, sym: Symbol) -> bool {
        if self.contains(sym) {
            return false;
        }
        self.symbols.push(sym);
        true
    }

    pub fn contains(&self, sym: Symbol) -> bool {
        self.symbols.contains(&sym)
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }
}

/// One row of the unlock table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unlock {
    pub threshold: u32,
    pub symbol: Symbol,
}

#[derive(Debug, Error)]
pub enum UnlockTableError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `threshold = symbol`")]
    Malformed { line: usize },
    #[error("line {line}: invalid threshold {value:?}")]
    InvalidThreshold { line: usize, value: String },
    #[error("line {line}: {source}")]
    UnknownSymbol {
        line: usize,
        #[source]
        source: UnknownSymbol,
    },
}

/// Score threshold → symbol mapping, kept sorted by threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockTable {
    entries: Vec<Unlock>,
}

impl Default for UnlockTable {
    /// Canonical table: one new fruit every 500 points up to 3000.
    fn default() -> Self {
        Self::new(vec![
            Unlock { threshold: 500, symbol: Symbol::Orange },
            Unlock { threshold: 1000, symbol: Symbol::Peach },
            Unlock { threshold: 1500, symbol: Symbol::Mango },
            Unlock { threshold: 2000, symbol: Symbol::Kiwi },
            Unlock { threshold: 2500, symbol: Symbol::Tomato },
            Unlock { threshold: 3000, symbol: Symbol::Lemon },
        ])
    }
}

impl UnlockTable {
    pub fn new(mut entries: Vec<Unlock>) -> Self {
        entries.sort_by_key(|u| u.threshold);
        Self { entries }
    }

    pub fn entries(&self) -> &[Unlock] {
        &self.entries
    }

    /// Parse `threshold = symbol` lines; blank lines and `#` comments are skipped.
    pub fn parse(s: &str) -> Result<Self, UnlockTableError> {
        let mut entries = Vec::new();
        for (i, raw) in s.lines().enumerate() {
            let line = i + 1;
            let text = raw.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            let (lhs, rhs) = text
                .split_once('=')
                .ok_or(UnlockTableError::Malformed { line })?;
            let lhs = lhs.trim();
            let threshold = lhs
                .parse::<u32>()
                .map_err(|_| UnlockTableError::InvalidThreshold {
                    line,
                    value: lhs.to_string(),
                })?;
            let symbol = rhs
                .trim()
                .trim_matches('"')
                .parse::<Symbol>()
                .map_err(|source| UnlockTableError::UnknownSymbol { line, source })?;
            entries.push(Unlock { threshold, symbol });
        }
        Ok(Self::new(entries))
    }

    pub fn load(path: &Path) -> Result<Self, UnlockTableError> {
        let s = std::fs::read_to_string(path)?;
        Self::parse(&s)
    }

    /// Next entry the pool does not hold yet and whose threshold is above `score`.
    pub fn next_after(&self, score: u32, pool: &SymbolPool) -> Option<Unlock> {
        self.entries
            .iter()
            .find(|u| u.threshold > score && !pool.contains(u.symbol))
            .copied()
    }
}

/// Append every symbol whose threshold `score` has reached. Returns the ones newly added.
///
/// Idempotent: a second call with the same score adds nothing, and nothing is ever removed.
pub fn unlock_check(score: u32, pool: &mut SymbolPool, table: &UnlockTable) -> Vec<Symbol> {
    let mut added = Vec::new();
    for unlock in table.entries.iter().take_while(|u| u.threshold <= score) {
        if pool.push(unlock.symbol) {
            info!(symbol = %unlock.symbol, threshold = unlock.threshold, "symbol unlocked");
            added.push(unlock.symbol);
        }
    }
    added
}
