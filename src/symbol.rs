//! Fruit alphabet: the tile values that can sit in a grid cell.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One tile value. Equality is by variant; the declaration order carries no game meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Apple,
    Banana,
    Grape,
    Cherry,
    Strawberry,
    Pineapple,
    Watermelon,
    Orange,
    Peach,
    Mango,
    Kiwi,
    Tomato,
    Lemon,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown symbol: {0}")]
pub struct UnknownSymbol(pub String);

impl Symbol {
    pub const COUNT: usize = 13;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Apple,
        Self::Banana,
        Self::Grape,
        Self::Cherry,
        Self::Strawberry,
        Self::Pineapple,
        Self::Watermelon,
        Self::Orange,
        Self::Peach,
        Self::Mango,
        Self::Kiwi,
        Self::Tomato,
        Self::Lemon,
    ];

    /// Symbols available when a session starts.
    pub const STARTER: [Self; 7] = [
        Self::Apple,
        Self::Banana,
        Self::Grape,
        Self::Cherry,
        Self::Strawberry,
        Self::Pineapple,
        Self::Watermelon,
    ];

    /// Position in [`Symbol::ALL`]; used as the theme colour index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Emoji glyph (two terminal columns wide).
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Apple => "🍎",
            Self::Banana => "🍌",
            Self::Grape => "🍇",
            Self::Cherry => "🍒",
            Self::Strawberry => "🍓",
            Self::Pineapple => "🍍",
            Self::Watermelon => "🍉",
            Self::Orange => "🍊",
            Self::Peach => "🍑",
            Self::Mango => "🥭",
            Self::Kiwi => "🥝",
            Self::Tomato => "🍅",
            Self::Lemon => "🍋",
        }
    }

    /// Single-letter fallback for terminals without emoji support.
    pub fn letter(self) -> char {
        match self {
            Self::Apple => 'A',
            Self::Banana => 'B',
            Self::Grape => 'G',
            Self::Cherry => 'C',
            Self::Strawberry => 'S',
            Self::Pineapple => 'P',
            Self::Watermelon => 'W',
            Self::Orange => 'O',
            Self::Peach => 'H',
            Self::Mango => 'M',
            Self::Kiwi => 'K',
            Self::Tomato => 'T',
            Self::Lemon => 'L',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Apple => "apple",
            Self::Banana => "banana",
            Self::Grape => "grape",
            Self::Cherry => "cherry",
            Self::Strawberry => "strawberry",
            Self::Pineapple => "pineapple",
            Self::Watermelon => "watermelon",
            Self::Orange => "orange",
            Self::Peach => "peach",
            Self::Mango => "mango",
            Self::Kiwi => "kiwi",
            Self::Tomato => "tomato",
            Self::Lemon => "lemon",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbol {
    type Err = UnknownSymbol;

    /// Accepts the lowercase name (any case) or the emoji glyph.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|sym| sym.name().eq_ignore_ascii_case(s) || sym.glyph() == s)
            .ok_or_else(|| UnknownSymbol(s.to_string()))
    }
}
