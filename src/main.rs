//! Jeweltui: match-three fruit swapping puzzle in the terminal.

mod app;
mod error;
mod game;
mod grid;
mod input;
mod matcher;
mod pool;
mod resolver;
mod symbol;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use pool::UnlockTable;
use resolver::ReshufflePolicy;
use symbol::Symbol;
use tracing::{debug, info};

/// Options derived from CLI that affect game rules (unlocks, reshuffling, starting symbols).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub unlocks: UnlockTable,
    pub reshuffle: ReshufflePolicy,
    pub initial_pool: Vec<Symbol>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            unlocks: UnlockTable::default(),
            reshuffle: ReshufflePolicy::default(),
            initial_pool: Symbol::STARTER.to_vec(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let unlocks = match &args.unlocks {
        Some(path) => UnlockTable::load(path)
            .with_context(|| format!("failed to load unlock table {}", path.display()))?,
        None => UnlockTable::default(),
    };
    debug!(entries = unlocks.entries().len(), "unlock table ready");
    let config = GameConfig {
        unlocks,
        reshuffle: if args.settle_reshuffle {
            ReshufflePolicy::UntilPlayable
        } else {
            ReshufflePolicy::Once
        },
        ..GameConfig::default()
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, "starting jeweltui");
    let mut app = App::new(args, config, theme, seed)?;
    app.run()?;
    Ok(())
}

/// Log to a file only; the terminal belongs to the board.
fn init_logging(path: &std::path::Path) -> Result<()> {
    let log_file = std::fs::File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

/// Match-three puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "jeweltui",
    version,
    about = "Match-three fruit puzzle in the terminal. Swap neighbouring fruit to line up three or more.",
    long_about = "Jeweltui is a terminal match-three puzzle on an 8x8 board.\n\n\
        Pick a fruit, then pick a neighbour to swap them. A swap only sticks if it lines up three \
        or more equal fruit in a row or column. Matched fruit vanish, everything above falls, and \
        new fruit drop in from the top; chains keep scoring 10 points per fruit. New kinds of fruit \
        join the board as your score grows.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor    Space/Enter  Pick    Mouse  Click to pick\n  \
        ?              Show hint      r            Restart Q / Esc  Quit menu\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Seed for the board and refills. Random if not set.
    #[arg(short, long, value_name = "N")]
    pub seed: Option<u64>,

    /// Seconds of inactivity before a possible move is highlighted. 0 disables the hint.
    #[arg(long, default_value = "5", value_name = "SECS")]
    pub hint_delay: u64,

    /// Disable match animation (instant clear + gravity).
    #[arg(long)]
    pub no_animation: bool,

    /// Draw fruit as letters instead of emoji (for terminals without emoji glyphs).
    #[arg(long)]
    pub ascii: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Unlock table file: one `threshold = fruit` per line. Uses the built-in table if not set.
    #[arg(short, long, value_name = "FILE")]
    pub unlocks: Option<std::path::PathBuf>,

    /// After a dead-board reshuffle, keep shuffling until the board is calm and playable.
    #[arg(long)]
    pub settle_reshuffle: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["jeweltui"]).unwrap();
        assert_eq!(args.seed, None);
        assert_eq!(args.hint_delay, 5);
        assert_eq!(args.palette, Palette::Normal);
        assert!(!args.settle_reshuffle);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::try_parse_from([
            "jeweltui",
            "--seed",
            "42",
            "--hint-delay",
            "0",
            "--palette",
            "colourblind",
            "--ascii",
            "--settle-reshuffle",
        ])
        .unwrap();
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.hint_delay, 0);
        assert_eq!(args.palette, Palette::Colorblind);
        assert!(args.ascii);
        assert!(args.settle_reshuffle);
    }

    #[test]
    fn test_default_config_uses_starter_fruit() {
        let config = GameConfig::default();
        assert_eq!(config.initial_pool, Symbol::STARTER.to_vec());
        assert_eq!(config.reshuffle, ReshufflePolicy::Once);
    }
}
