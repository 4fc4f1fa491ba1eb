//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use crate::symbol::Symbol;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Fruit colours in [`Symbol::ALL`] order, One Dark flavoured.
const ONEDARK_TILES: [&str; Symbol::COUNT] = [
    "#E06C75", // apple
    "#E5C07B", // banana
    "#C678DD", // grape
    "#BE5046", // cherry
    "#FF7A93", // strawberry
    "#D19A66", // pineapple
    "#98C379", // watermelon
    "#F0A45D", // orange
    "#F2B8A0", // peach
    "#FFB454", // mango
    "#7FB069", // kiwi
    "#EF596F", // tomato
    "#F7E06E", // lemon
];

const HIGH_CONTRAST_TILES: [&str; Symbol::COUNT] = [
    "#FF0000", "#FFFF00", "#FF00FF", "#AA0000", "#FF66AA", "#FFAA00", "#00FF00", "#FF8800",
    "#FFCCAA", "#FFD700", "#88FF00", "#FF3333", "#FFFF88",
];

/// Okabe-Ito and Tol hues; never relies on red/green alone.
const COLORBLIND_TILES: [&str; Symbol::COUNT] = [
    "#D55E00", "#F0E442", "#CC79A7", "#882255", "#EE3377", "#E69F00", "#009E73", "#EE7733",
    "#FFAABB", "#DDAA33", "#44BB99", "#AA3377", "#BBCC33",
];

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Per-fruit colours, indexed by [`Symbol::index`].
    pub tiles: [Color; Symbol::COUNT],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, pool).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (controls, next unlock).
    pub inactive_fg: Color,
    /// Cursor cell background.
    pub cursor: Color,
    /// Armed selection background.
    pub selected: Color,
    /// Hinted cells background.
    pub hint: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

fn hex_table(table: [&str; Symbol::COUNT]) -> [Color; Symbol::COUNT] {
    table.map(|h| parse_hex(h).unwrap_or(Color::White))
}

/// Built-in hex literal.
fn rgb(hex: &str) -> Color {
    parse_hex(hex).unwrap_or(Color::Reset)
}

impl Theme {
    /// Hardcoded One Dark defaults: exact hex values from onedark.theme.
    pub fn onedark_default() -> Self {
        Self {
            tiles: hex_table(ONEDARK_TILES),
            bg: rgb("#282C34"),
            div_line: rgb("#3F444F"),
            main_fg: rgb("#ABB2BF"),
            title: rgb("#E5C07B"),
            inactive_fg: rgb("#5C6370"),
            cursor: rgb("#3E4452"),
            selected: rgb("#61AFEF"),
            hint: rgb("#56B6C2"),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or file is missing.
    /// `palette` selects the fruit colour variant.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override fruit colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.tiles = hex_table(HIGH_CONTRAST_TILES);
                self.cursor = Color::Gray;
                self.selected = Color::White;
            }
            Palette::Colorblind => {
                self.tiles = hex_table(COLORBLIND_TILES);
                self.selected = rgb("#0077BB");
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let base = Self::onedark_default();
        // Per-fruit keys are `fruit_<name>`; a few borrow the nearest btop hue when absent.
        let mut tiles = base.tiles;
        for sym in Symbol::ALL {
            let fallback = match sym {
                Symbol::Apple => get("cpu_end"),
                Symbol::Banana => get("cpu_mid"),
                Symbol::Grape => get("net_box"),
                Symbol::Watermelon => get("mem_box"),
                _ => None,
            };
            if let Some(c) = get(&format!("fruit_{}", sym.name())).or(fallback) {
                tiles[sym.index()] = c;
            }
        }
        Self {
            tiles,
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            inactive_fg: get("inactive_fg").unwrap_or(base.inactive_fg),
            cursor: get("selected_bg").unwrap_or(base.cursor),
            selected: get("hi_fg").or_else(|| get("cpu_box")).unwrap_or(base.selected),
            hint: get("proc_misc").unwrap_or(base.hint),
        }
    }

    #[inline]
    pub fn tile_color(&self, sym: Symbol) -> Color {
        self.tiles[sym.index()]
    }
}

/// Scale an RGB colour's brightness; named colours are returned unchanged.
pub fn dim(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(
            (r as f32 * factor).min(255.0) as u8,
            (g as f32 * factor).min(255.0) as u8,
            (b as f32 * factor).min(255.0) as u8,
        ),
        other => other,
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |digits: &str| {
        u8::from_str_radix(digits, 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    if !s.is_ascii() {
        return Err(ThemeError::InvalidHex(s.to_string()));
    }
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}
