//! Layout and drawing: board, sidebar, quit menu, match fade.

use crate::app::{QuitOption, Screen, TurnSummary};
use crate::game::Snapshot;
use crate::grid::{Pos, SIZE};
use crate::pool::Unlock;
use crate::resolver::CascadeStep;
use crate::symbol::Symbol;
use crate::theme::{Theme, dim};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// A board cell is 4 columns by 2 rows, which looks roughly square in most fonts.
const CELL_WIDTH: u16 = 4;
const CELL_HEIGHT: u16 = 2;
/// Board size in terminal cells, border included.
const BOARD_WIDTH: u16 = SIZE as u16 * CELL_WIDTH + 2;
const BOARD_HEIGHT: u16 = SIZE as u16 * CELL_HEIGHT + 2;
const SIDEBAR_WIDTH: u16 = 28;

/// Duration of the match fade (TachyonFX) in ms.
const CLEAR_FADE_MS: u32 = 350;

/// Background of a fruit tile relative to its colour.
const TILE_SHADE: f32 = 0.35;

/// Everything the renderer needs for one frame.
pub struct View<'a> {
    pub screen: Screen,
    pub quit_selected: QuitOption,
    pub snapshot: &'a Snapshot,
    pub selection: Option<Pos>,
    pub turns: u32,
    pub next_unlock: Option<Unlock>,
    pub cursor: Pos,
    pub hint: Option<(Pos, Pos)>,
    /// Cascade step being played back; drawn instead of the stable board.
    pub step: Option<&'a CascadeStep>,
    pub notice: Option<&'a str>,
    pub last_turn: Option<TurnSummary>,
    pub theme: &'a Theme,
    pub ascii: bool,
}

/// Board (with border) and sidebar rects, centred in `area`.
fn layout(area: Rect) -> (Rect, Rect) {
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;
    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_WIDTH),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert_chunks[1]);
    (inner[0], inner[1])
}

/// Board inner rect (no border) for a frame area; matches what [`draw`] uses.
pub fn board_rect(area: Rect) -> Rect {
    let (outer, _) = layout(area);
    Rect {
        x: outer.x + 1,
        y: outer.y + 1,
        width: outer.width.saturating_sub(2),
        height: outer.height.saturating_sub(2),
    }
}

/// Board cell under terminal position (x, y), if any.
pub fn cell_at(board: Rect, x: u16, y: u16) -> Option<Pos> {
    if !board.contains(Position { x, y }) {
        return None;
    }
    let col = ((x - board.x) / CELL_WIDTH) as usize;
    let row = ((y - board.y) / CELL_HEIGHT) as usize;
    Pos::new(row, col).ok()
}

fn cell_rect(board: Rect, pos: Pos) -> Rect {
    Rect {
        x: board.x + pos.col as u16 * CELL_WIDTH,
        y: board.y + pos.row as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
}

/// Build set of buffer (x, y) positions covered by the given board cells.
fn clearing_buffer_positions(board: Rect, cells: &[Pos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &pos in cells {
        let r = cell_rect(board, pos).intersection(board);
        for bx in r.x..r.x + r.width {
            for by in r.y..r.y + r.height {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the match fade and process it (TachyonFX: fade cleared cells to bg).
fn apply_clear_effect(
    frame: &mut Frame,
    theme: &Theme,
    board: Rect,
    cleared: &[Pos],
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_process_time = Some(now);

    if clear_effect.is_none() {
        let clearing_set = clearing_buffer_positions(board, cleared);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            clearing_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

/// Draw the current screen. While a cascade step is shown, its cleared cells fade out
/// and `clear_effect` / `clear_process_time` are updated.
pub fn draw(
    frame: &mut Frame,
    view: &View,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let (board_outer, sidebar) = layout(frame.area());
    draw_board(frame, view, board_outer);
    draw_sidebar(frame, view, sidebar);
    if let Some(step) = view.step {
        apply_clear_effect(
            frame,
            view.theme,
            board_rect(frame.area()),
            &step.cleared,
            clear_effect,
            clear_process_time,
            now,
        );
    }
    if view.screen == Screen::QuitMenu {
        draw_quit_menu(frame, view.theme, view.quit_selected);
    }
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Jeweltui ", Style::default().fg(theme.title)));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let grid = view.step.map_or(&view.snapshot.grid, |step| &step.before);
    let hinted = |pos: Pos| view.hint.is_some_and(|(a, b)| a == pos || b == pos);
    let buf = frame.buffer_mut();

    for pos in Pos::all() {
        let rect = cell_rect(board, pos);
        // Terminal too small: skip cells that would spill past the border.
        if rect.right() > board.right() || rect.bottom() > board.bottom() {
            continue;
        }
        let cell = grid.get(pos);
        let bg = if view.selection == Some(pos) {
            theme.selected
        } else if hinted(pos) {
            theme.hint
        } else {
            cell.map_or(theme.bg, |sym| dim(theme.tile_color(sym), TILE_SHADE))
        };
        let style = Style::default().fg(theme.main_fg).bg(bg);
        for y in rect.y..rect.bottom() {
            buf.set_string(rect.x, y, " ".repeat(rect.width as usize), style);
        }
        if let Some(sym) = cell {
            if view.ascii {
                let letter_style = style
                    .fg(theme.tile_color(sym))
                    .add_modifier(Modifier::BOLD);
                buf.set_string(rect.x + 1, rect.y, sym.letter().to_string(), letter_style);
            } else {
                buf.set_string(rect.x + 1, rect.y, sym.glyph(), style);
            }
        }
        if view.cursor == pos && view.screen == Screen::Playing && view.step.is_none() {
            let cursor_style = Style::default().fg(theme.title).bg(theme.cursor);
            buf.set_string(rect.x, rect.y + 1, "└──┘", cursor_style);
        }
    }
}

fn bordered(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Stats (border + score, turns, last turn)
            Constraint::Length(6), // Fruit (border + title + pool, wrapped + next unlock)
            Constraint::Length(5), // Controls
            Constraint::Fill(1),   // Notice
        ])
        .split(area);

    // --- Stats ---
    let stats_block = bordered(theme);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let last_turn = match view.last_turn {
        Some(TurnSummary { gained, cascades }) if cascades > 1 => {
            format!("+{gained} ({cascades} chain)")
        }
        Some(TurnSummary { gained, .. }) => format!("+{gained}"),
        None => "-".to_string(),
    };
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(view.snapshot.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Turns: ", title_style),
            Span::styled(view.turns.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Last:  ", title_style),
            Span::styled(last_turn, fg_style),
        ]),
    ];
    Paragraph::new(stats_lines).render(stats_inner, frame.buffer_mut());

    // --- Fruit in play + next unlock ---
    let label = |sym: Symbol| {
        if view.ascii {
            Span::styled(sym.letter().to_string(), Style::default().fg(theme.tile_color(sym)))
        } else {
            Span::raw(sym.glyph())
        }
    };
    let pool_block = bordered(theme);
    let pool_inner = pool_block.inner(chunks[1]);
    pool_block.render(chunks[1], frame.buffer_mut());
    let mut pool_spans = Vec::with_capacity(view.snapshot.pool.len() * 2);
    for &sym in &view.snapshot.pool {
        pool_spans.push(label(sym));
        pool_spans.push(Span::raw(" "));
    }
    let next_line = match view.next_unlock {
        Some(Unlock { threshold, symbol }) => Line::from(vec![
            Span::styled("Next: ", title_style),
            label(symbol),
            Span::styled(format!(" at {threshold}"), dim_style),
        ]),
        None => Line::from(Span::styled("All fruit unlocked", dim_style)),
    };
    Paragraph::new(vec![
        Line::from(Span::styled("Fruit", title_style)),
        Line::from(pool_spans),
        next_line,
    ])
    .wrap(Wrap { trim: true })
    .render(pool_inner, frame.buffer_mut());

    // --- Controls ---
    let controls_block = bordered(theme);
    let controls_inner = controls_block.inner(chunks[2]);
    controls_block.render(chunks[2], frame.buffer_mut());
    Paragraph::new(vec![
        Line::from(Span::styled("hjkl/arrows  move", dim_style)),
        Line::from(Span::styled("space/click  pick", dim_style)),
        Line::from(Span::styled("? hint  r new  q quit", dim_style)),
    ])
    .render(controls_inner, frame.buffer_mut());

    // --- Notice ---
    if let Some(text) = view.notice {
        Paragraph::new(Line::from(Span::styled(
            text,
            title_style.add_modifier(Modifier::BOLD),
        )))
        .wrap(Wrap { trim: true })
        .render(chunks[3], frame.buffer_mut());
    }
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw.min(area.width),
        height: qh.min(area.height),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    // Clear background
    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)]
                .set_symbol(" ")
                .set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Restart, " New game "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + i as u16 * 2;
        if ry < inner.y + inner.height {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}
