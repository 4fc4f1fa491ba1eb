//! App: terminal init, main loop, playback of cascades, hint timer and input handling.

use crate::game::{GameEvent, GameState, SelectOutcome, Snapshot};
use crate::grid::{Pos, SIZE};
use crate::input::{key_to_action, Action};
use crate::resolver::CascadeStep;
use crate::theme::Theme;
use crate::ui::{self, View};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, info};

/// How long a sidebar notice stays up.
const NOTICE_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Restart,
    Exit,
}

impl QuitOption {
    fn next(self) -> Self {
        match self {
            QuitOption::Resume => QuitOption::Restart,
            QuitOption::Restart => QuitOption::Exit,
            QuitOption::Exit => QuitOption::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            QuitOption::Resume => QuitOption::Exit,
            QuitOption::Restart => QuitOption::Resume,
            QuitOption::Exit => QuitOption::Restart,
        }
    }
}

/// Score summary of the last matching swap, for the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSummary {
    pub gained: u32,
    pub cascades: usize,
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    seed: u64,
    state: GameState,
    /// Last stable state received from the game.
    snapshot: Snapshot,
    screen: Screen,
    quit_selected: QuitOption,
    cursor: Pos,
    hint: Option<(Pos, Pos)>,
    last_input_time: Instant,
    /// Cascade iterations still to show; input is locked until this is empty.
    playback: VecDeque<CascadeStep>,
    /// TachyonFX fade for the front playback step (created when the step is first drawn).
    clear_effect: Option<Effect>,
    /// Last time we processed the clear effect (for delta).
    clear_effect_process_time: Option<Instant>,
    notice: Option<(String, Instant)>,
    last_turn: Option<TurnSummary>,
    /// Frame area of the last draw, for mapping mouse clicks to cells.
    last_area: Rect,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme, seed: u64) -> Result<Self> {
        let mut state = GameState::new(&config, seed)?;
        let snapshot = state.snapshot();
        state.drain_events();
        Ok(Self {
            args,
            config,
            theme,
            seed,
            state,
            snapshot,
            screen: Screen::Playing,
            quit_selected: QuitOption::Resume,
            cursor: Pos { row: 0, col: 0 },
            hint: None,
            last_input_time: Instant::now(),
            playback: VecDeque::new(),
            clear_effect: None,
            clear_effect_process_time: None,
            notice: None,
            last_turn: None,
            last_area: Rect::default(),
        })
    }

    /// Next seed in the chain, so a fixed `--seed` replays the same sequence of games.
    fn reset_game(&mut self) -> Result<()> {
        self.seed = self.seed.wrapping_add(1);
        info!(seed = self.seed, "restarting");
        self.state.restart(&self.config, self.seed)?;
        self.screen = Screen::Playing;
        self.cursor = Pos { row: 0, col: 0 };
        self.hint = None;
        self.last_input_time = Instant::now();
        self.playback.clear();
        self.clear_effect = None;
        self.clear_effect_process_time = None;
        self.notice = None;
        self.last_turn = None;
        self.handle_events();
        Ok(())
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some((text.into(), Instant::now()));
    }

    /// Fold queued game events into what the view shows.
    fn handle_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::StateChanged(snapshot) => self.snapshot = snapshot,
                GameEvent::DeadBoard => self.set_notice("No moves left: reshuffled"),
                GameEvent::SymbolUnlocked(sym) => {
                    let label = if self.args.ascii {
                        sym.letter().to_string()
                    } else {
                        sym.glyph().to_string()
                    };
                    self.set_notice(format!("New fruit: {label} {sym}"));
                }
            }
        }
    }

    fn pick(&mut self, pos: Pos) -> Result<()> {
        self.cursor = pos;
        if let SelectOutcome::Swapped(outcome) = self.state.select_cell(pos.row, pos.col)? {
            match outcome.resolution {
                Some(resolution) => {
                    self.last_turn = Some(TurnSummary {
                        gained: resolution.score_delta(),
                        cascades: resolution.cascades(),
                    });
                    if !self.args.no_animation {
                        self.playback.extend(resolution.steps);
                    }
                }
                None if outcome.applied => self.set_notice("No match"),
                None => {}
            }
        }
        self.handle_events();
        Ok(())
    }

    fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let wrap = |v: usize, d: isize| (v as isize + d).rem_euclid(SIZE as isize) as usize;
        self.cursor = Pos {
            row: wrap(self.cursor.row, d_row),
            col: wrap(self.cursor.col, d_col),
        };
    }

    fn playing_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.screen = Screen::QuitMenu;
                self.quit_selected = QuitOption::Resume;
            }
            _ if !self.playback.is_empty() => {}
            Action::Up => self.move_cursor(-1, 0),
            Action::Down => self.move_cursor(1, 0),
            Action::Left => self.move_cursor(0, -1),
            Action::Right => self.move_cursor(0, 1),
            Action::Pick => self.pick(self.cursor)?,
            Action::Hint => {
                self.hint = self.state.hint();
                if self.hint.is_none() {
                    self.set_notice("No move available");
                }
            }
            Action::Restart => self.reset_game()?,
            Action::None => {}
        }
        Ok(())
    }

    /// Returns false when the player chose to exit.
    fn quit_menu_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Down | Action::Right => self.quit_selected = self.quit_selected.next(),
            Action::Up | Action::Left => self.quit_selected = self.quit_selected.prev(),
            Action::Pick => match self.quit_selected {
                QuitOption::Resume => self.screen = Screen::Playing,
                QuitOption::Restart => self.reset_game()?,
                QuitOption::Exit => return Ok(false),
            },
            Action::Quit => self.screen = Screen::Playing,
            Action::Hint | Action::Restart | Action::None => {}
        }
        Ok(true)
    }

    fn on_mouse(&mut self, mouse: MouseEvent) -> Result<()> {
        if self.screen != Screen::Playing || !self.playback.is_empty() {
            return Ok(());
        }
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            self.last_input_time = Instant::now();
            self.hint = None;
            let board = ui::board_rect(self.last_area);
            if let Some(pos) = ui::cell_at(board, mouse.column, mouse.row) {
                self.pick(pos)?;
            }
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        // Restore
        execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        let hint_delay = Duration::from_secs(self.args.hint_delay);
        loop {
            let now = Instant::now();
            if self
                .notice
                .as_ref()
                .is_some_and(|(_, at)| now.duration_since(*at) >= Duration::from_secs(NOTICE_SECS))
            {
                self.notice = None;
            }
            if self.args.hint_delay > 0
                && self.hint.is_none()
                && self.playback.is_empty()
                && self.screen == Screen::Playing
                && now.duration_since(self.last_input_time) >= hint_delay
            {
                self.hint = self.state.hint();
            }

            let view = View {
                screen: self.screen,
                quit_selected: self.quit_selected,
                snapshot: &self.snapshot,
                selection: self.state.selection(),
                turns: self.state.turns(),
                next_unlock: self.state.next_unlock(),
                cursor: self.cursor,
                hint: self.hint,
                step: self.playback.front(),
                notice: self.notice.as_ref().map(|(text, _)| text.as_str()),
                last_turn: self.last_turn,
                theme: &self.theme,
                ascii: self.args.ascii,
            };
            let clear_effect = &mut self.clear_effect;
            let clear_effect_process_time = &mut self.clear_effect_process_time;
            let last_area = &mut self.last_area;
            terminal.draw(|f| {
                *last_area = f.area();
                ui::draw(f, &view, clear_effect, clear_effect_process_time, now);
            })?;

            if !self.playback.is_empty() && self.clear_effect.as_ref().is_some_and(|e| e.done()) {
                self.playback.pop_front();
                self.clear_effect = None;
                self.clear_effect_process_time = None;
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            let action = key_to_action(key);
                            self.last_input_time = Instant::now();
                            self.hint = None;
                            match self.screen {
                                Screen::Playing => self.playing_action(action)?,
                                Screen::QuitMenu => {
                                    if !self.quit_menu_action(action)? {
                                        debug!(score = self.snapshot.score, "exit");
                                        return Ok(());
                                    }
                                }
                            }
                        }
                        Event::Mouse(mouse) => self.on_mouse(mouse)?,
                        _ => {}
                    }
                }
            }
        }
    }
}
