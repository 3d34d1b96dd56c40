//! Application state for the terminal front end.
//!
//! [`App`] wraps the scan engine and keeps what only the screen needs: the
//! name being typed, cursors, the console backlog and the popups. Every
//! frame it drains the engine's [`EventQueue`] and folds the events into
//! that state.

use std::collections::VecDeque;
use std::time::Duration;

use crate::challenges::{ChallengeInput, ChallengeKind, Verdict, PALETTE};
use crate::engine::{
    Briefing, CompletionRecord, EngineError, EventQueue, GameEvent, ScanEngine, SessionPhase,
    Severity, StartupOutcome,
};
use crate::persist::KeyValueStore;
use crate::world::Target;

use super::theme::Theme;

/// Engine type driven by the front end.
pub type Engine = ScanEngine<Box<dyn KeyValueStore>, EventQueue>;

/// Console lines kept for display.
pub const CONSOLE_LIMIT: usize = 100;

/// Targets per row on the star map.
pub const MAP_COLUMNS: usize = 4;

/// Longest accepted trainee designation.
pub const NAME_LIMIT: usize = 24;

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Name entry.
    #[default]
    Welcome,
    /// Star map with console; popups for briefing and challenge.
    Map,
    /// Mission summary.
    Completed,
}

/// User action triggered by keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NavigateUp,
    NavigateDown,
    NavigateLeft,
    NavigateRight,
    /// Enter.
    Confirm,
    /// Space.
    Press,
    /// Esc.
    Cancel,
    Backspace,
    /// Any other printable key.
    Char(char),
    /// Leave the game.
    Quit,
    /// Ctrl+C while the terminal is in raw mode.
    Interrupt,
}

/// One line of the in-game console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub text: String,
    pub severity: Severity,
}

/// Front-end state.
#[derive(Debug)]
pub struct App {
    engine: Engine,
    screen: Screen,
    name_input: String,
    cursor: usize,
    board_cursor: usize,
    answer: String,
    console: VecDeque<ConsoleLine>,
    briefing: Option<Briefing>,
    feedback: Option<Verdict>,
    completion: Option<CompletionRecord>,
    confirm_reset: bool,
    notice: Option<String>,
    theme: Theme,
    should_quit: bool,
    interrupted: bool,
}

impl App {
    /// Wrap `engine`, load stored progress and pick the opening screen.
    pub fn new(engine: Engine) -> Result<Self, EngineError> {
        let mut app = Self {
            engine,
            screen: Screen::Welcome,
            name_input: String::new(),
            cursor: 0,
            board_cursor: 0,
            answer: String::new(),
            console: VecDeque::new(),
            briefing: None,
            feedback: None,
            completion: None,
            confirm_reset: false,
            notice: None,
            theme: Theme::default(),
            should_quit: false,
            interrupted: false,
        };

        let outcome = app.engine.startup()?;
        log::debug!("Startup outcome: {:?}", outcome);
        app.screen = match outcome {
            StartupOutcome::Resumed { .. } => Screen::Map,
            StartupOutcome::AlreadyCompleted(_) => Screen::Completed,
            StartupOutcome::Fresh { .. } => {
                app.name_input = app.engine.user_name().to_string();
                Screen::Welcome
            }
        };
        app.sync();
        Ok(app)
    }

    /// Use `theme` for rendering.
    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    // ==================== Accessors ====================

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn name_input(&self) -> &str {
        &self.name_input
    }

    /// Index of the highlighted target on the map.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Highlighted cell or palette entry inside the challenge board.
    pub fn board_cursor(&self) -> usize {
        self.board_cursor
    }

    /// Numeric answer being typed.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn console(&self) -> impl DoubleEndedIterator<Item = &ConsoleLine> + ExactSizeIterator {
        self.console.iter()
    }

    pub fn briefing(&self) -> Option<&Briefing> {
        self.briefing.as_ref()
    }

    /// Verdict on display while it lingers.
    pub fn feedback(&self) -> Option<&Verdict> {
        self.feedback.as_ref()
    }

    pub fn completion(&self) -> Option<&CompletionRecord> {
        self.completion.as_ref()
    }

    pub fn confirm_reset(&self) -> bool {
        self.confirm_reset
    }

    /// Short status text for a rejected action.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Whether the player left with Ctrl+C.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Target under the map cursor.
    pub fn selected_target(&self) -> Option<&Target> {
        self.engine.world().targets().get(self.cursor)
    }

    /// Id of the target with an open session.
    pub fn scanning_target(&self) -> Option<&str> {
        self.engine.session().map(|s| s.target_id())
    }

    // ==================== Frame updates ====================

    /// Advance the engine clock by the real time since the last frame.
    pub fn tick(&mut self, elapsed: Duration) -> Result<(), EngineError> {
        let result = self.engine.advance(elapsed);
        self.sync();
        result
    }

    /// Fold queued engine events into front-end state.
    fn sync(&mut self) {
        for event in self.engine.observer_mut().drain() {
            match event {
                GameEvent::Log { text, severity } => {
                    if self.console.len() == CONSOLE_LIMIT {
                        self.console.pop_front();
                    }
                    self.console.push_back(ConsoleLine { text, severity });
                }
                GameEvent::Briefing(briefing) => self.briefing = Some(briefing),
                GameEvent::PhaseChanged(SessionPhase::Calibrating) => self.briefing = None,
                GameEvent::PhaseChanged(SessionPhase::Idle) => {
                    self.briefing = None;
                    self.feedback = None;
                    self.answer.clear();
                    self.board_cursor = 0;
                }
                GameEvent::PhaseChanged(_) | GameEvent::TargetStateChanged { .. } => {}
                GameEvent::ChallengePresented(_) => {
                    self.feedback = None;
                    self.answer.clear();
                    self.board_cursor = 0;
                }
                GameEvent::Feedback(verdict) => self.feedback = Some(verdict),
                GameEvent::MissionCompleted(record) => {
                    self.completion = Some(record);
                    self.screen = Screen::Completed;
                }
            }
        }
    }

    // ==================== Action Handling ====================

    /// Apply one player action.
    ///
    /// Actions the engine rejects become a notice; only storage and timer
    /// failures are returned.
    pub fn handle_action(&mut self, action: Action) -> Result<(), EngineError> {
        log::trace!("Handling action: {:?} on {:?}", action, self.screen);
        self.notice = None;

        if action == Action::Interrupt {
            self.interrupted = true;
            self.should_quit = true;
            return Ok(());
        }
        if action == Action::Quit {
            self.should_quit = true;
            return Ok(());
        }

        let result = match self.screen {
            Screen::Welcome => self.on_welcome(action),
            Screen::Map => self.on_map(action),
            Screen::Completed => self.on_completed(action),
        };
        self.sync();
        self.absorb(result)
    }

    fn absorb(&mut self, result: Result<(), EngineError>) -> Result<(), EngineError> {
        match result {
            Err(err) if err.is_rejection() => {
                log::debug!("Action rejected: {}", err);
                self.notice = Some(err.to_string());
                Ok(())
            }
            other => other,
        }
    }

    fn on_welcome(&mut self, action: Action) -> Result<(), EngineError> {
        match action {
            Action::Char(c) if !c.is_control() && self.name_input.chars().count() < NAME_LIMIT => {
                self.name_input.push(c);
            }
            Action::Press if self.name_input.chars().count() < NAME_LIMIT => {
                self.name_input.push(' ');
            }
            Action::Backspace => {
                self.name_input.pop();
            }
            Action::Confirm => {
                self.engine.start_mission(&self.name_input)?;
                self.cursor = 0;
                self.completion = None;
                self.screen = Screen::Map;
            }
            Action::Cancel => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn on_completed(&mut self, action: Action) -> Result<(), EngineError> {
        match action {
            Action::Confirm => {
                let name = self.engine.user_name().to_string();
                self.engine.cancel_mission()?;
                self.name_input = name;
                self.completion = None;
                self.cursor = 0;
                self.screen = Screen::Welcome;
            }
            Action::Cancel | Action::Char('q') => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn on_map(&mut self, action: Action) -> Result<(), EngineError> {
        match self.engine.phase() {
            SessionPhase::Idle if self.confirm_reset => self.on_reset_prompt(action),
            SessionPhase::Idle => self.on_star_map(action),
            SessionPhase::Briefing => match action {
                Action::Confirm | Action::Press => self.engine.acknowledge_briefing(),
                _ => Ok(()),
            },
            SessionPhase::Calibrating => self.on_challenge(action),
            SessionPhase::Resolving => Ok(()),
        }
    }

    fn on_reset_prompt(&mut self, action: Action) -> Result<(), EngineError> {
        match action {
            Action::Confirm | Action::Char('y') | Action::Char('Y') => {
                self.confirm_reset = false;
                self.engine.reset_mission()?;
                self.cursor = 0;
            }
            Action::Cancel | Action::Char('n') | Action::Char('N') => self.confirm_reset = false,
            _ => {}
        }
        Ok(())
    }

    fn on_star_map(&mut self, action: Action) -> Result<(), EngineError> {
        let count = self.engine.world().count();
        match vim_navigation(action) {
            Action::NavigateUp
            | Action::NavigateDown
            | Action::NavigateLeft
            | Action::NavigateRight => {
                self.cursor = move_in_grid(self.cursor, count, MAP_COLUMNS, vim_navigation(action));
            }
            Action::Confirm | Action::Press => {
                if let Some(id) = self.selected_target().map(|t| t.id.clone()) {
                    self.engine.select_target(&id)?;
                }
            }
            Action::Char('r') => self.confirm_reset = true,
            Action::Char('q') | Action::Cancel => self.should_quit = true,
            _ => {}
        }
        Ok(())
    }

    fn on_challenge(&mut self, action: Action) -> Result<(), EngineError> {
        if self.feedback.is_some() {
            return Ok(());
        }
        let Some(kind) = self.engine.challenge_kind() else {
            return Ok(());
        };

        let input = match kind {
            ChallengeKind::Pattern | ChallengeKind::TargetsWhack => {
                let side = self.grid_side(kind);
                match action {
                    Action::NavigateUp
                    | Action::NavigateDown
                    | Action::NavigateLeft
                    | Action::NavigateRight => {
                        self.board_cursor =
                            move_in_grid(self.board_cursor, side * side, side, action);
                        None
                    }
                    Action::Char(c) => c
                        .to_digit(10)
                        .filter(|d| *d >= 1)
                        .map(|d| ChallengeInput::Select(d as usize - 1)),
                    Action::Press => Some(ChallengeInput::Select(self.board_cursor)),
                    Action::Confirm if kind == ChallengeKind::Pattern => {
                        Some(ChallengeInput::Submit)
                    }
                    Action::Confirm => Some(ChallengeInput::Select(self.board_cursor)),
                    _ => None,
                }
            }
            ChallengeKind::SequenceRecall => match action {
                Action::NavigateLeft | Action::NavigateRight => {
                    self.board_cursor =
                        move_in_grid(self.board_cursor, PALETTE.len(), PALETTE.len(), action);
                    None
                }
                Action::Char(c) => c
                    .to_digit(10)
                    .filter(|d| *d >= 1)
                    .map(|d| ChallengeInput::Select(d as usize - 1)),
                Action::Press | Action::Confirm => Some(ChallengeInput::Select(self.board_cursor)),
                _ => None,
            },
            ChallengeKind::TimedHit | ChallengeKind::RateClick => match action {
                Action::Press | Action::Confirm => Some(ChallengeInput::Press),
                _ => None,
            },
            ChallengeKind::Arithmetic => match action {
                Action::Char(c) if c.is_ascii_digit() || c == '-' || c == '.' => {
                    self.answer.push(c);
                    None
                }
                Action::Backspace => {
                    self.answer.pop();
                    None
                }
                Action::Confirm => match self.answer.trim().parse::<f64>() {
                    Ok(value) => Some(ChallengeInput::Answer(value)),
                    Err(_) => {
                        self.notice = Some("Enter a number first.".to_string());
                        None
                    }
                },
                _ => None,
            },
            ChallengeKind::PrefixEntry => match action {
                Action::Char(c) if !c.is_whitespace() => Some(ChallengeInput::Symbol(c)),
                _ => None,
            },
        };

        match input {
            Some(input) => self.engine.input(input),
            None => Ok(()),
        }
    }

    fn grid_side(&self, kind: ChallengeKind) -> usize {
        let tuning = &self.engine.config().tuning;
        match kind {
            ChallengeKind::Pattern => tuning.pattern.grid_size,
            _ => tuning.whack.grid_size,
        }
        .max(1)
    }
}

/// hjkl as arrows.
fn vim_navigation(action: Action) -> Action {
    match action {
        Action::Char('k') => Action::NavigateUp,
        Action::Char('j') => Action::NavigateDown,
        Action::Char('h') => Action::NavigateLeft,
        Action::Char('l') => Action::NavigateRight,
        other => other,
    }
}

/// Move `index` one step inside a row-major grid of `len` cells.
pub fn move_in_grid(index: usize, len: usize, columns: usize, action: Action) -> usize {
    if len == 0 || columns == 0 {
        return 0;
    }
    let index = index.min(len - 1);
    match action {
        Action::NavigateLeft if index % columns > 0 => index - 1,
        Action::NavigateRight if index % columns + 1 < columns && index + 1 < len => index + 1,
        Action::NavigateUp if index >= columns => index - columns,
        Action::NavigateDown if index + columns < len => index + columns,
        _ => index,
    }
}
