//! TUI main loop.
//!
//! Takes over the terminal (raw mode, alternate screen, hidden cursor),
//! runs the game at roughly 60 frames per second and puts the terminal back
//! on exit, including on panic.
//!
//! Each frame:
//! 1. Poll for a key with a short timeout and apply it
//! 2. Advance the engine clock by the real time since the previous frame
//! 3. Render
//!
//! # Example
//!
//! ```no_run
//! use starscan::config::Config;
//! use starscan::engine::{EventQueue, ScanEngine};
//! use starscan::persist::{KeyValueStore, MemoryStore};
//! use starscan::tui::{run_tui, App};
//!
//! let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
//! let engine = ScanEngine::new(Config::default(), store, EventQueue::new());
//! let mut app = App::new(engine).unwrap();
//! run_tui(&mut app, None).unwrap();
//! ```

use std::io::{self, Stdout};
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use thiserror::Error;

use super::app::App;
use super::keys;
use super::ui::render;
use crate::engine::EngineError;

/// Frame rate limit: 60 FPS = ~16.67ms per frame.
const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Key poll timeout.
const POLL_TIMEOUT: Duration = Duration::from_millis(16);

/// Error type for TUI operations.
#[derive(Debug, Error)]
pub enum TuiError {
    /// I/O error from terminal operations.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// The engine failed in a way the game cannot absorb.
    #[error("game error: {0}")]
    Engine(#[from] EngineError),

    /// The player pressed Ctrl+C.
    #[error("interrupted by shutdown signal")]
    Interrupted,
}

/// Result type for TUI operations.
pub type TuiResult<T> = Result<T, TuiError>;

type Terminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

/// Run the game until the player quits.
///
/// `shutdown_flag` is polled every frame; raising it ends the loop with
/// [`TuiError::Interrupted`]. The terminal is always restored.
pub fn run_tui(app: &mut App, shutdown_flag: Option<Arc<AtomicBool>>) -> TuiResult<()> {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let result = setup_terminal().and_then(|mut terminal| {
        let result = run_loop(&mut terminal, app, shutdown_flag.as_deref());
        restore_terminal()?;
        result
    });

    let _ = panic::take_hook();
    result
}

fn run_loop(
    terminal: &mut Terminal,
    app: &mut App,
    shutdown_flag: Option<&AtomicBool>,
) -> TuiResult<()> {
    let mut last_frame = Instant::now();

    loop {
        if shutdown_flag.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            log::info!("Shutdown signal received, exiting TUI");
            return Err(TuiError::Interrupted);
        }
        if app.should_quit() {
            if app.interrupted() {
                log::info!("Ctrl+C pressed, exiting TUI");
                return Err(TuiError::Interrupted);
            }
            log::debug!("App requested quit");
            return Ok(());
        }

        terminal.draw(|frame| render(frame, app))?;

        if let Some(action) = keys::poll(POLL_TIMEOUT)? {
            app.handle_action(action)?;
        }

        let elapsed = last_frame.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
        let now = Instant::now();
        app.tick(now - last_frame)?;
        last_frame = now;
    }
}

fn setup_terminal() -> TuiResult<Terminal> {
    log::debug!("Setting up terminal for TUI");
    terminal::enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

fn restore_terminal() -> TuiResult<()> {
    log::debug!("Restoring terminal");
    let _ = terminal::disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tui_error_display() {
        let tui_err = TuiError::Io(io::Error::other("test error"));
        assert!(tui_err.to_string().contains("terminal I/O error"));
        assert!(TuiError::Interrupted.to_string().contains("interrupted"));

        let engine_err = TuiError::from(EngineError::InvalidName);
        assert!(engine_err.to_string().starts_with("game error"));
    }

    #[test]
    fn test_frame_duration() {
        assert_eq!(FRAME_DURATION.as_millis(), 16);
        assert_eq!(POLL_TIMEOUT, FRAME_DURATION);
    }
}
