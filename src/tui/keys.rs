//! Key handling for the terminal front end.
//!
//! Keys are mapped to [`Action`]s without looking at the screen: letters
//! stay letters, so the name prompt and the cipher board can read them.
//! [`App`](super::App) decides what a letter means where it lands.
//!
//! | Key | Action |
//! |---|---|
//! | Arrows | navigate (also `hjkl` on the star map) |
//! | Enter | confirm, submit |
//! | Space | select, press |
//! | Esc | back, quit from the map |
//! | Ctrl+C | interrupt |
//! | Ctrl+Q | quit |

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::app::Action;

/// Map one key event to an action.
///
/// Only key presses count; release and repeat events from terminals that
/// report them are dropped.
#[must_use]
pub fn resolve(key: &KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Interrupt),
            KeyCode::Char('q') => Some(Action::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up => Some(Action::NavigateUp),
        KeyCode::Down => Some(Action::NavigateDown),
        KeyCode::Left => Some(Action::NavigateLeft),
        KeyCode::Right => Some(Action::NavigateRight),
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(' ') => Some(Action::Press),
        KeyCode::Char(c) => Some(Action::Char(c)),
        _ => None,
    }
}

/// Wait up to `timeout` for a key and map it.
pub fn poll(timeout: Duration) -> std::io::Result<Option<Action>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) => Ok(resolve(&key)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(resolve(&key(KeyCode::Up)), Some(Action::NavigateUp));
        assert_eq!(resolve(&key(KeyCode::Right)), Some(Action::NavigateRight));
        assert_eq!(resolve(&key(KeyCode::Enter)), Some(Action::Confirm));
        assert_eq!(resolve(&key(KeyCode::Char(' '))), Some(Action::Press));
    }

    #[test]
    fn test_letters_pass_through() {
        assert_eq!(resolve(&key(KeyCode::Char('k'))), Some(Action::Char('k')));
        assert_eq!(resolve(&key(KeyCode::Char('#'))), Some(Action::Char('#')));
    }

    #[test]
    fn test_control_keys() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(resolve(&ctrl_c), Some(Action::Interrupt));
        let ctrl_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(resolve(&ctrl_x), None);
    }

    #[test]
    fn test_release_ignored() {
        let mut release = key(KeyCode::Enter);
        release.kind = KeyEventKind::Release;
        assert_eq!(resolve(&release), None);
    }
}
