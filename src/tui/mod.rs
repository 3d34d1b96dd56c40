//! Terminal front end.
//!
//! Plays the game with ratatui on a crossterm backend:
//! - [`app`]: front-end state wrapped around the scan engine
//! - [`keys`]: key events to [`Action`]s
//! - [`ui`]: rendering
//! - [`run`]: terminal setup and the frame loop
//! - [`theme`]: colours
//!
//! Data flows one way: keys become actions, actions drive the engine, the
//! engine reports through its event queue, and the screen is drawn from
//! the resulting state.

pub mod app;
pub mod keys;
pub mod run;
pub mod theme;
pub mod ui;

pub use app::{Action, App, ConsoleLine, Engine, Screen};
pub use run::{run_tui, TuiError, TuiResult};
pub use theme::Theme;
pub use ui::{format_seconds, render, truncate_string};
