//! Ctrl+C handling.
//!
//! A single shared flag records that the player interrupted the game. The
//! terminal loop polls it every frame and exits cleanly; the process then
//! exits with [`ExitCode::Interrupted`](crate::error::ExitCode::Interrupted).
//!
//! ```rust,no_run
//! use starscan::signal::install_handler;
//!
//! let shutdown = install_handler().expect("signal handler");
//! while !shutdown.is_shutdown_requested() {
//!     // draw a frame, advance the clock
//!     # break;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared "stop now" flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// A handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag by hand.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The underlying flag, for code that only needs to poll it.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Failure to register the Ctrl+C handler.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// ctrlc refused the handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Register the process-wide Ctrl+C handler, once.
///
/// Later calls return the registered handler with its flag lowered, so
/// tests can run the app repeatedly in one process.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();
    let registered = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Saving and leaving orbit...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    });

    match registered {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered; using an unregistered flag");
            Ok(handler)
        }
        Err(err) => Err(SignalError::InstallFailed(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_round_trip() {
        let handler = ShutdownHandler::new();
        assert!(!handler.is_shutdown_requested());
        handler.request_shutdown();
        assert!(handler.is_shutdown_requested());
        handler.reset();
        assert!(!handler.is_shutdown_requested());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let handler = ShutdownHandler::new();
        let clone = handler.clone();
        handler.get_flag().store(true, Ordering::SeqCst);
        assert!(clone.is_shutdown_requested());
    }
}
