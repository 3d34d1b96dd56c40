//! Process exit codes and structured error output.

use serde::Serialize;

/// Exit codes for the starscan binary.
///
/// - 0: Success
/// - 1: General error (bad config, unreadable store, terminal failure)
/// - 130: Interrupted by the player (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Finished normally.
    Success = 0,
    /// Something failed.
    GeneralError = 1,
    /// Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "SS000",
            Self::GeneralError => "SS001",
            Self::Interrupted => "SS130",
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Code prefix, e.g. `SS001`.
    pub code: String,
    /// Numeric exit code.
    pub exit_code: i32,
    /// Error message including its context chain.
    pub message: String,
    /// Whether the run was interrupted.
    pub interrupted: bool,
}

impl StructuredError {
    /// Describe `err`, exiting with `exit_code`.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{:#}", err),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
