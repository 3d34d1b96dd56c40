//! Errors raised by the scan engine.

use thiserror::Error;

use super::events::SessionPhase;
use crate::challenges::{ChallengeError, ChallengeKind};
use crate::persist::{CorruptState, StoreError};
use crate::timers::TimerError;

/// Errors raised by the scan engine.
///
/// None of these end the game. Rejected calls leave the state untouched;
/// the recovered kinds (`UnknownChallengeKind`, `ResourceMissing`,
/// `PersistenceCorrupt`) are logged to the console and handled in place.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation does not apply in the current phase.
    #[error("cannot {operation} while {phase}")]
    InvalidState {
        /// Operation attempted.
        operation: &'static str,
        /// Phase at the time.
        phase: SessionPhase,
    },

    /// No mission is running.
    #[error("cannot {operation}: mission not active")]
    MissionNotActive {
        /// Operation attempted.
        operation: &'static str,
    },

    /// The target has already been scanned.
    #[error("target {id} is already scanned")]
    AlreadyScanned {
        /// Target id.
        id: String,
    },

    /// No target has this id.
    #[error("unknown target: {id}")]
    UnknownTarget {
        /// Requested id.
        id: String,
    },

    /// The drawn roster entry names no challenge.
    #[error("unknown calibration type: {0}")]
    UnknownChallengeKind(String),

    /// The stored record could not be used.
    #[error("saved progress is corrupt: {0}")]
    PersistenceCorrupt(CorruptState),

    /// The front end cannot show this challenge.
    #[error("no display surface for {0} calibration")]
    ResourceMissing(ChallengeKind),

    /// Blank trainee designation.
    #[error("please enter your designation")]
    InvalidName,

    /// Timer slot misuse.
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// Storage backend failure.
    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// The running challenge rejected the input.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

impl EngineError {
    /// Whether this is a rejected call rather than a backend failure.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Persistence(_) | Self::Timer(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EngineError::InvalidState {
            operation: "select a target",
            phase: SessionPhase::Briefing,
        };
        assert_eq!(err.to_string(), "cannot select a target while briefing");
        assert!(err.is_rejection());

        let err = EngineError::ResourceMissing(ChallengeKind::TargetsWhack);
        assert_eq!(
            err.to_string(),
            "no display surface for targets-whack calibration"
        );
    }
}
