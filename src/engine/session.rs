//! The open scan session and its resolution token.

use crate::challenges::{ChallengeKind, Verdict};

use super::events::SessionPhase;

/// Proof of which session a resolution belongs to.
///
/// A token resolves its session at most once. After that, or once another
/// session has opened, resolving with it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolutionToken {
    session: u64,
}

impl ResolutionToken {
    /// Session this token belongs to.
    #[must_use]
    pub fn session(self) -> u64 {
        self.session
    }
}

/// One scan attempt, from target selection to resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    id: u64,
    target_id: String,
    challenge: String,
    phase: SessionPhase,
    verdict: Option<Verdict>,
}

impl ScanSession {
    pub(crate) fn open(id: u64, target_id: &str, challenge: &str) -> Self {
        Self {
            id,
            target_id: target_id.to_string(),
            challenge: challenge.to_string(),
            phase: SessionPhase::Briefing,
            verdict: None,
        }
    }

    /// Session number, unique within the process.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Target being scanned.
    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Roster name that was drawn.
    #[must_use]
    pub fn challenge_name(&self) -> &str {
        &self.challenge
    }

    /// The drawn kind, if the roster name is known.
    #[must_use]
    pub fn challenge_kind(&self) -> Option<ChallengeKind> {
        self.challenge.parse().ok()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Verdict reached by the challenge, while its feedback lingers.
    #[must_use]
    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// This session's token.
    #[must_use]
    pub fn token(&self) -> ResolutionToken {
        ResolutionToken { session: self.id }
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    pub(crate) fn set_verdict(&mut self, verdict: Verdict) {
        self.verdict = Some(verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_identifies_session() {
        let a = ScanSession::open(1, "sys-0", "pattern");
        let b = ScanSession::open(2, "sys-0", "pattern");
        assert_ne!(a.token(), b.token());
        assert_eq!(a.token().session(), 1);
        assert_eq!(a.challenge_kind(), Some(ChallengeKind::Pattern));
        assert_eq!(ScanSession::open(3, "sys-1", "qte").challenge_kind(), None);
    }
}
