//! Observer contract between the engine and whatever presents the game.
//!
//! The engine never draws anything. It reports what happened through a
//! [`GameObserver`], and asks it a single question: whether a challenge
//! board can be shown at all ([`GameObserver::can_present`]).

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::challenges::{ChallengeKind, ChallengeView, Verdict};
use crate::world::Target;

/// Phase of the open scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// No session is open.
    Idle,
    /// A target was picked; the instructions are on screen.
    Briefing,
    /// The challenge is launching or running.
    Calibrating,
    /// The verdict is being applied.
    Resolving,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Briefing => "briefing",
            Self::Calibrating => "calibrating",
            Self::Resolving => "resolving",
        };
        f.write_str(name)
    }
}

/// Severity of a console message shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Plain information.
    Info,
    /// Mission bookkeeping.
    System,
    /// An action the player started.
    Command,
    /// A scan succeeded.
    Success,
    /// A scan failed.
    Failure,
    /// Something went wrong and was recovered.
    Error,
}

/// Instructions shown before a challenge starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Briefing {
    /// Target being scanned.
    pub target_id: String,
    /// Its display name.
    pub target_name: String,
    /// Roster name that was drawn.
    pub challenge: String,
    /// The kind, when the name is known.
    pub kind: Option<ChallengeKind>,
    /// Popup title.
    pub title: String,
    /// Popup body.
    pub instructions: String,
}

/// Summary shown when every target has been scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRecord {
    /// Trainee designation.
    pub user_name: String,
    /// Targets scanned.
    pub scanned: usize,
    /// Targets on the map.
    pub total: usize,
    /// Earth date of completion.
    pub date: NaiveDate,
    /// `YYYY.MM.DD`.
    pub stardate: String,
}

impl CompletionRecord {
    /// Build a record dated `date`.
    #[must_use]
    pub fn new(user_name: &str, scanned: usize, total: usize, date: NaiveDate) -> Self {
        Self {
            user_name: user_name.to_string(),
            scanned,
            total,
            date,
            stardate: date.format("%Y.%m.%d").to_string(),
        }
    }

    /// Long-form earth date, e.g. `October 19, 2026`.
    #[must_use]
    pub fn earth_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}

/// Receives everything the engine reports. Every method defaults to a no-op.
pub trait GameObserver {
    /// A target started or stopped being scanned, or changed status.
    fn on_target_state_changed(&mut self, _target: &Target, _scanning: bool) {}

    /// The session moved to `phase`.
    fn on_session_phase_changed(&mut self, _phase: SessionPhase) {}

    /// Instructions for the upcoming challenge.
    fn on_briefing(&mut self, _briefing: &Briefing) {}

    /// A challenge board was brought up.
    fn on_challenge_presented(&mut self, _kind: ChallengeKind, _view: &ChallengeView) {}

    /// The running challenge reached a verdict; its message lingers briefly.
    fn on_challenge_feedback(&mut self, _verdict: &Verdict) {}

    /// A console line for the player.
    fn on_log_message(&mut self, _text: &str, _severity: Severity) {}

    /// The mission was completed, or a completed mission was loaded.
    fn on_mission_completed(&mut self, _record: &CompletionRecord) {}

    /// Whether a board for `kind` can be shown. A `false` fails that
    /// calibration at once.
    fn can_present(&self, _kind: ChallengeKind) -> bool {
        true
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl GameObserver for NullObserver {}

/// Owned copy of one observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// See [`GameObserver::on_target_state_changed`].
    TargetStateChanged {
        /// Target id.
        id: String,
        /// Whether it is scanned.
        scanned: bool,
        /// Whether a session is open on it.
        scanning: bool,
    },
    /// See [`GameObserver::on_session_phase_changed`].
    PhaseChanged(SessionPhase),
    /// See [`GameObserver::on_briefing`].
    Briefing(Briefing),
    /// See [`GameObserver::on_challenge_presented`].
    ChallengePresented(ChallengeKind),
    /// See [`GameObserver::on_challenge_feedback`].
    Feedback(Verdict),
    /// See [`GameObserver::on_log_message`].
    Log {
        /// Message text.
        text: String,
        /// Its severity.
        severity: Severity,
    },
    /// See [`GameObserver::on_mission_completed`].
    MissionCompleted(CompletionRecord),
}

/// Observer that queues every callback for later inspection.
///
/// The terminal front end drains it once per frame; tests read it directly.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
    unsupported: BTreeSet<ChallengeKind>,
}

impl EventQueue {
    /// Queue that can present every kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue that reports `kinds` as impossible to present.
    #[must_use]
    pub fn without_surfaces(kinds: impl IntoIterator<Item = ChallengeKind>) -> Self {
        Self {
            events: Vec::new(),
            unsupported: kinds.into_iter().collect(),
        }
    }

    /// Queued events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Take every queued event.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Console lines queued so far.
    pub fn messages(&self) -> impl Iterator<Item = (&str, Severity)> + '_ {
        self.events.iter().filter_map(|event| match event {
            GameEvent::Log { text, severity } => Some((text.as_str(), *severity)),
            _ => None,
        })
    }

    /// Number of completion events queued so far.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, GameEvent::MissionCompleted(_)))
            .count()
    }
}

impl GameObserver for EventQueue {
    fn on_target_state_changed(&mut self, target: &Target, scanning: bool) {
        self.events.push(GameEvent::TargetStateChanged {
            id: target.id.clone(),
            scanned: target.scanned,
            scanning,
        });
    }

    fn on_session_phase_changed(&mut self, phase: SessionPhase) {
        self.events.push(GameEvent::PhaseChanged(phase));
    }

    fn on_briefing(&mut self, briefing: &Briefing) {
        self.events.push(GameEvent::Briefing(briefing.clone()));
    }

    fn on_challenge_presented(&mut self, kind: ChallengeKind, _view: &ChallengeView) {
        self.events.push(GameEvent::ChallengePresented(kind));
    }

    fn on_challenge_feedback(&mut self, verdict: &Verdict) {
        self.events.push(GameEvent::Feedback(verdict.clone()));
    }

    fn on_log_message(&mut self, text: &str, severity: Severity) {
        self.events.push(GameEvent::Log {
            text: text.to_string(),
            severity,
        });
    }

    fn on_mission_completed(&mut self, record: &CompletionRecord) {
        self.events.push(GameEvent::MissionCompleted(record.clone()));
    }

    fn can_present(&self, kind: ChallengeKind) -> bool {
        !self.unsupported.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stardate() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let record = CompletionRecord::new("Nova", 12, 12, date);
        assert_eq!(record.stardate, "2026.03.07");
        assert_eq!(record.earth_date(), "March 7, 2026");
    }

    #[test]
    fn test_queue_drain_and_surfaces() {
        let mut queue = EventQueue::without_surfaces([ChallengeKind::Pattern]);
        assert!(!queue.can_present(ChallengeKind::Pattern));
        assert!(queue.can_present(ChallengeKind::Arithmetic));

        queue.on_log_message("hello", Severity::System);
        queue.on_session_phase_changed(SessionPhase::Briefing);
        assert_eq!(queue.messages().collect::<Vec<_>>(), vec![("hello", Severity::System)]);
        assert_eq!(queue.drain().len(), 2);
        assert!(queue.events().is_empty());
    }
}
