//! Integration tests for the scan session controller.
//!
//! These drive [`ScanEngine`] through its public API with an in-memory
//! store and an [`EventQueue`] observer, stepping the virtual clock by hand.

use std::collections::BTreeMap;
use std::time::Duration;

use starscan::challenges::{ChallengeInput, ChallengeKind, ChallengeView};
use starscan::config::Config;
use starscan::engine::{
    EngineError, EventQueue, GameEvent, ResolveOutcome, ScanEngine, SessionPhase, Severity,
    StartupOutcome,
};
use starscan::monitor::MissionStatus;
use starscan::persist::{
    KeyValueStore, MemoryStore, PersistenceGateway, PersistentGameState, ScanRecord, StoreError,
};
use starscan::world::target_id;

// =============================================================================
// Helper Functions
// =============================================================================

type Engine = ScanEngine<MemoryStore, EventQueue>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn config(targets: usize, roster: &[&str]) -> Config {
    Config {
        seed: Some(42),
        target_count: targets,
        challenges: roster.iter().map(|s| s.to_string()).collect(),
        ..Config::default()
    }
}

fn started(config: Config) -> Engine {
    started_with(config, EventQueue::new())
}

fn started_with(config: Config, observer: EventQueue) -> Engine {
    let mut engine = ScanEngine::new(config, MemoryStore::new(), observer);
    engine.startup().unwrap();
    engine.start_mission("Nova").unwrap();
    engine
}

fn has_message(engine: &Engine, text: &str) -> bool {
    engine.observer().messages().any(|(m, _)| m == text)
}

fn store_with(state: &PersistentGameState) -> MemoryStore {
    let mut gateway = PersistenceGateway::new(MemoryStore::new());
    gateway.save(state).unwrap();
    gateway.into_inner()
}

fn scanned_records(ids: impl IntoIterator<Item = usize>) -> BTreeMap<String, ScanRecord> {
    ids.into_iter()
        .map(|i| {
            (
                target_id(i),
                ScanRecord {
                    name: format!("System {}", i + 1),
                    data: "Scan complete. Detected characteristics: Stable Orbit.".to_string(),
                },
            )
        })
        .collect()
}

/// Memory store whose removals can be made to fail.
#[derive(Debug, Default)]
struct LockableStore {
    inner: MemoryStore,
    locked: bool,
}

impl KeyValueStore for LockableStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.locked {
            return Err(StoreError::Io {
                path: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked"),
            });
        }
        self.inner.remove(key)
    }
}

// =============================================================================
// Session lifecycle
// =============================================================================

#[test]
fn test_completion_fires_exactly_once() {
    let mut engine = started(config(2, &["pattern"]));

    for id in ["sys-0", "sys-1"] {
        let token = engine.select_target(id).unwrap();
        engine.acknowledge_briefing().unwrap();
        assert_eq!(engine.resolve(token, true).unwrap(), ResolveOutcome::Applied);
    }

    assert_eq!(engine.observer().completions(), 1);
    assert_eq!(engine.mission_status(), MissionStatus::Completed);
    assert!(has_message(&engine, "All systems mapped! Mission successful!"));

    let record = engine.completion().unwrap();
    assert_eq!(record.user_name, "Nova");
    assert_eq!((record.scanned, record.total), (2, 2));

    let err = engine.select_target("sys-0").unwrap_err();
    assert!(matches!(err, EngineError::MissionNotActive { .. }));
    assert_eq!(engine.observer().completions(), 1);
}

#[test]
fn test_reselecting_scanned_target() {
    let mut engine = started(config(3, &["pattern"]));
    let token = engine.select_target("sys-2").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.resolve(token, true).unwrap();

    let err = engine.select_target("sys-2").unwrap_err();
    assert!(matches!(err, EngineError::AlreadyScanned { ref id } if id == "sys-2"));
    assert!(engine
        .observer()
        .messages()
        .any(|(m, s)| m.starts_with("System Proxima Centauri (sys-2) already scanned. Data: Scan complete.")
            && s == Severity::Info));
    assert_eq!(engine.phase(), SessionPhase::Idle);
}

#[test]
fn test_select_while_session_open() {
    let mut engine = started(config(3, &["pattern"]));
    engine.select_target("sys-0").unwrap();

    let err = engine.select_target("sys-1").unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidState {
            phase: SessionPhase::Briefing,
            ..
        }
    ));
    assert!(has_message(&engine, "Procedure already in progress."));
    assert_eq!(engine.session().unwrap().target_id(), "sys-0");
}

#[test]
fn test_unknown_target() {
    let mut engine = started(config(3, &["pattern"]));
    let err = engine.select_target("sys-99").unwrap_err();
    assert!(matches!(err, EngineError::UnknownTarget { .. }));
    assert_eq!(engine.phase(), SessionPhase::Idle);
}

#[test]
fn test_resolve_during_briefing_is_invalid() {
    let mut engine = started(config(3, &["pattern"]));
    let token = engine.select_target("sys-0").unwrap();
    let err = engine.resolve(token, true).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
    assert_eq!(engine.phase(), SessionPhase::Briefing);
}

#[test]
fn test_stale_token_is_ignored() {
    let mut engine = started(config(3, &["pattern"]));
    let first = engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    assert_eq!(engine.resolve(first, false).unwrap(), ResolveOutcome::Applied);

    let second = engine.select_target("sys-0").unwrap();
    assert_ne!(first, second);
    engine.acknowledge_briefing().unwrap();

    assert_eq!(engine.resolve(first, true).unwrap(), ResolveOutcome::Ignored);
    assert_eq!(engine.phase(), SessionPhase::Calibrating);
    assert!(!engine.world().get("sys-0").unwrap().scanned);

    assert_eq!(engine.resolve(second, true).unwrap(), ResolveOutcome::Applied);
    assert!(engine.world().get("sys-0").unwrap().scanned);
}

#[test]
fn test_reached_verdict_cannot_be_overturned() {
    let mut engine = started(config(3, &["prefix-entry"]));
    let token = engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150)).unwrap();

    let Some(ChallengeView::Prefix { target, .. }) = engine.challenge_view() else {
        panic!("expected the cipher board");
    };
    let first = target.chars().next().unwrap();
    let wrong = "!@#$%&*?".chars().find(|&c| c != first).unwrap();
    engine.input(ChallengeInput::Symbol(wrong)).unwrap();
    assert!(engine
        .observer()
        .events()
        .iter()
        .any(|e| matches!(e, GameEvent::Feedback(v) if !v.success && v.feedback == "Cipher Rejected!")));

    // The failure is lingering; a contrary outcome must not land.
    assert_eq!(engine.resolve(token, true).unwrap(), ResolveOutcome::Ignored);
    assert_eq!(engine.phase(), SessionPhase::Calibrating);
    assert!(!engine.world().get("sys-0").unwrap().scanned);

    engine.advance(ms(1500)).unwrap();
    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(!engine.world().get("sys-0").unwrap().scanned);
    assert!(has_message(
        &engine,
        "Scan failed for Alpha Centauri. Calibration unstable. Try again."
    ));
}

#[test]
fn test_late_resolutions_after_completion_are_ignored() {
    let mut engine = started(config(2, &["rate-click"]));

    let first = engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    assert_eq!(engine.resolve(first, true).unwrap(), ResolveOutcome::Applied);

    let second = engine.select_target("sys-1").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150)).unwrap();
    for _ in 0..15 {
        engine.input(ChallengeInput::Press).unwrap();
    }
    // Settle timer still pending; resolving with the reached verdict applies it now.
    assert_eq!(engine.pending_timers(), 1);
    assert_eq!(engine.resolve(second, true).unwrap(), ResolveOutcome::Applied);
    assert_eq!(engine.observer().completions(), 1);
    assert_eq!(engine.pending_timers(), 0);

    engine.advance(ms(5000)).unwrap();
    for (token, success) in [(first, true), (first, false), (second, true), (second, false)] {
        assert_eq!(engine.resolve(token, success).unwrap(), ResolveOutcome::Ignored);
    }
    assert_eq!(engine.observer().completions(), 1);
    assert_eq!(engine.mission_status(), MissionStatus::Completed);
    assert_eq!(engine.progress().scanned, 2);
}

#[test]
fn test_failed_reset_keeps_trainee_and_world() {
    let mut engine = ScanEngine::new(
        config(3, &["pattern"]),
        LockableStore::default(),
        EventQueue::new(),
    );
    engine.startup().unwrap();
    engine.start_mission("Nova").unwrap();
    let token = engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.resolve(token, true).unwrap();

    engine.gateway_mut().store_mut().locked = true;
    let err = engine.reset_mission().unwrap_err();
    assert!(matches!(err, EngineError::Persistence(_)));
    assert_eq!(engine.user_name(), "Nova");
    assert_eq!(engine.progress().scanned, 1);
    assert_eq!(engine.mission_status(), MissionStatus::InProgress);

    engine.gateway_mut().store_mut().locked = false;
    engine.reset_mission().unwrap();
    assert_eq!(engine.user_name(), "Nova");
    assert_eq!(engine.progress().scanned, 0);
    assert_eq!(engine.mission_status(), MissionStatus::InProgress);
}

#[test]
fn test_failure_leaves_target_unscanned() {
    let mut engine = started(config(3, &["pattern"]));
    let token = engine.select_target("sys-1").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.resolve(token, false).unwrap();

    assert!(!engine.world().get("sys-1").unwrap().scanned);
    assert!(has_message(
        &engine,
        "Scan failed for Sirius. Calibration unstable. Try again."
    ));
    assert_eq!(engine.mission_status(), MissionStatus::InProgress);
}

// =============================================================================
// Timers
// =============================================================================

#[test]
fn test_reset_clears_all_timers() {
    let mut engine = started(config(3, &["targets-whack"]));
    engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150)).unwrap();
    assert_eq!(engine.challenge_kind(), Some(ChallengeKind::TargetsWhack));
    assert!(engine.pending_timers() > 0);

    engine.reset_mission().unwrap();
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(engine.phase(), SessionPhase::Idle);
    engine.observer_mut().drain();

    engine.advance(ms(30_000)).unwrap();
    assert!(engine.observer().events().is_empty());
}

#[test]
fn test_verdict_timers_do_not_outlive_session() {
    let mut engine = started(config(3, &["rate-click"]));
    engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150)).unwrap();

    for _ in 0..15 {
        engine.input(ChallengeInput::Press).unwrap();
    }
    // Only the settle timer is left.
    assert_eq!(engine.pending_timers(), 1);
    engine.advance(ms(1000)).unwrap();
    assert_eq!(engine.pending_timers(), 0);
    assert!(engine.world().get("sys-0").unwrap().scanned);
}

#[test]
fn test_timeout_resolves_failure() {
    let mut engine = started(config(3, &["prefix-entry"]));
    engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150 + 10_000)).unwrap();

    let events = engine.observer().events();
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::Feedback(v) if !v.success && v.feedback == "Cipher Timed Out!")));

    engine.advance(ms(1500)).unwrap();
    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(!engine.world().get("sys-0").unwrap().scanned);
}

#[test]
fn test_zero_delays_resolve_synchronously() {
    let mut cfg = config(3, &["prefix-entry"]);
    cfg.launch_delay_ms = 0;
    cfg.feedback_delay_success_ms = 0;
    let mut engine = started(cfg);
    engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();

    let Some(ChallengeView::Prefix { target, .. }) = engine.challenge_view() else {
        panic!("expected the cipher board right away");
    };
    for symbol in target.chars() {
        engine.input(ChallengeInput::Symbol(symbol)).unwrap();
    }
    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(engine.world().get("sys-0").unwrap().scanned);
}

// =============================================================================
// Failures without a board
// =============================================================================

#[test]
fn test_missing_surface_fails_instantly() {
    let mut engine = started_with(
        config(3, &["pattern"]),
        EventQueue::without_surfaces([ChallengeKind::Pattern]),
    );
    engine.select_target("sys-0").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150)).unwrap();

    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(has_message(
        &engine,
        "Error: no display surface for pattern calibration."
    ));
    assert!(!engine
        .observer()
        .events()
        .iter()
        .any(|e| matches!(e, GameEvent::ChallengePresented(_))));
    assert_eq!(engine.pending_timers(), 0);
}

#[test]
fn test_unknown_kind_fails_instantly() {
    let mut engine = started(config(3, &["quantum-flux"]));
    engine.select_target("sys-1").unwrap();
    engine.acknowledge_briefing().unwrap();
    engine.advance(ms(150)).unwrap();

    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(has_message(
        &engine,
        "Scanner requires manual calibration. Procedure: QUANTUM-FLUX"
    ));
    assert!(has_message(
        &engine,
        "Error: unknown calibration type: quantum-flux."
    ));
    assert!(has_message(
        &engine,
        "Scan failed for Sirius. Calibration unstable. Try again."
    ));
}

// =============================================================================
// Startup
// =============================================================================

#[test]
fn test_resume_mission_in_progress() {
    let state = PersistentGameState {
        user_name: "Vega Trainee".to_string(),
        scanned_targets: scanned_records([0, 2, 3, 5, 7, 8, 11]),
        mission_in_progress: true,
    };
    let mut engine = ScanEngine::new(Config::default(), store_with(&state), EventQueue::new());

    let outcome = engine.startup().unwrap();
    assert_eq!(
        outcome,
        StartupOutcome::Resumed {
            scanned: 7,
            total: 12
        }
    );
    assert_eq!(engine.user_name(), "Vega Trainee");
    assert_eq!(engine.phase(), SessionPhase::Idle);
    assert!(engine.session().is_none());
    assert_eq!(engine.progress().to_string(), "Systems Scanned: 7 / 12");
    assert!(engine.world().get("sys-5").unwrap().scanned);
    assert!(!engine.world().get("sys-6").unwrap().scanned);
    assert!(has_message(&engine, "Resuming mission..."));
}

#[test]
fn test_startup_with_completed_record() {
    let state = PersistentGameState {
        user_name: "Nova".to_string(),
        scanned_targets: scanned_records(0..3),
        mission_in_progress: false,
    };
    let mut engine = ScanEngine::new(config(3, &["pattern"]), store_with(&state), EventQueue::new());

    let outcome = engine.startup().unwrap();
    assert!(matches!(outcome, StartupOutcome::AlreadyCompleted(_)));
    assert_eq!(engine.mission_status(), MissionStatus::Completed);
    assert!(has_message(
        &engine,
        "Mission already completed. Displaying certificate."
    ));
}

#[test]
fn test_startup_in_progress_but_all_scanned_completes() {
    let state = PersistentGameState {
        user_name: "Nova".to_string(),
        scanned_targets: scanned_records(0..3),
        mission_in_progress: true,
    };
    let mut engine = ScanEngine::new(config(3, &["pattern"]), store_with(&state), EventQueue::new());

    let outcome = engine.startup().unwrap();
    assert!(matches!(outcome, StartupOutcome::AlreadyCompleted(_)));
    assert_eq!(engine.observer().completions(), 1);
}

#[test]
fn test_fresh_startup() {
    let mut engine = ScanEngine::new(Config::default(), MemoryStore::new(), EventQueue::new());
    let outcome = engine.startup().unwrap();
    assert_eq!(
        outcome,
        StartupOutcome::Fresh {
            discarded_corrupt: false
        }
    );
    assert_eq!(engine.mission_status(), MissionStatus::NotStarted);
    assert!(has_message(&engine, "Ready for new mission."));
}

#[test]
fn test_blank_name_rejected() {
    let mut engine = ScanEngine::new(Config::default(), MemoryStore::new(), EventQueue::new());
    engine.startup().unwrap();
    assert!(matches!(
        engine.start_mission("   "),
        Err(EngineError::InvalidName)
    ));
    assert!(has_message(&engine, "Please enter your designation!"));
    assert_eq!(engine.mission_status(), MissionStatus::NotStarted);
}
