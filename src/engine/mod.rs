//! Scan session controller.
//!
//! [`ScanEngine`] sequences every scan attempt:
//!
//! ```text
//! Idle ─select_target─▶ Briefing ─acknowledge_briefing─▶ Calibrating
//!   ▲                                                        │
//!   └──────────────────────── Resolving ◀──── resolve ───────┘
//! ```
//!
//! It owns the world, the mission monitor, the timer registry and the
//! persistence gateway, and reports everything through a [`GameObserver`].
//! Time is virtual: [`ScanEngine::advance`] moves the clock and runs every
//! timer that comes due, one at a time, earliest first.
//!
//! # Resolution
//!
//! Every session hands out a [`ResolutionToken`]. The first
//! [`ScanEngine::resolve`] for a session applies and closes it; any later
//! call with the same token is ignored. Before a verdict is applied all of
//! the session's timers are cleared, so a timeout can never resolve a
//! session that has already ended or a session that replaced it.
//!
//! # Example
//!
//! ```
//! use starscan::config::Config;
//! use starscan::engine::{NullObserver, ResolveOutcome, ScanEngine, SessionPhase};
//! use starscan::persist::MemoryStore;
//!
//! let config = Config { seed: Some(7), ..Config::default() };
//! let mut engine = ScanEngine::new(config, MemoryStore::new(), NullObserver);
//! engine.startup().unwrap();
//! engine.start_mission("Nova").unwrap();
//!
//! let token = engine.select_target("sys-0").unwrap();
//! assert_eq!(engine.phase(), SessionPhase::Briefing);
//! engine.acknowledge_briefing().unwrap();
//!
//! assert_eq!(engine.resolve(token, true).unwrap(), ResolveOutcome::Applied);
//! assert_eq!(engine.resolve(token, false).unwrap(), ResolveOutcome::Ignored);
//! assert_eq!(engine.progress().scanned, 1);
//! ```

pub mod error;
pub mod events;
pub mod session;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::Local;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::challenges::{
    self, Challenge, ChallengeCtx, ChallengeInput, ChallengeKind, ChallengeView, Step, Verdict,
};
use crate::config::Config;
use crate::monitor::{MissionMonitor, MissionStatus};
use crate::persist::{
    KeyValueStore, LoadResult, PersistenceGateway, PersistentGameState, StoreError,
};
use crate::timers::{TimerRegistry, TimerTag};
use crate::world::WorldState;

pub use error::EngineError;
pub use events::{
    Briefing, CompletionRecord, EventQueue, GameEvent, GameObserver, NullObserver, SessionPhase,
    Severity,
};
pub use session::{ResolutionToken, ScanSession};

/// Characteristics a successful scan can report.
pub const CHARACTERISTICS: [&str; 5] = [
    "Stable Orbit",
    "High Radiation",
    "Trace Organics",
    "Metallic Asteroids",
    "Subspace Anomaly",
];

/// Data text stored for a freshly scanned target.
pub fn scan_data<R: Rng + ?Sized>(rng: &mut R) -> String {
    let characteristic = CHARACTERISTICS[rng.gen_range(0..CHARACTERISTICS.len())];
    format!("Scan complete. Detected characteristics: {}.", characteristic)
}

/// What [`ScanEngine::startup`] found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    /// A mission in progress was restored.
    Resumed {
        /// Targets already scanned.
        scanned: usize,
        /// Targets on the map.
        total: usize,
    },
    /// The stored mission is finished.
    AlreadyCompleted(CompletionRecord),
    /// Nothing usable was stored; waiting for a new mission.
    Fresh {
        /// A corrupt record was found and removed.
        discarded_corrupt: bool,
    },
}

/// Result of [`ScanEngine::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The verdict was applied and the session closed.
    Applied,
    /// The token was stale; nothing changed.
    Ignored,
}

/// Scanned versus total targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Targets scanned.
    pub scanned: usize,
    /// Targets on the map.
    pub total: usize,
}

impl Progress {
    /// Share scanned, 0 to 100.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.scanned as f64 * 100.0 / self.total as f64
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Systems Scanned: {} / {}", self.scanned, self.total)
    }
}

/// The scan session controller.
#[derive(Debug)]
pub struct ScanEngine<S, O> {
    config: Config,
    rng: StdRng,
    gateway: PersistenceGateway<S>,
    observer: O,
    world: WorldState,
    monitor: MissionMonitor,
    timers: TimerRegistry,
    user_name: String,
    session: Option<ScanSession>,
    challenge: Option<Box<dyn Challenge>>,
    completion: Option<CompletionRecord>,
    next_session: u64,
}

impl<S: KeyValueStore, O: GameObserver> ScanEngine<S, O> {
    /// Create an engine with no mission. Call [`startup`](Self::startup)
    /// to pick up stored progress.
    pub fn new(config: Config, store: S, observer: O) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            gateway: PersistenceGateway::new(store),
            observer,
            world: WorldState::new(),
            monitor: MissionMonitor::new(),
            timers: TimerRegistry::new(),
            user_name: String::new(),
            session: None,
            challenge: None,
            completion: None,
            next_session: 1,
        }
    }

    // ==================== Queries ====================

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Phase of the open session, `Idle` when none is open.
    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map_or(SessionPhase::Idle, ScanSession::phase)
    }

    /// Mission-level status.
    pub fn mission_status(&self) -> MissionStatus {
        self.monitor.status()
    }

    /// The open session.
    pub fn session(&self) -> Option<&ScanSession> {
        self.session.as_ref()
    }

    /// Target roster.
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Current trainee designation.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Virtual clock.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Time of the next pending timer.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Number of pending timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Scan progress.
    pub fn progress(&self) -> Progress {
        Progress {
            scanned: self.world.scanned_count(),
            total: self.world.count(),
        }
    }

    /// Kind of the challenge on screen.
    pub fn challenge_kind(&self) -> Option<ChallengeKind> {
        self.challenge.as_ref().map(|c| c.kind())
    }

    /// Board of the challenge on screen, including while its verdict lingers.
    pub fn challenge_view(&self) -> Option<ChallengeView> {
        self.challenge.as_ref().map(|c| c.view(self.timers.now()))
    }

    /// Completion summary once the mission is finished.
    pub fn completion(&self) -> Option<&CompletionRecord> {
        self.completion.as_ref()
    }

    /// The observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// The persistence gateway.
    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    /// The persistence gateway, mutably.
    pub fn gateway_mut(&mut self) -> &mut PersistenceGateway<S> {
        &mut self.gateway
    }

    // ==================== Mission lifecycle ====================

    /// Load stored progress and decide where to resume.
    pub fn startup(&mut self) -> Result<StartupOutcome, EngineError> {
        self.force_clear();
        let (state, discarded_corrupt) = match self.gateway.load()? {
            LoadResult::Found(state) => (Some(state), false),
            LoadResult::NotFound => (None, false),
            LoadResult::Corrupt(reason) => {
                let err = EngineError::PersistenceCorrupt(reason);
                log::warn!("{}", err);
                self.emit_log("Error loading saved progress. Starting fresh.", Severity::Error);
                (None, true)
            }
        };

        if let Some(state) = state {
            self.user_name = state.user_name.clone();
            self.world.rebuild(
                self.config.target_count,
                &self.config.system_names,
                &state.scanned_targets,
            );

            if state.mission_in_progress {
                self.monitor.begin();
                self.emit_log("Resuming mission...", Severity::System);
                if self.monitor.check(&self.world) {
                    let record = self.complete_mission();
                    return Ok(StartupOutcome::AlreadyCompleted(record));
                }
                let progress = self.progress();
                log::info!("Resumed mission for {}: {}", self.user_name, progress);
                return Ok(StartupOutcome::Resumed {
                    scanned: progress.scanned,
                    total: progress.total,
                });
            }

            if self.world.is_complete() {
                self.monitor.restore_completed();
                self.emit_log(
                    "Mission already completed. Displaying certificate.",
                    Severity::System,
                );
                let record = self.completion_record();
                self.completion = Some(record.clone());
                self.observer.on_mission_completed(&record);
                return Ok(StartupOutcome::AlreadyCompleted(record));
            }
        }

        self.world.clear();
        self.monitor.reset();
        self.gateway.clear()?;
        self.emit_log("Ready for new mission.", Severity::System);
        Ok(StartupOutcome::Fresh { discarded_corrupt })
    }

    /// Start a fresh mission for `name`.
    pub fn start_mission(&mut self, name: &str) -> Result<(), EngineError> {
        let name = name.trim();
        if name.is_empty() {
            self.emit_log("Please enter your designation!", Severity::Error);
            return Err(EngineError::InvalidName);
        }

        self.force_clear();
        self.user_name = name.to_string();
        self.world.rebuild(
            self.config.target_count,
            &self.config.system_names,
            &BTreeMap::new(),
        );
        self.monitor.begin();
        self.completion = None;
        self.emit_log(
            &format!("Mission started for Trainee {}. Begin scanning Sector 7G.", name),
            Severity::System,
        );
        self.save_progress();
        Ok(())
    }

    /// Wipe progress and immediately start over with the same trainee.
    pub fn reset_mission(&mut self) -> Result<(), EngineError> {
        self.emit_log("Mission progress has been reset by user.", Severity::System);
        self.wipe()?;
        let name = std::mem::take(&mut self.user_name);
        if name.trim().is_empty() {
            self.emit_log("Ready for new mission.", Severity::System);
            return Ok(());
        }
        self.start_mission(&name)
    }

    /// Wipe everything, the trainee included.
    pub fn cancel_mission(&mut self) -> Result<(), EngineError> {
        self.wipe()?;
        self.user_name.clear();
        self.emit_log("Ready for new mission.", Severity::System);
        Ok(())
    }

    // ==================== Scan sessions ====================

    /// Open a session on target `id` and draw its challenge.
    pub fn select_target(&mut self, id: &str) -> Result<ResolutionToken, EngineError> {
        const OPERATION: &str = "select a target";

        if !self.monitor.status().is_active() {
            self.emit_log("Mission not active. Please start first.", Severity::Error);
            return Err(EngineError::MissionNotActive {
                operation: OPERATION,
            });
        }
        if let Some(phase) = self.session.as_ref().map(ScanSession::phase) {
            self.emit_log("Procedure already in progress.", Severity::Error);
            return Err(EngineError::InvalidState {
                operation: OPERATION,
                phase,
            });
        }

        let Some((name, scanned, data)) = self
            .world
            .get(id)
            .map(|t| (t.name.clone(), t.scanned, t.data.clone()))
        else {
            self.emit_log(&format!("Unknown target: {}", id), Severity::Error);
            return Err(EngineError::UnknownTarget { id: id.to_string() });
        };
        if scanned {
            self.emit_log(
                &format!(
                    "System {} ({}) already scanned. Data: {}",
                    name,
                    id,
                    data.unwrap_or_default()
                ),
                Severity::Info,
            );
            return Err(EngineError::AlreadyScanned { id: id.to_string() });
        }

        let session_id = self.next_session;
        self.timers.acquire(session_id)?;
        self.next_session += 1;

        let challenge = self
            .config
            .challenges
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();
        log::debug!(
            "Session {} opened on {} with challenge '{}'",
            session_id,
            id,
            challenge
        );

        self.emit_log(
            &format!("Initiating scan for {} ({})...", name, id),
            Severity::Command,
        );
        let session = ScanSession::open(session_id, id, &challenge);
        let token = session.token();
        self.session = Some(session);
        self.notify_target(id, true);
        self.set_phase(SessionPhase::Briefing);

        let briefing = self.briefing(id, &name, &challenge);
        self.observer.on_briefing(&briefing);
        Ok(token)
    }

    /// Leave the briefing; the challenge starts after the launch delay.
    pub fn acknowledge_briefing(&mut self) -> Result<(), EngineError> {
        let phase = self.phase();
        if phase != SessionPhase::Briefing {
            return Err(EngineError::InvalidState {
                operation: "acknowledge the briefing",
                phase,
            });
        }

        self.set_phase(SessionPhase::Calibrating);
        let delay = Duration::from_millis(self.config.launch_delay_ms);
        if delay.is_zero() {
            return self.launch();
        }
        self.timers.arm(TimerTag::Launch, delay)?;
        Ok(())
    }

    /// Forward player input to the running challenge.
    ///
    /// Input the challenge cannot take right now is rejected without
    /// failing the calibration.
    pub fn input(&mut self, input: ChallengeInput) -> Result<(), EngineError> {
        let phase = self.phase();
        let awaiting = phase == SessionPhase::Calibrating
            && self.session.as_ref().is_some_and(|s| s.verdict().is_none());
        let Some(challenge) = self.challenge.as_mut().filter(|_| awaiting) else {
            return Err(EngineError::InvalidState {
                operation: "send calibration input",
                phase,
            });
        };
        let step = challenge.on_input(input, &mut ChallengeCtx::new(&mut self.timers))?;
        self.apply_step(step)
    }

    /// Move the clock forward by `elapsed`, running every timer that comes due.
    pub fn advance(&mut self, elapsed: Duration) -> Result<(), EngineError> {
        let until = self.timers.now() + elapsed;
        let result = self.run_due(until);
        self.timers.advance_to(until);
        result
    }

    fn run_due(&mut self, until: Duration) -> Result<(), EngineError> {
        while let Some(fired) = self.timers.pop_due(until) {
            if self.session.as_ref().map(ScanSession::id) != Some(fired.owner) {
                log::trace!("Dropping {:?} of closed session {}", fired.tag, fired.owner);
                continue;
            }
            self.dispatch(fired.tag)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, tag: TimerTag) -> Result<(), EngineError> {
        match tag {
            TimerTag::Launch => self.launch(),
            TimerTag::Settle(success) => {
                if let Some(token) = self.session.as_ref().map(ScanSession::token) {
                    self.resolve(token, success)?;
                }
                Ok(())
            }
            tag => {
                let Some(challenge) = self.challenge.as_mut() else {
                    return Ok(());
                };
                match challenge.on_timer(tag, &mut ChallengeCtx::new(&mut self.timers)) {
                    Ok(step) => self.apply_step(step),
                    Err(err) => self.fail_instantly(&EngineError::Challenge(err)),
                }
            }
        }
    }

    /// Apply the outcome of the session `token` belongs to.
    ///
    /// The first call for a session wins. Later calls with the same token,
    /// or calls after the session was discarded, return
    /// [`ResolveOutcome::Ignored`].
    pub fn resolve(
        &mut self,
        token: ResolutionToken,
        success: bool,
    ) -> Result<ResolveOutcome, EngineError> {
        let phase = match self.session.as_ref() {
            Some(session) if session.token() == token => {
                // A reached verdict is final; only its own settle may apply it.
                if let Some(verdict) = session.verdict().filter(|v| v.success != success) {
                    log::debug!(
                        "Ignoring resolution against the {} verdict of session {}",
                        if verdict.success { "passed" } else { "failed" },
                        token.session()
                    );
                    return Ok(ResolveOutcome::Ignored);
                }
                session.phase()
            }
            _ => {
                log::debug!("Ignoring stale resolution for session {}", token.session());
                return Ok(ResolveOutcome::Ignored);
            }
        };
        if phase != SessionPhase::Calibrating {
            return Err(EngineError::InvalidState {
                operation: "resolve a calibration",
                phase,
            });
        }

        self.timers.clear_all();
        if let Some(mut challenge) = self.challenge.take() {
            challenge.cancel();
        }
        self.set_phase(SessionPhase::Resolving);
        let Some(session) = self.session.take() else {
            return Ok(ResolveOutcome::Ignored);
        };

        let target_id = session.target_id();
        match self.world.get(target_id).map(|t| t.name.clone()) {
            None => self.emit_log("Error: Target system lost during scan.", Severity::Error),
            Some(name) if success => {
                let data = scan_data(&mut self.rng);
                self.world.mark_scanned(target_id, &data);
                self.emit_log(
                    &format!("Scan successful for {}! {}", name, data),
                    Severity::Success,
                );
                self.save_progress();
            }
            Some(name) => self.emit_log(
                &format!("Scan failed for {}. Calibration unstable. Try again.", name),
                Severity::Failure,
            ),
        }

        self.notify_target(target_id, false);
        self.observer.on_session_phase_changed(SessionPhase::Idle);
        if self.monitor.check(&self.world) {
            self.complete_mission();
        }
        Ok(ResolveOutcome::Applied)
    }

    // ==================== Internals ====================

    fn launch(&mut self) -> Result<(), EngineError> {
        let Some(name) = self
            .session
            .as_ref()
            .map(|s| s.challenge_name().to_string())
        else {
            return Ok(());
        };
        self.emit_log(
            &format!(
                "Scanner requires manual calibration. Procedure: {}",
                name.to_uppercase()
            ),
            Severity::System,
        );

        let Ok(kind) = name.parse::<ChallengeKind>() else {
            return self.fail_instantly(&EngineError::UnknownChallengeKind(name));
        };
        if !self.observer.can_present(kind) {
            return self.fail_instantly(&EngineError::ResourceMissing(kind));
        }

        let mut challenge = challenges::build(kind, &self.config.tuning, &mut self.rng);
        let started = challenge.start(&mut ChallengeCtx::new(&mut self.timers));
        let view = challenge.view(self.timers.now());
        self.challenge = Some(challenge);
        match started {
            Ok(step) => {
                self.observer.on_challenge_presented(kind, &view);
                self.apply_step(step)
            }
            Err(err) => self.fail_instantly(&EngineError::Challenge(err)),
        }
    }

    fn apply_step(&mut self, step: Step) -> Result<(), EngineError> {
        match step {
            Step::Continue => Ok(()),
            Step::Verdict(verdict) => self.conclude(verdict),
        }
    }

    /// Show the verdict, then resolve once the feedback has lingered.
    fn conclude(&mut self, verdict: Verdict) -> Result<(), EngineError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if session.verdict().is_some() {
            return Ok(());
        }
        let (id, token) = (session.id(), session.token());
        session.set_verdict(verdict.clone());

        self.timers.clear_all();
        self.observer.on_challenge_feedback(&verdict);

        let linger = if verdict.success {
            self.config.feedback_delay_success_ms
        } else {
            self.config.feedback_delay_failure_ms
        };
        if linger == 0 {
            return self.resolve(token, verdict.success).map(|_| ());
        }
        self.timers.acquire(id)?;
        self.timers.arm(
            TimerTag::Settle(verdict.success),
            Duration::from_millis(linger),
        )?;
        Ok(())
    }

    /// Fail the open calibration at once, without a feedback linger.
    fn fail_instantly(&mut self, err: &EngineError) -> Result<(), EngineError> {
        log::warn!("Calibration aborted: {}", err);
        self.emit_log(&format!("Error: {}.", err), Severity::Error);
        match self.session.as_ref().map(ScanSession::token) {
            Some(token) => self.resolve(token, false).map(|_| ()),
            None => Ok(()),
        }
    }

    fn complete_mission(&mut self) -> CompletionRecord {
        self.emit_log("All systems mapped! Mission successful!", Severity::System);
        if let Err(err) = self.persist() {
            self.report_store_error(&err);
        }
        let record = self.completion_record();
        log::info!(
            "Mission completed by {} on stardate {}",
            record.user_name,
            record.stardate
        );
        self.completion = Some(record.clone());
        self.observer.on_mission_completed(&record);
        record
    }

    fn completion_record(&self) -> CompletionRecord {
        CompletionRecord::new(
            &self.user_name,
            self.world.scanned_count(),
            self.world.count(),
            Local::now().date_naive(),
        )
    }

    fn briefing(&self, target_id: &str, target_name: &str, challenge: &str) -> Briefing {
        let kind = challenge.parse::<ChallengeKind>().ok();
        let (title, instructions) = match kind {
            Some(kind) => (
                format!("Upcoming Scan: {}", kind.title()),
                kind.instructions(&self.config.tuning),
            ),
            None => (
                "Upcoming Scan: Unknown Calibration".to_string(),
                "Scan type could not be determined.".to_string(),
            ),
        };
        Briefing {
            target_id: target_id.to_string(),
            target_name: target_name.to_string(),
            challenge: challenge.to_string(),
            kind,
            title,
            instructions,
        }
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let state = PersistentGameState {
            user_name: self.user_name.clone(),
            scanned_targets: self.world.scanned_records(),
            mission_in_progress: self.monitor.status().is_active(),
        };
        self.gateway.save(&state)
    }

    fn save_progress(&mut self) {
        match self.persist() {
            Ok(()) if self.monitor.status().is_active() => {
                self.emit_log("Progress saved.", Severity::System);
            }
            Ok(()) => {}
            Err(err) => self.report_store_error(&err),
        }
    }

    fn report_store_error(&mut self, err: &StoreError) {
        log::error!("Failed to save progress: {}", err);
        self.emit_log(&format!("Error saving progress: {}", err), Severity::Error);
    }

    fn wipe(&mut self) -> Result<(), EngineError> {
        self.force_clear();
        self.gateway.clear()?;
        self.world.clear();
        self.monitor.reset();
        self.completion = None;
        Ok(())
    }

    /// Drop the open session and every pending timer.
    fn force_clear(&mut self) {
        let dropped = self.timers.clear_all();
        if let Some(mut challenge) = self.challenge.take() {
            challenge.cancel();
        }
        if let Some(session) = self.session.take() {
            log::debug!(
                "Discarded session {} on {} ({} pending timers)",
                session.id(),
                session.target_id(),
                dropped
            );
            self.notify_target(session.target_id(), false);
            self.observer.on_session_phase_changed(SessionPhase::Idle);
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if let Some(session) = self.session.as_mut() {
            session.set_phase(phase);
        }
        self.observer.on_session_phase_changed(phase);
    }

    fn notify_target(&mut self, id: &str, scanning: bool) {
        if let Some(target) = self.world.get(id) {
            self.observer.on_target_state_changed(target, scanning);
        }
    }

    fn emit_log(&mut self, text: &str, severity: Severity) {
        match severity {
            Severity::Error => log::warn!("{}", text),
            Severity::Info => log::debug!("{}", text),
            _ => log::info!("{}", text),
        }
        self.observer.on_log_message(text, severity);
    }
}
