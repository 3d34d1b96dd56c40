//! Calibration challenges.
//!
//! Every scan attempt is gated by one short timed challenge. All seven kinds
//! share the [`Challenge`] contract:
//!
//! * [`Challenge::start`] arms whatever timers the challenge needs,
//! * [`Challenge::on_timer`] and [`Challenge::on_input`] advance it,
//! * each of the three returns a [`Step`], and the first
//!   [`Step::Verdict`] ends the challenge,
//! * [`Challenge::cancel`] stops it without a verdict.
//!
//! Challenges never touch the clock directly. They schedule work through a
//! [`ChallengeCtx`] that wraps the session's [`TimerRegistry`], so every
//! pending callback is owned by the registry and disappears with it.
//!
//! # Architecture
//!
//! * [`pattern`]: memorise a flashed set of grid cells
//! * [`timed_hit`]: stop a moving marker inside a target zone
//! * [`sequence`]: repeat a flashed colour sequence
//! * [`rate_click`]: register enough presses before the countdown ends
//! * [`arithmetic`]: evaluate a three-operand expression
//! * [`whack`]: hit the active cell of a grid until the score is reached
//! * [`prefix`]: type a symbol string without a single mistake

pub mod arithmetic;
pub mod pattern;
pub mod prefix;
pub mod rate_click;
pub mod sequence;
pub mod timed_hit;
pub mod whack;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timers::{TimerError, TimerId, TimerRegistry, TimerTag};

pub use arithmetic::{ArithmeticChallenge, Expression, Operator};
pub use pattern::PatternChallenge;
pub use prefix::PrefixChallenge;
pub use rate_click::RateClickChallenge;
pub use sequence::{SequenceChallenge, PALETTE};
pub use timed_hit::TimedHitChallenge;
pub use whack::WhackChallenge;

/// The seven calibration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeKind {
    /// Memorise and replicate a flashed set of cells.
    Pattern,
    /// Stop a moving marker inside the target zone.
    TimedHit,
    /// Repeat a flashed colour sequence in order.
    SequenceRecall,
    /// Press often enough before time runs out.
    RateClick,
    /// Solve a short expression.
    Arithmetic,
    /// Hit active cells until the score threshold.
    TargetsWhack,
    /// Type a symbol string exactly.
    PrefixEntry,
}

impl ChallengeKind {
    /// Every kind, in roster order.
    pub const ALL: [ChallengeKind; 7] = [
        ChallengeKind::Pattern,
        ChallengeKind::TimedHit,
        ChallengeKind::SequenceRecall,
        ChallengeKind::RateClick,
        ChallengeKind::Arithmetic,
        ChallengeKind::TargetsWhack,
        ChallengeKind::PrefixEntry,
    ];

    /// Stable configuration name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::TimedHit => "timed-hit",
            Self::SequenceRecall => "sequence-recall",
            Self::RateClick => "rate-click",
            Self::Arithmetic => "arithmetic",
            Self::TargetsWhack => "targets-whack",
            Self::PrefixEntry => "prefix-entry",
        }
    }

    /// Title shown on the briefing and challenge popups.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Pattern => "Pattern Calibration",
            Self::TimedHit => "Timing Calibration",
            Self::SequenceRecall => "Sequence Memory Calibration",
            Self::RateClick => "Power Surge Calibration",
            Self::Arithmetic => "Arithmetic Calibration",
            Self::TargetsWhack => "Signal Lock Calibration",
            Self::PrefixEntry => "Cipher Entry Calibration",
        }
    }

    /// Briefing text for this kind under the given tuning.
    #[must_use]
    pub fn instructions(self, tuning: &Tuning) -> String {
        match self {
            Self::Pattern => {
                "Memorize the highlighted pattern on the grid, then replicate it exactly."
                    .to_string()
            }
            Self::TimedHit => "Press the button precisely when the moving indicator enters \
                 the highlighted target zone."
                .to_string(),
            Self::SequenceRecall => format!(
                "A sequence of {} colors will flash. Pick the colors in the same order.",
                tuning.sequence.length
            ),
            Self::RateClick => format!(
                "Press the target {} times before {:.1}s run out!",
                tuning.rate_click.target,
                tuning.rate_click.budget_ms as f64 / 1000.0
            ),
            Self::Arithmetic => format!(
                "Solve the expression within {}s. Multiplication binds first.",
                tuning.arithmetic.time_limit_ms / 1000
            ),
            Self::TargetsWhack => format!(
                "Hit the active cell {} times within {}s.",
                tuning.whack.threshold,
                tuning.whack.budget_ms / 1000
            ),
            Self::PrefixEntry => format!(
                "Type the {}-symbol cipher. A single wrong symbol aborts the calibration.",
                tuning.prefix.length
            ),
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A roster name that matches no challenge kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown challenge kind: '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for ChallengeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Player input addressed to the running challenge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChallengeInput {
    /// Pick a grid cell or palette entry (zero-based).
    Select(usize),
    /// Confirm a pattern selection.
    Submit,
    /// The single action button (stop the marker, register a press).
    Press,
    /// A numeric answer.
    Answer(f64),
    /// One typed symbol.
    Symbol(char),
}

/// Errors for input a challenge cannot take.
///
/// None of these fail the calibration; the player can keep going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChallengeError {
    /// The challenge is still presenting or has already concluded.
    #[error("{kind} is not accepting input right now")]
    NotAccepting {
        /// Kind that rejected the input.
        kind: ChallengeKind,
    },

    /// The input does not apply to this kind.
    #[error("{kind} does not take {input}")]
    WrongInput {
        /// Kind that rejected the input.
        kind: ChallengeKind,
        /// Short description of the rejected input.
        input: String,
    },

    /// A cell or palette index outside the board.
    #[error("selection {index} is out of range (0..{len})")]
    OutOfRange {
        /// The index given.
        index: usize,
        /// Number of valid choices.
        len: usize,
    },

    /// Submit pressed before enough cells were picked.
    #[error("selection incomplete: {selected} of {required} cells")]
    Incomplete {
        /// Cells picked so far.
        selected: usize,
        /// Cells needed.
        required: usize,
    },

    /// The challenge could not schedule its timers.
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),
}

impl ChallengeError {
    pub(crate) fn wrong_input(kind: ChallengeKind, input: ChallengeInput) -> Self {
        Self::WrongInput {
            kind,
            input: format!("{:?}", input),
        }
    }
}

/// The outcome of a finished challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the calibration passed.
    pub success: bool,
    /// Feedback line shown to the player.
    pub feedback: String,
}

/// Result of driving a challenge one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Still running.
    Continue,
    /// Finished; no further steps will produce another verdict.
    Verdict(Verdict),
}

impl Step {
    pub(crate) fn pass(feedback: &str) -> Self {
        Self::Verdict(Verdict {
            success: true,
            feedback: feedback.to_string(),
        })
    }

    pub(crate) fn fail(feedback: &str) -> Self {
        Self::Verdict(Verdict {
            success: false,
            feedback: feedback.to_string(),
        })
    }

    /// The verdict, if this step concluded the challenge.
    #[must_use]
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Continue => None,
            Self::Verdict(v) => Some(v),
        }
    }
}

/// Timer access handed to a challenge while it runs.
#[derive(Debug)]
pub struct ChallengeCtx<'a> {
    timers: &'a mut TimerRegistry,
}

impl<'a> ChallengeCtx<'a> {
    /// Wrap the registry that holds the session's timers.
    pub fn new(timers: &'a mut TimerRegistry) -> Self {
        Self { timers }
    }

    /// Current clock time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Schedule `tag` once after `delay`.
    pub fn arm(&mut self, tag: TimerTag, delay: Duration) -> Result<TimerId, TimerError> {
        self.timers.arm(tag, delay)
    }

    /// Schedule `tag` every `period`.
    pub fn arm_repeating(
        &mut self,
        tag: TimerTag,
        period: Duration,
    ) -> Result<TimerId, TimerError> {
        self.timers.arm_repeating(tag, period)
    }

    /// Cancel one timer.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }
}

/// Render-facing snapshot of a running challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeView {
    /// Pattern grid.
    Pattern {
        /// Side length of the square grid.
        grid_size: usize,
        /// Cell currently flashed.
        lit: Option<usize>,
        /// Cells the player has picked.
        selected: Vec<usize>,
        /// Cells to pick.
        required: usize,
        /// Whether the flash phase is over.
        accepting: bool,
    },
    /// Marker bar, positions in percent of the bar.
    TimedHit {
        /// Marker position.
        marker: f64,
        /// Left edge of the target zone.
        zone_start: f64,
        /// Width of the target zone.
        zone_width: f64,
        /// Whether the marker was stopped.
        stopped: bool,
    },
    /// Colour sequence.
    Sequence {
        /// Palette index on display.
        showing: Option<usize>,
        /// Colours entered so far.
        entered: usize,
        /// Sequence length.
        length: usize,
        /// Whether the flash phase is over.
        accepting: bool,
    },
    /// Press counter.
    RateClick {
        /// Presses so far.
        presses: u32,
        /// Presses needed.
        target: u32,
        /// Time left.
        remaining: Duration,
    },
    /// Expression to solve.
    Arithmetic {
        /// Rendered expression.
        expression: String,
        /// Time left.
        remaining: Duration,
    },
    /// Whack grid.
    Whack {
        /// Side length of the square grid.
        grid_size: usize,
        /// Active cell.
        active: Option<usize>,
        /// Hits so far.
        score: u32,
        /// Hits needed.
        threshold: u32,
        /// Time left.
        remaining: Duration,
    },
    /// Cipher entry.
    Prefix {
        /// String to type.
        target: String,
        /// What has been typed.
        entered: String,
        /// Time left.
        remaining: Duration,
    },
}

/// The uniform contract every calibration implements.
pub trait Challenge: fmt::Debug {
    /// Which kind this is.
    fn kind(&self) -> ChallengeKind;

    /// Arm the challenge's timers. May conclude immediately.
    fn start(&mut self, ctx: &mut ChallengeCtx<'_>) -> Result<Step, ChallengeError>;

    /// React to one of the challenge's own timers.
    fn on_timer(&mut self, tag: TimerTag, ctx: &mut ChallengeCtx<'_>)
        -> Result<Step, ChallengeError>;

    /// React to player input.
    fn on_input(
        &mut self,
        input: ChallengeInput,
        ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError>;

    /// Stop without a verdict. Later calls produce no verdict.
    fn cancel(&mut self);

    /// Snapshot for rendering at clock time `now`.
    fn view(&self, now: Duration) -> ChallengeView;
}

/// Build a fresh challenge of `kind`, drawing its randomness from `rng`.
pub fn build<R: Rng + ?Sized>(
    kind: ChallengeKind,
    tuning: &Tuning,
    rng: &mut R,
) -> Box<dyn Challenge> {
    match kind {
        ChallengeKind::Pattern => Box::new(PatternChallenge::new(&tuning.pattern, rng)),
        ChallengeKind::TimedHit => Box::new(TimedHitChallenge::new(&tuning.timed_hit, rng)),
        ChallengeKind::SequenceRecall => {
            Box::new(SequenceChallenge::new(&tuning.sequence, rng))
        }
        ChallengeKind::RateClick => Box::new(RateClickChallenge::new(&tuning.rate_click)),
        ChallengeKind::Arithmetic => {
            Box::new(ArithmeticChallenge::new(&tuning.arithmetic, rng))
        }
        ChallengeKind::TargetsWhack => Box::new(WhackChallenge::new(&tuning.whack, rng)),
        ChallengeKind::PrefixEntry => Box::new(PrefixChallenge::new(&tuning.prefix, rng)),
    }
}

/// Time left until `deadline`, zero once passed or when not started.
pub(crate) fn remaining(deadline: Option<Duration>, now: Duration) -> Duration {
    deadline.map_or(Duration::ZERO, |d| d.saturating_sub(now))
}

// ==================== Tuning ====================

/// Per-kind constants, loaded from the `[tuning]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Tuning {
    /// Pattern constants.
    pub pattern: PatternTuning,
    /// Timed-hit constants.
    pub timed_hit: TimedHitTuning,
    /// Sequence-recall constants.
    pub sequence: SequenceTuning,
    /// Rate-click constants.
    pub rate_click: RateClickTuning,
    /// Arithmetic constants.
    pub arithmetic: ArithmeticTuning,
    /// Targets-whack constants.
    pub whack: WhackTuning,
    /// Prefix-entry constants.
    pub prefix: PrefixTuning,
}

/// Pattern constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTuning {
    pub grid_size: usize,
    pub cells: usize,
    pub flash_every_ms: u64,
    pub lit_ms: u64,
}

impl Default for PatternTuning {
    fn default() -> Self {
        Self {
            grid_size: 3,
            cells: 4,
            flash_every_ms: 600,
            lit_ms: 400,
        }
    }
}

/// Timed-hit constants. Positions are percent of the bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimedHitTuning {
    pub zone_min_width: f64,
    pub zone_max_width: f64,
    /// The zone's right edge never passes this position.
    pub zone_limit: f64,
    pub travel_min_ms: u64,
    pub travel_max_ms: u64,
    pub grace_ms: u64,
}

impl Default for TimedHitTuning {
    fn default() -> Self {
        Self {
            zone_min_width: 10.0,
            zone_max_width: 20.0,
            zone_limit: 75.0,
            travel_min_ms: 1500,
            travel_max_ms: 2500,
            grace_ms: 100,
        }
    }
}

/// Sequence-recall constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTuning {
    pub length: usize,
    pub flash_every_ms: u64,
    pub lit_ms: u64,
}

impl Default for SequenceTuning {
    fn default() -> Self {
        Self {
            length: 5,
            flash_every_ms: 800,
            lit_ms: 500,
        }
    }
}

/// Rate-click constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateClickTuning {
    pub target: u32,
    pub budget_ms: u64,
    pub tick_ms: u64,
}

impl Default for RateClickTuning {
    fn default() -> Self {
        Self {
            target: 15,
            budget_ms: 5000,
            tick_ms: 100,
        }
    }
}

/// Arithmetic constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArithmeticTuning {
    pub min_operand: i64,
    pub max_operand: i64,
    pub tolerance: f64,
    pub time_limit_ms: u64,
}

impl Default for ArithmeticTuning {
    fn default() -> Self {
        Self {
            min_operand: 1,
            max_operand: 12,
            tolerance: 0.01,
            time_limit_ms: 15_000,
        }
    }
}

/// Targets-whack constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhackTuning {
    pub grid_size: usize,
    pub spawn_every_ms: u64,
    pub threshold: u32,
    pub budget_ms: u64,
}

impl Default for WhackTuning {
    fn default() -> Self {
        Self {
            grid_size: 3,
            spawn_every_ms: 800,
            threshold: 5,
            budget_ms: 10_000,
        }
    }
}

/// Prefix-entry constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefixTuning {
    pub length: usize,
    pub symbols: String,
    pub time_limit_ms: u64,
}

impl Default for PrefixTuning {
    fn default() -> Self {
        Self {
            length: 5,
            symbols: "!@#$%&*?".to_string(),
            time_limit_ms: 10_000,
        }
    }
}
