//! Power surge calibration: register enough presses before the budget runs out.

use std::time::Duration;

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView,
    RateClickTuning, Step,
};
use crate::timers::TimerTag;

/// Counts presses against a countdown that ticks down in fixed steps.
///
/// Reaching the target passes immediately. On every tick the target is
/// checked before the budget, so a target met on the tick that empties the
/// budget still passes.
#[derive(Debug)]
pub struct RateClickChallenge {
    presses: u32,
    target: u32,
    remaining: Duration,
    tick: Duration,
    done: bool,
}

impl RateClickChallenge {
    /// Build from tuning; there is nothing random about this one.
    pub fn new(tuning: &RateClickTuning) -> Self {
        Self {
            presses: 0,
            target: tuning.target.max(1),
            remaining: Duration::from_millis(tuning.budget_ms),
            tick: Duration::from_millis(tuning.tick_ms.max(1)),
            done: false,
        }
    }

    /// Presses registered so far.
    #[must_use]
    pub fn presses(&self) -> u32 {
        self.presses
    }

    /// Budget left.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    fn on_tick(&mut self) -> Step {
        self.remaining = self.remaining.saturating_sub(self.tick);
        if self.presses >= self.target {
            self.done = true;
            return Step::pass("Power Stabilized!");
        }
        if self.remaining.is_zero() {
            self.done = true;
            return Step::fail("Insufficient Power Output!");
        }
        Step::Continue
    }
}

impl Challenge for RateClickChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::RateClick
    }

    fn start(&mut self, ctx: &mut ChallengeCtx<'_>) -> Result<Step, ChallengeError> {
        ctx.arm_repeating(TimerTag::Tick, self.tick)?;
        Ok(Step::Continue)
    }

    fn on_timer(
        &mut self,
        tag: TimerTag,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done || tag != TimerTag::Tick {
            return Ok(Step::Continue);
        }
        Ok(self.on_tick())
    }

    fn on_input(
        &mut self,
        input: ChallengeInput,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done {
            return Err(ChallengeError::NotAccepting { kind: self.kind() });
        }
        if input != ChallengeInput::Press {
            return Err(ChallengeError::wrong_input(self.kind(), input));
        }
        self.presses += 1;
        if self.presses >= self.target {
            self.done = true;
            return Ok(Step::pass("Power Stabilized!"));
        }
        Ok(Step::Continue)
    }

    fn cancel(&mut self) {
        self.done = true;
    }

    fn view(&self, _now: Duration) -> ChallengeView {
        ChallengeView::RateClick {
            presses: self.presses,
            target: self.target,
            remaining: self.remaining,
        }
    }
}
