//! Timing calibration: stop a moving marker inside the target zone.

use std::time::Duration;

use rand::Rng;

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView, Step,
    TimedHitTuning,
};
use crate::timers::TimerTag;

/// A marker travels linearly from 0 % to 100 % of a bar. One press stops it;
/// the calibration passes when the stop position lies inside the zone.
/// If nobody presses, a fallback deadline of travel time plus grace fails it.
#[derive(Debug)]
pub struct TimedHitChallenge {
    zone_start: f64,
    zone_width: f64,
    travel: Duration,
    grace: Duration,
    started_at: Option<Duration>,
    stopped_at: Option<f64>,
    done: bool,
}

impl TimedHitChallenge {
    /// Draw zone and travel time from `rng`.
    pub fn new<R: Rng + ?Sized>(tuning: &TimedHitTuning, rng: &mut R) -> Self {
        let min_width = tuning.zone_min_width.min(tuning.zone_max_width);
        let width = rng.gen_range(min_width..=tuning.zone_max_width);
        let max_start = (tuning.zone_limit - width).max(0.0);
        let start = rng.gen_range(0.0..=max_start);
        let min_travel = tuning.travel_min_ms.min(tuning.travel_max_ms);
        let travel = rng.gen_range(min_travel..=tuning.travel_max_ms);
        Self::with_zone(tuning, start, width, Duration::from_millis(travel))
    }

    /// Use a fixed zone and travel time.
    pub fn with_zone(
        tuning: &TimedHitTuning,
        zone_start: f64,
        zone_width: f64,
        travel: Duration,
    ) -> Self {
        Self {
            zone_start,
            zone_width,
            travel: travel.max(Duration::from_millis(1)),
            grace: Duration::from_millis(tuning.grace_ms),
            started_at: None,
            stopped_at: None,
            done: false,
        }
    }

    /// Marker position in percent at clock time `now`.
    #[must_use]
    pub fn marker_at(&self, now: Duration) -> f64 {
        if let Some(stopped) = self.stopped_at {
            return stopped;
        }
        let Some(started) = self.started_at else {
            return 0.0;
        };
        let elapsed = now.saturating_sub(started).as_secs_f64();
        (elapsed / self.travel.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }

    /// Whether `position` lies inside the zone, edges included.
    #[must_use]
    pub fn in_zone(&self, position: f64) -> bool {
        position >= self.zone_start && position <= self.zone_start + self.zone_width
    }
}

impl Challenge for TimedHitChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::TimedHit
    }

    fn start(&mut self, ctx: &mut ChallengeCtx<'_>) -> Result<Step, ChallengeError> {
        self.started_at = Some(ctx.now());
        ctx.arm(TimerTag::Deadline, self.travel + self.grace)?;
        Ok(Step::Continue)
    }

    fn on_timer(
        &mut self,
        tag: TimerTag,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done || tag != TimerTag::Deadline {
            return Ok(Step::Continue);
        }
        self.done = true;
        self.stopped_at = Some(100.0);
        Ok(Step::fail("Calibration Timed Out!"))
    }

    fn on_input(
        &mut self,
        input: ChallengeInput,
        ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done {
            return Err(ChallengeError::NotAccepting { kind: self.kind() });
        }
        if input != ChallengeInput::Press {
            return Err(ChallengeError::wrong_input(self.kind(), input));
        }
        let position = self.marker_at(ctx.now());
        self.stopped_at = Some(position);
        self.done = true;
        log::debug!(
            "Marker stopped at {:.1}% (zone {:.1}..{:.1})",
            position,
            self.zone_start,
            self.zone_start + self.zone_width
        );
        Ok(if self.in_zone(position) {
            Step::pass("Calibration Lock Acquired!")
        } else {
            Step::fail("Timing Mismatch!")
        })
    }

    fn cancel(&mut self) {
        self.done = true;
    }

    fn view(&self, now: Duration) -> ChallengeView {
        ChallengeView::TimedHit {
            marker: self.marker_at(now),
            zone_start: self.zone_start,
            zone_width: self.zone_width,
            stopped: self.stopped_at.is_some(),
        }
    }
}
