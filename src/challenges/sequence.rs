//! Sequence memory calibration: repeat a flashed colour sequence.

use std::time::Duration;

use rand::Rng;

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView,
    SequenceTuning, Step,
};
use crate::timers::{TimerId, TimerTag};

/// Colours the sequence is drawn from.
pub const PALETTE: [&str; 5] = ["red", "blue", "green", "yellow", "purple"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Presenting,
    Accepting,
    Done,
}

/// Flashes a fixed-length colour sequence, then takes the player's picks.
/// The attempt is only judged once it reaches full length.
#[derive(Debug)]
pub struct SequenceChallenge {
    target: Vec<usize>,
    entered: Vec<usize>,
    flashed: usize,
    showing: Option<usize>,
    stage: Stage,
    flash_every: Duration,
    lit_for: Duration,
    flash_timer: Option<TimerId>,
}

impl SequenceChallenge {
    /// Draw a random sequence; colours may repeat.
    pub fn new<R: Rng + ?Sized>(tuning: &SequenceTuning, rng: &mut R) -> Self {
        let target = (0..tuning.length.max(1))
            .map(|_| rng.gen_range(0..PALETTE.len()))
            .collect();
        Self::with_sequence(tuning, target)
    }

    /// Use a fixed sequence of palette indices.
    pub fn with_sequence(tuning: &SequenceTuning, target: Vec<usize>) -> Self {
        Self {
            target,
            entered: Vec::new(),
            flashed: 0,
            showing: None,
            stage: Stage::Presenting,
            flash_every: Duration::from_millis(tuning.flash_every_ms),
            lit_for: Duration::from_millis(tuning.lit_ms),
            flash_timer: None,
        }
    }

    /// The sequence, as palette indices.
    #[must_use]
    pub fn target(&self) -> &[usize] {
        &self.target
    }
}

impl Challenge for SequenceChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::SequenceRecall
    }

    fn start(&mut self, ctx: &mut ChallengeCtx<'_>) -> Result<Step, ChallengeError> {
        self.flash_timer = Some(ctx.arm_repeating(TimerTag::Flash, self.flash_every)?);
        Ok(Step::Continue)
    }

    fn on_timer(
        &mut self,
        tag: TimerTag,
        ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.stage != Stage::Presenting {
            return Ok(Step::Continue);
        }
        match tag {
            TimerTag::Flash if self.flashed >= self.target.len() => {
                if let Some(id) = self.flash_timer.take() {
                    ctx.cancel(id);
                }
                self.showing = None;
                self.stage = Stage::Accepting;
            }
            TimerTag::Flash => {
                self.showing = Some(self.target[self.flashed]);
                self.flashed += 1;
                ctx.arm(TimerTag::FlashOff, self.lit_for)?;
            }
            TimerTag::FlashOff => self.showing = None,
            _ => {}
        }
        Ok(Step::Continue)
    }

    fn on_input(
        &mut self,
        input: ChallengeInput,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.stage != Stage::Accepting {
            return Err(ChallengeError::NotAccepting { kind: self.kind() });
        }
        let ChallengeInput::Select(colour) = input else {
            return Err(ChallengeError::wrong_input(self.kind(), input));
        };
        if colour >= PALETTE.len() {
            return Err(ChallengeError::OutOfRange {
                index: colour,
                len: PALETTE.len(),
            });
        }

        self.entered.push(colour);
        if self.entered.len() < self.target.len() {
            return Ok(Step::Continue);
        }

        self.stage = Stage::Done;
        Ok(if self.entered == self.target {
            Step::pass("Sequence Matched!")
        } else {
            Step::fail("Sequence Incorrect!")
        })
    }

    fn cancel(&mut self) {
        self.stage = Stage::Done;
        self.showing = None;
    }

    fn view(&self, _now: Duration) -> ChallengeView {
        ChallengeView::Sequence {
            showing: self.showing,
            entered: self.entered.len(),
            length: self.target.len(),
            accepting: self.stage == Stage::Accepting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timers::TimerRegistry;

    fn presented(target: Vec<usize>) -> (SequenceChallenge, TimerRegistry) {
        let mut timers = TimerRegistry::new();
        timers.acquire(1).unwrap();
        let mut challenge = SequenceChallenge::with_sequence(&SequenceTuning::default(), target);
        challenge.start(&mut ChallengeCtx::new(&mut timers)).unwrap();
        // Five flashes at 800..4000, accepting on the sixth tick.
        let until = Duration::from_millis(4800);
        while let Some(fired) = timers.pop_due(until) {
            challenge
                .on_timer(fired.tag, &mut ChallengeCtx::new(&mut timers))
                .unwrap();
        }
        (challenge, timers)
    }

    fn enter(
        challenge: &mut SequenceChallenge,
        timers: &mut TimerRegistry,
        colours: &[usize],
    ) -> Step {
        let mut last = Step::Continue;
        for &c in colours {
            last = challenge
                .on_input(ChallengeInput::Select(c), &mut ChallengeCtx::new(timers))
                .unwrap();
        }
        last
    }

    #[test]
    fn test_exact_order_passes() {
        let (mut challenge, mut timers) = presented(vec![0, 3, 3, 1, 4]);
        let step = enter(&mut challenge, &mut timers, &[0, 3, 3, 1, 4]);
        assert!(step.verdict().unwrap().success);
    }

    #[test]
    fn test_wrong_order_fails_only_at_full_length() {
        let (mut challenge, mut timers) = presented(vec![0, 3, 3, 1, 4]);
        let partial = enter(&mut challenge, &mut timers, &[4, 1]);
        assert_eq!(partial, Step::Continue);
        let step = enter(&mut challenge, &mut timers, &[3, 3, 0]);
        assert_eq!(step.verdict().unwrap().feedback, "Sequence Incorrect!");
    }

    #[test]
    fn test_rejects_input_during_flash() {
        let mut timers = TimerRegistry::new();
        timers.acquire(1).unwrap();
        let mut challenge =
            SequenceChallenge::with_sequence(&SequenceTuning::default(), vec![0, 1, 2, 3, 4]);
        challenge.start(&mut ChallengeCtx::new(&mut timers)).unwrap();
        let err = challenge
            .on_input(ChallengeInput::Select(0), &mut ChallengeCtx::new(&mut timers))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::NotAccepting { .. }));
    }

    #[test]
    fn test_palette_bounds() {
        let (mut challenge, mut timers) = presented(vec![0, 1, 2, 3, 4]);
        let err = challenge
            .on_input(ChallengeInput::Select(5), &mut ChallengeCtx::new(&mut timers))
            .unwrap_err();
        assert_eq!(err, ChallengeError::OutOfRange { index: 5, len: 5 });
    }

    #[test]
    fn test_flash_timer_released_after_presenting() {
        let (_challenge, timers) = presented(vec![0, 1, 2, 3, 4]);
        assert_eq!(timers.pending(), 0);
    }
}
