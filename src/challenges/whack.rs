//! Signal lock calibration: hit the active cell until the score is reached.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView, Step,
    WhackTuning,
};
use crate::timers::TimerTag;

/// One cell of the grid is active at a time and moves on a fixed interval.
/// Hitting it scores a point and clears it until the next move. Misses cost
/// nothing. Reaching the threshold ends the challenge at once.
#[derive(Debug)]
pub struct WhackChallenge {
    grid_size: usize,
    active: Option<usize>,
    score: u32,
    threshold: u32,
    spawn_every: Duration,
    budget: Duration,
    deadline: Option<Duration>,
    rng: StdRng,
    done: bool,
}

impl WhackChallenge {
    /// Seed the board's own generator from `rng`.
    pub fn new<R: Rng + ?Sized>(tuning: &WhackTuning, rng: &mut R) -> Self {
        Self {
            grid_size: tuning.grid_size.max(1),
            active: None,
            score: 0,
            threshold: tuning.threshold.max(1),
            spawn_every: Duration::from_millis(tuning.spawn_every_ms),
            budget: Duration::from_millis(tuning.budget_ms),
            deadline: None,
            rng: StdRng::seed_from_u64(rng.gen()),
            done: false,
        }
    }

    /// Currently active cell.
    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Hits so far.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// Activate a random cell, different from the current one when possible.
    fn spawn(&mut self) {
        let cells = self.cell_count();
        let mut next = self.rng.gen_range(0..cells);
        if cells > 1 && Some(next) == self.active {
            next = (next + 1 + self.rng.gen_range(0..cells - 1)) % cells;
        }
        self.active = Some(next);
    }
}

impl Challenge for WhackChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::TargetsWhack
    }

    fn start(&mut self, ctx: &mut ChallengeCtx<'_>) -> Result<Step, ChallengeError> {
        self.deadline = Some(ctx.now() + self.budget);
        self.spawn();
        ctx.arm_repeating(TimerTag::Spawn, self.spawn_every)?;
        ctx.arm(TimerTag::Deadline, self.budget)?;
        Ok(Step::Continue)
    }

    fn on_timer(
        &mut self,
        tag: TimerTag,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done {
            return Ok(Step::Continue);
        }
        match tag {
            TimerTag::Spawn => {
                self.spawn();
                Ok(Step::Continue)
            }
            TimerTag::Deadline => {
                self.done = true;
                self.active = None;
                Ok(Step::fail("Signal Lost!"))
            }
            _ => Ok(Step::Continue),
        }
    }

    fn on_input(
        &mut self,
        input: ChallengeInput,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done {
            return Err(ChallengeError::NotAccepting { kind: self.kind() });
        }
        let ChallengeInput::Select(cell) = input else {
            return Err(ChallengeError::wrong_input(self.kind(), input));
        };
        if cell >= self.cell_count() {
            return Err(ChallengeError::OutOfRange {
                index: cell,
                len: self.cell_count(),
            });
        }
        if self.active != Some(cell) {
            return Ok(Step::Continue);
        }

        self.active = None;
        self.score += 1;
        if self.score >= self.threshold {
            self.done = true;
            return Ok(Step::pass("Signal Locked!"));
        }
        Ok(Step::Continue)
    }

    fn cancel(&mut self) {
        self.done = true;
        self.active = None;
    }

    fn view(&self, now: Duration) -> ChallengeView {
        ChallengeView::Whack {
            grid_size: self.grid_size,
            active: self.active,
            score: self.score,
            threshold: self.threshold,
            remaining: super::remaining(self.deadline, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timers::TimerRegistry;

    fn started(seed: u64) -> (WhackChallenge, TimerRegistry) {
        let mut timers = TimerRegistry::new();
        timers.acquire(1).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut challenge = WhackChallenge::new(&WhackTuning::default(), &mut rng);
        challenge.start(&mut ChallengeCtx::new(&mut timers)).unwrap();
        (challenge, timers)
    }

    fn hit_active(challenge: &mut WhackChallenge, timers: &mut TimerRegistry) -> Step {
        let cell = challenge.active().unwrap();
        challenge
            .on_input(ChallengeInput::Select(cell), &mut ChallengeCtx::new(timers))
            .unwrap()
    }

    fn next_spawn(challenge: &mut WhackChallenge, timers: &mut TimerRegistry) -> Step {
        let due = timers.next_due().unwrap();
        let fired = timers.pop_due(due).unwrap();
        challenge
            .on_timer(fired.tag, &mut ChallengeCtx::new(timers))
            .unwrap()
    }

    #[test]
    fn test_threshold_ends_early() {
        let (mut challenge, mut timers) = started(9);
        for _ in 0..4 {
            assert_eq!(hit_active(&mut challenge, &mut timers), Step::Continue);
            next_spawn(&mut challenge, &mut timers);
        }
        let step = hit_active(&mut challenge, &mut timers);
        assert!(step.verdict().unwrap().success);
        assert!(timers.now() < Duration::from_millis(10_000));
    }

    #[test]
    fn test_miss_costs_nothing() {
        let (mut challenge, mut timers) = started(21);
        let active = challenge.active().unwrap();
        let miss = (active + 1) % 9;
        let step = challenge
            .on_input(ChallengeInput::Select(miss), &mut ChallengeCtx::new(&mut timers))
            .unwrap();
        assert_eq!(step, Step::Continue);
        assert_eq!(challenge.score(), 0);
        assert_eq!(challenge.active(), Some(active));
    }

    #[test]
    fn test_hit_clears_cell_until_next_spawn() {
        let (mut challenge, mut timers) = started(4);
        hit_active(&mut challenge, &mut timers);
        assert_eq!(challenge.active(), None);
        next_spawn(&mut challenge, &mut timers);
        assert!(challenge.active().is_some());
    }

    #[test]
    fn test_spawn_moves_the_cell() {
        let (mut challenge, mut timers) = started(13);
        for _ in 0..10 {
            let before = challenge.active();
            next_spawn(&mut challenge, &mut timers);
            assert_ne!(challenge.active(), before);
        }
    }

    #[test]
    fn test_deadline_fails() {
        let (mut challenge, mut timers) = started(2);
        let until = Duration::from_millis(10_000);
        let mut last = Step::Continue;
        while let Some(fired) = timers.pop_due(until) {
            last = challenge
                .on_timer(fired.tag, &mut ChallengeCtx::new(&mut timers))
                .unwrap();
        }
        assert_eq!(last.verdict().unwrap().feedback, "Signal Lost!");
    }
}
