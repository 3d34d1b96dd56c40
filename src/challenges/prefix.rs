//! Cipher entry calibration: type a symbol string with no mistakes.

use std::time::Duration;

use rand::Rng;

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView,
    PrefixTuning, Step,
};
use crate::timers::TimerTag;

/// The player appends one symbol at a time. The attempt fails the moment
/// the typed text stops being a prefix of the target and passes when it
/// equals the target.
#[derive(Debug)]
pub struct PrefixChallenge {
    target: String,
    entered: String,
    time_limit: Duration,
    deadline: Option<Duration>,
    done: bool,
}

impl PrefixChallenge {
    /// Draw the target string from the tuning's symbol set.
    pub fn new<R: Rng + ?Sized>(tuning: &PrefixTuning, rng: &mut R) -> Self {
        let symbols: Vec<char> = if tuning.symbols.is_empty() {
            PrefixTuning::default().symbols.chars().collect()
        } else {
            tuning.symbols.chars().collect()
        };
        let target = (0..tuning.length.max(1))
            .map(|_| symbols[rng.gen_range(0..symbols.len())])
            .collect();
        Self::with_target(tuning, target)
    }

    /// Use a fixed target string.
    pub fn with_target(tuning: &PrefixTuning, target: String) -> Self {
        Self {
            target,
            entered: String::new(),
            time_limit: Duration::from_millis(tuning.time_limit_ms),
            deadline: None,
            done: false,
        }
    }

    /// The string to type.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Challenge for PrefixChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::PrefixEntry
    }

    fn start(&mut self, ctx: &mut ChallengeCtx<'_>) -> Result<Step, ChallengeError> {
        self.deadline = Some(ctx.now() + self.time_limit);
        ctx.arm(TimerTag::Deadline, self.time_limit)?;
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
        Ok(Step::fail("Cipher Timed Out!"))
    }

    fn on_input(
        &mut self,
        input: ChallengeInput,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done {
            return Err(ChallengeError::NotAccepting { kind: self.kind() });
        }
        let ChallengeInput::Symbol(symbol) = input else {
            return Err(ChallengeError::wrong_input(self.kind(), input));
        };

        self.entered.push(symbol);
        if !self.target.starts_with(&self.entered) {
            self.done = true;
            return Ok(Step::fail("Cipher Rejected!"));
        }
        if self.entered == self.target {
            self.done = true;
            return Ok(Step::pass("Cipher Accepted!"));
        }
        Ok(Step::Continue)
    }

    fn cancel(&mut self) {
        self.done = true;
    }

    fn view(&self, now: Duration) -> ChallengeView {
        ChallengeView::Prefix {
            target: self.target.clone(),
            entered: self.entered.clone(),
            remaining: super::remaining(self.deadline, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timers::TimerRegistry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn started(target: &str) -> (PrefixChallenge, TimerRegistry) {
        let mut timers = TimerRegistry::new();
        timers.acquire(1).unwrap();
        let mut challenge = PrefixChallenge::with_target(&PrefixTuning::default(), target.into());
        challenge.start(&mut ChallengeCtx::new(&mut timers)).unwrap();
        (challenge, timers)
    }

    fn type_str(challenge: &mut PrefixChallenge, timers: &mut TimerRegistry, text: &str) -> Step {
        let mut last = Step::Continue;
        for symbol in text.chars() {
            last = challenge
                .on_input(ChallengeInput::Symbol(symbol), &mut ChallengeCtx::new(timers))
                .unwrap();
        }
        last
    }

    #[test]
    fn test_exact_entry_passes() {
        let (mut challenge, mut timers) = started("#$%@!");
        assert!(type_str(&mut challenge, &mut timers, "#$%@!")
            .verdict()
            .unwrap()
            .success);
    }

    #[test]
    fn test_wrong_symbol_fails_immediately() {
        let (mut challenge, mut timers) = started("#$%@!");
        assert_eq!(type_str(&mut challenge, &mut timers, "#$"), Step::Continue);
        let step = type_str(&mut challenge, &mut timers, "&");
        assert_eq!(step.verdict().unwrap().feedback, "Cipher Rejected!");

        let err = challenge
            .on_input(ChallengeInput::Symbol('%'), &mut ChallengeCtx::new(&mut timers))
            .unwrap_err();
        assert!(matches!(err, ChallengeError::NotAccepting { .. }));
    }

    #[test]
    fn test_random_target_uses_symbol_set() {
        let tuning = PrefixTuning::default();
        let mut rng = StdRng::seed_from_u64(8);
        let challenge = PrefixChallenge::new(&tuning, &mut rng);
        assert_eq!(challenge.target().chars().count(), 5);
        assert!(challenge.target().chars().all(|c| tuning.symbols.contains(c)));
    }

    #[test]
    fn test_time_limit_fails() {
        let (mut challenge, mut timers) = started("#$%@!");
        type_str(&mut challenge, &mut timers, "#$%");
        let fired = timers.pop_due(Duration::from_millis(10_000)).unwrap();
        let step = challenge
            .on_timer(fired.tag, &mut ChallengeCtx::new(&mut timers))
            .unwrap();
        assert_eq!(step.verdict().unwrap().feedback, "Cipher Timed Out!");
    }
}
