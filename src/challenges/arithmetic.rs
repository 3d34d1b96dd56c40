//! Arithmetic calibration: solve a three-operand expression in time.

use std::fmt;
use std::time::Duration;

use rand::Rng;

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView,
    ArithmeticTuning, Step,
};
use crate::timers::TimerTag;

/// Binary operators the generator draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
}

impl Operator {
    const ALL: [Operator; 3] = [Operator::Add, Operator::Sub, Operator::Mul];

    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '×',
        }
    }
}

/// `a op1 b op2 c` with multiplication binding tighter than `+`/`-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expression {
    pub operands: [i64; 3],
    pub operators: [Operator; 2],
}

impl Expression {
    /// Draw operands and operators from `rng`.
    pub fn random<R: Rng + ?Sized>(tuning: &ArithmeticTuning, rng: &mut R) -> Self {
        let low = tuning.min_operand.min(tuning.max_operand);
        let mut operand = || rng.gen_range(low..=tuning.max_operand);
        let operands = [operand(), operand(), operand()];
        let operators = [
            Operator::ALL[rng.gen_range(0..Operator::ALL.len())],
            Operator::ALL[rng.gen_range(0..Operator::ALL.len())],
        ];
        Self {
            operands,
            operators,
        }
    }

    /// Value of the expression.
    #[must_use]
    pub fn evaluate(&self) -> f64 {
        let [a, b, c] = self.operands.map(|n| n as f64);
        let [first, second] = self.operators;
        if second == Operator::Mul && first != Operator::Mul {
            first.apply(a, second.apply(b, c))
        } else {
            second.apply(first.apply(a, b), c)
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.operands;
        let [first, second] = self.operators;
        write!(f, "{} {} {} {} {}", a, first.symbol(), b, second.symbol(), c)
    }
}

/// The expression is evaluated once, when generated; the player's answer
/// passes when it is within the tolerance of that value.
#[derive(Debug)]
pub struct ArithmeticChallenge {
    expression: Expression,
    expected: f64,
    tolerance: f64,
    time_limit: Duration,
    deadline: Option<Duration>,
    done: bool,
}

impl ArithmeticChallenge {
    /// Generate a random expression.
    pub fn new<R: Rng + ?Sized>(tuning: &ArithmeticTuning, rng: &mut R) -> Self {
        Self::with_expression(tuning, Expression::random(tuning, rng))
    }

    /// Use a fixed expression.
    pub fn with_expression(tuning: &ArithmeticTuning, expression: Expression) -> Self {
        Self {
            expected: expression.evaluate(),
            expression,
            tolerance: tuning.tolerance.abs(),
            time_limit: Duration::from_millis(tuning.time_limit_ms),
            deadline: None,
            done: false,
        }
    }

    /// The value computed at generation time.
    #[must_use]
    pub fn expected(&self) -> f64 {
        self.expected
    }

    /// The expression shown to the player.
    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl Challenge for ArithmeticChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::Arithmetic
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
        Ok(Step::fail("Computation Timed Out!"))
    }

    fn on_input(
        &mut self,
        input: ChallengeInput,
        _ctx: &mut ChallengeCtx<'_>,
    ) -> Result<Step, ChallengeError> {
        if self.done {
            return Err(ChallengeError::NotAccepting { kind: self.kind() });
        }
        let ChallengeInput::Answer(answer) = input else {
            return Err(ChallengeError::wrong_input(self.kind(), input));
        };
        self.done = true;
        Ok(if (answer - self.expected).abs() <= self.tolerance {
            Step::pass("Computation Verified!")
        } else {
            Step::fail("Computation Error!")
        })
    }

    fn cancel(&mut self) {
        self.done = true;
    }

    fn view(&self, now: Duration) -> ChallengeView {
        ChallengeView::Arithmetic {
            expression: self.expression.to_string(),
            remaining: super::remaining(self.deadline, now),
        }
    }
}
