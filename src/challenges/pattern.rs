//! Pattern calibration: flash a set of cells, then have the player pick them.

use std::collections::BTreeSet;
use std::time::Duration;

use rand::seq::index;
use rand::Rng;

use super::{
    Challenge, ChallengeCtx, ChallengeError, ChallengeInput, ChallengeKind, ChallengeView,
    PatternTuning, Step,
};
use crate::timers::{TimerId, TimerTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Presenting,
    Accepting,
    Done,
}

/// Memorise-and-replicate grid challenge.
///
/// Cells light up one at a time. Once every cell has flashed the grid
/// accepts input: the player toggles cells and submits when exactly as many
/// are picked as were flashed. Order does not matter.
#[derive(Debug)]
pub struct PatternChallenge {
    grid_size: usize,
    target: Vec<usize>,
    selected: Vec<usize>,
    flashed: usize,
    lit: Option<usize>,
    stage: Stage,
    flash_every: Duration,
    lit_for: Duration,
    flash_timer: Option<TimerId>,
}

impl PatternChallenge {
    /// Pick `tuning.cells` distinct cells of the grid at random.
    pub fn new<R: Rng + ?Sized>(tuning: &PatternTuning, rng: &mut R) -> Self {
        let grid_size = tuning.grid_size.max(1);
        let cells = grid_size * grid_size;
        let amount = tuning.cells.clamp(1, cells);
        let target = index::sample(rng, cells, amount).into_vec();
        Self::with_pattern(tuning, target)
    }

    /// Use a fixed pattern.
    pub fn with_pattern(tuning: &PatternTuning, target: Vec<usize>) -> Self {
        Self {
            grid_size: tuning.grid_size.max(1),
            target,
            selected: Vec::new(),
            flashed: 0,
            lit: None,
            stage: Stage::Presenting,
            flash_every: Duration::from_millis(tuning.flash_every_ms),
            lit_for: Duration::from_millis(tuning.lit_ms),
            flash_timer: None,
        }
    }

    /// Cells flashed, in flash order.
    #[must_use]
    pub fn target(&self) -> &[usize] {
        &self.target
    }

    /// Whether the flash phase is over.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.stage == Stage::Accepting
    }

    fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    fn toggle(&mut self, cell: usize) {
        if let Some(pos) = self.selected.iter().position(|&c| c == cell) {
            self.selected.remove(pos);
        } else if self.selected.len() < self.target.len() {
            self.selected.push(cell);
        }
    }

    fn matches(&self) -> bool {
        let picked: BTreeSet<_> = self.selected.iter().collect();
        let wanted: BTreeSet<_> = self.target.iter().collect();
        picked == wanted
    }
}

impl Challenge for PatternChallenge {
    fn kind(&self) -> ChallengeKind {
        ChallengeKind::Pattern
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
                self.lit = None;
                self.stage = Stage::Accepting;
                log::debug!("Pattern flashed, accepting {} cells", self.target.len());
            }
            TimerTag::Flash => {
                self.lit = Some(self.target[self.flashed]);
                self.flashed += 1;
                ctx.arm(TimerTag::FlashOff, self.lit_for)?;
            }
            TimerTag::FlashOff => self.lit = None,
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
        match input {
            ChallengeInput::Select(cell) if cell >= self.cell_count() => {
                Err(ChallengeError::OutOfRange {
                    index: cell,
                    len: self.cell_count(),
                })
            }
            ChallengeInput::Select(cell) => {
                self.toggle(cell);
                Ok(Step::Continue)
            }
            ChallengeInput::Submit if self.selected.len() != self.target.len() => {
                Err(ChallengeError::Incomplete {
                    selected: self.selected.len(),
                    required: self.target.len(),
                })
            }
            ChallengeInput::Submit => {
                self.stage = Stage::Done;
                Ok(if self.matches() {
                    Step::pass("Pattern Matched!")
                } else {
                    Step::fail("Pattern Incorrect.")
                })
            }
            other => Err(ChallengeError::wrong_input(self.kind(), other)),
        }
    }

    fn cancel(&mut self) {
        self.stage = Stage::Done;
        self.lit = None;
    }

    fn view(&self, _now: Duration) -> ChallengeView {
        ChallengeView::Pattern {
            grid_size: self.grid_size,
            lit: self.lit,
            selected: self.selected.clone(),
            required: self.target.len(),
            accepting: self.stage == Stage::Accepting,
        }
    }
}
