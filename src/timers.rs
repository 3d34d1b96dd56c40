//! Timer registry for the in-flight calibration.
//!
//! All delayed and repeating work in the game runs on a virtual clock owned
//! by [`TimerRegistry`]. Nothing fires on its own: the caller advances the
//! clock and drains due timers one at a time with [`TimerRegistry::pop_due`].
//! Because timers are drained one by one, a timer handler that calls
//! [`TimerRegistry::clear_all`] stops every later timer in the same advance.
//!
//! # Single slot
//!
//! The registry holds at most one *armed set*, owned by one scan session.
//! A second owner cannot acquire the slot until the first set is cleared:
//!
//! ```
//! use std::time::Duration;
//! use starscan::timers::{TimerRegistry, TimerTag, TimerError};
//!
//! let mut timers = TimerRegistry::new();
//! timers.acquire(1).unwrap();
//! timers.arm(TimerTag::Deadline, Duration::from_millis(500)).unwrap();
//!
//! assert!(matches!(timers.acquire(2), Err(TimerError::SlotBusy { .. })));
//!
//! timers.clear_all();
//! assert!(timers.acquire(2).is_ok());
//! ```

use std::time::Duration;

use thiserror::Error;

/// Identifier of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer means to whoever armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTag {
    /// Bring up the challenge once the briefing delay has passed.
    Launch,
    /// Show the next element of a flashed pattern or sequence.
    Flash,
    /// Hide the element that is currently flashed.
    FlashOff,
    /// Countdown tick.
    Tick,
    /// Time budget exhausted.
    Deadline,
    /// Move the active cell of a whack board.
    Spawn,
    /// Feedback linger is over; resolve with the carried verdict.
    Settle(bool),
}

/// Scheduling mode of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once and is dropped.
    Once,
    /// Fires every period until cancelled.
    Repeating(Duration),
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    /// Owner of the armed set the timer belonged to.
    pub owner: u64,
    /// The timer's id.
    pub id: TimerId,
    /// The timer's tag.
    pub tag: TimerTag,
    /// Clock time at which it fired.
    pub at: Duration,
}

/// Errors raised by the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerError {
    /// Another owner still holds timers.
    #[error("timer slot is held by session {held}; clear it before arming session {requested}")]
    SlotBusy {
        /// Owner currently holding the slot.
        held: u64,
        /// Owner that asked for the slot.
        requested: u64,
    },

    /// Tried to arm a timer with no owner holding the slot.
    #[error("no session holds the timer slot")]
    NotAcquired,
}

#[derive(Debug, Clone)]
struct Scheduled {
    id: TimerId,
    tag: TimerTag,
    due: Duration,
    kind: TimerKind,
}

#[derive(Debug)]
struct ArmedSet {
    owner: u64,
    timers: Vec<Scheduled>,
}

/// Exclusive holder of every pending timer of the active calibration.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    now: Duration,
    next_id: u64,
    armed: Option<ArmedSet>,
}

impl TimerRegistry {
    /// Create an empty registry with the clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Owner of the armed set, if any.
    #[must_use]
    pub fn owner(&self) -> Option<u64> {
        self.armed.as_ref().map(|set| set.owner)
    }

    /// Number of timers still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.armed.as_ref().map_or(0, |set| set.timers.len())
    }

    /// Time of the earliest pending timer.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.armed
            .as_ref()
            .and_then(|set| set.timers.iter().map(|t| t.due).min())
    }

    /// Take the slot for `owner`.
    ///
    /// Re-acquiring by the current owner is a no-op. Any other owner gets
    /// [`TimerError::SlotBusy`] until the slot is cleared.
    pub fn acquire(&mut self, owner: u64) -> Result<(), TimerError> {
        match &self.armed {
            Some(set) if set.owner != owner => Err(TimerError::SlotBusy {
                held: set.owner,
                requested: owner,
            }),
            Some(_) => Ok(()),
            None => {
                self.armed = Some(ArmedSet {
                    owner,
                    timers: Vec::new(),
                });
                Ok(())
            }
        }
    }

    /// Schedule `tag` to fire once after `delay`.
    pub fn arm(&mut self, tag: TimerTag, delay: Duration) -> Result<TimerId, TimerError> {
        self.schedule(tag, delay, TimerKind::Once)
    }

    /// Schedule `tag` to fire every `period`, first after one period.
    ///
    /// A zero period is raised to one millisecond so a drain always ends.
    pub fn arm_repeating(
        &mut self,
        tag: TimerTag,
        period: Duration,
    ) -> Result<TimerId, TimerError> {
        let period = period.max(Duration::from_millis(1));
        self.schedule(tag, period, TimerKind::Repeating(period))
    }

    fn schedule(
        &mut self,
        tag: TimerTag,
        delay: Duration,
        kind: TimerKind,
    ) -> Result<TimerId, TimerError> {
        let now = self.now;
        let id = TimerId(self.next_id);
        let set = self.armed.as_mut().ok_or(TimerError::NotAcquired)?;
        self.next_id += 1;
        set.timers.push(Scheduled {
            id,
            tag,
            due: now + delay,
            kind,
        });
        log::trace!("Armed {:?} ({:?}) due at {:?}", tag, id, now + delay);
        Ok(id)
    }

    /// Cancel a single timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(set) = self.armed.as_mut() else {
            return false;
        };
        let before = set.timers.len();
        set.timers.retain(|t| t.id != id);
        before != set.timers.len()
    }

    /// Cancel every pending timer and release the slot.
    ///
    /// Once this returns, no timer armed before the call can come out of
    /// [`pop_due`](Self::pop_due). Returns how many timers were dropped.
    pub fn clear_all(&mut self) -> usize {
        match self.armed.take() {
            Some(set) => {
                log::trace!(
                    "Cleared {} timer(s) of session {}",
                    set.timers.len(),
                    set.owner
                );
                set.timers.len()
            }
            None => 0,
        }
    }

    /// Take the earliest timer due at or before `until`.
    ///
    /// The clock moves to the timer's due time. Ties fire in arming order.
    /// Repeating timers are rescheduled one period later.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired> {
        let set = self.armed.as_mut()?;
        let index = set
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;

        let owner = set.owner;
        let timer = &mut set.timers[index];
        let fired = Fired {
            owner,
            id: timer.id,
            tag: timer.tag,
            at: timer.due,
        };

        match timer.kind {
            TimerKind::Once => {
                set.timers.remove(index);
            }
            TimerKind::Repeating(period) => timer.due += period,
        }

        self.now = self.now.max(fired.at);
        Some(fired)
    }

    /// Move the clock forward to `until` without firing anything.
    ///
    /// Call after draining [`pop_due`](Self::pop_due). The clock never
    /// moves backwards.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
