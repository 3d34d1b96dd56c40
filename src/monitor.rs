//! Mission progress monitor.
//!
//! Detects the moment every target is scanned and reports it exactly once
//! per mission.

use serde::{Deserialize, Serialize};

use crate::world::WorldState;

/// Mission-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionStatus {
    /// No trainee has started a mission.
    NotStarted,
    /// Targets are being scanned.
    InProgress,
    /// Every target was scanned. Terminal for the mission.
    Completed,
}

impl MissionStatus {
    /// Whether targets may be selected.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::InProgress
    }
}

/// Watches the world after each mutation.
#[derive(Debug, Clone)]
pub struct MissionMonitor {
    status: MissionStatus,
}

impl Default for MissionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionMonitor {
    /// A monitor with no mission.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: MissionStatus::NotStarted,
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> MissionStatus {
        self.status
    }

    /// Flag a mission as in progress.
    pub fn begin(&mut self) {
        self.status = MissionStatus::InProgress;
    }

    /// Mark the mission completed without a transition, e.g. when a finished
    /// mission is loaded from storage.
    pub fn restore_completed(&mut self) {
        self.status = MissionStatus::Completed;
    }

    /// Back to no mission.
    pub fn reset(&mut self) {
        self.status = MissionStatus::NotStarted;
    }

    /// Check `world` and return `true` only on the call that completes the
    /// mission. Later calls return `false` until [`begin`](Self::begin).
    pub fn check(&mut self, world: &WorldState) -> bool {
        if self.status != MissionStatus::InProgress || !world.is_complete() {
            return false;
        }
        self.status = MissionStatus::Completed;
        log::debug!(
            "Mission complete: {}/{} targets scanned",
            world.scanned_count(),
            world.count()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn world(count: usize) -> WorldState {
        WorldState::build(count, &["Vega".to_string()], &BTreeMap::new())
    }

    #[test]
    fn test_fires_exactly_once() {
        let mut world = world(2);
        let mut monitor = MissionMonitor::new();
        monitor.begin();

        world.mark_scanned("sys-0", "a");
        assert!(!monitor.check(&world));
        world.mark_scanned("sys-1", "b");
        assert!(monitor.check(&world));
        assert!(!monitor.check(&world));
        assert!(!monitor.check(&world));
        assert_eq!(monitor.status(), MissionStatus::Completed);
    }

    #[test]
    fn test_requires_mission_in_progress() {
        let mut world = world(1);
        world.mark_scanned("sys-0", "a");
        let mut monitor = MissionMonitor::new();
        assert!(!monitor.check(&world));
        assert_eq!(monitor.status(), MissionStatus::NotStarted);
    }

    #[test]
    fn test_empty_world_never_completes() {
        let mut monitor = MissionMonitor::new();
        monitor.begin();
        assert!(!monitor.check(&WorldState::new()));
    }

    #[test]
    fn test_begin_rearms() {
        let mut world = world(1);
        let mut monitor = MissionMonitor::new();
        monitor.begin();
        world.mark_scanned("sys-0", "a");
        assert!(monitor.check(&world));

        monitor.begin();
        assert!(monitor.check(&world));
    }
}
