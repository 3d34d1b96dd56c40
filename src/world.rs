//! World state: the roster of targets for the current mission.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::persist::ScanRecord;

/// A location the player can scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Stable id, `sys-{index}`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether a calibration has succeeded on this target.
    pub scanned: bool,
    /// Scan result, present once scanned.
    pub data: Option<String>,
}

/// Result of [`WorldState::mark_scanned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The target is now scanned.
    Marked,
    /// The target was scanned before; nothing changed.
    AlreadyScanned,
    /// No target has that id.
    UnknownTarget,
}

/// Id of the target at `index`.
#[must_use]
pub fn target_id(index: usize) -> String {
    format!("sys-{}", index)
}

/// Fixed roster of targets and their scan status.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    targets: Vec<Target>,
}

impl WorldState {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate `count` targets.
    ///
    /// Target `i` takes its name from `names[i % names.len()]`, or
    /// `System {i+1}` when the list is empty or that entry is blank. Scan
    /// status and data are seeded from `prior`, keyed by target id.
    #[must_use]
    pub fn build(count: usize, names: &[String], prior: &BTreeMap<String, ScanRecord>) -> Self {
        let targets = (0..count)
            .map(|i| {
                let id = target_id(i);
                let name = names
                    .get(i % names.len().max(1))
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .map_or_else(|| format!("System {}", i + 1), str::to_string);
                let data = prior.get(&id).map(|record| record.data.clone());
                Target {
                    id,
                    name,
                    scanned: data.is_some(),
                    data,
                }
            })
            .collect();
        Self { targets }
    }

    /// Replace the whole roster. Nothing of the previous one survives.
    pub fn rebuild(&mut self, count: usize, names: &[String], prior: &BTreeMap<String, ScanRecord>) {
        *self = Self::build(count, names, prior);
    }

    /// Drop every target.
    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Look a target up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// All targets, in id order.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Set `scanned` and store `data`. An already-scanned target keeps its data.
    pub fn mark_scanned(&mut self, id: &str, data: &str) -> MarkOutcome {
        match self.targets.iter_mut().find(|t| t.id == id) {
            None => MarkOutcome::UnknownTarget,
            Some(target) if target.scanned => MarkOutcome::AlreadyScanned,
            Some(target) => {
                target.scanned = true;
                target.data = Some(data.to_string());
                MarkOutcome::Marked
            }
        }
    }

    /// Number of targets.
    #[must_use]
    pub fn count(&self) -> usize {
        self.targets.len()
    }

    /// Number of scanned targets.
    #[must_use]
    pub fn scanned_count(&self) -> usize {
        self.targets.iter().filter(|t| t.scanned).count()
    }

    /// True when the roster is non-empty and every target is scanned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.targets.is_empty() && self.scanned_count() == self.count()
    }

    /// The durable view of the scanned targets.
    #[must_use]
    pub fn scanned_records(&self) -> BTreeMap<String, ScanRecord> {
        self.targets
            .iter()
            .filter_map(|t| {
                let data = t.data.as_ref().filter(|_| t.scanned)?;
                Some((
                    t.id.clone(),
                    ScanRecord {
                        name: t.name.clone(),
                        data: data.clone(),
                    },
                ))
            })
            .collect()
    }
}
