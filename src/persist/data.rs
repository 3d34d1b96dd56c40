//! Data structures for the persisted game record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Current version of the record envelope.
pub const STATE_VERSION: u32 = 1;

/// Key the record is stored under.
pub const STORAGE_KEY: &str = "cosmicCartographerState";

/// What is remembered about one scanned target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Display name at scan time.
    pub name: String,
    /// Scan result text.
    pub data: String,
}

/// The durable subset of the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentGameState {
    /// Trainee designation; empty when no mission was started.
    #[serde(default)]
    pub user_name: String,
    /// Scanned targets by id.
    #[serde(default, alias = "scannedSystems")]
    pub scanned_targets: BTreeMap<String, ScanRecord>,
    /// Whether the mission is still running.
    #[serde(default, alias = "gameInProgress")]
    pub mission_in_progress: bool,
}

impl PersistentGameState {
    /// Number of scanned targets.
    #[must_use]
    pub fn scanned_count(&self) -> usize {
        self.scanned_targets.len()
    }
}
