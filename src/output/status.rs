//! Saved-progress report for `starscan status`.

use std::io::Write;

use serde::Serialize;
use yansi::Paint;

use crate::config::Config;
use crate::monitor::MissionStatus;
use crate::persist::{LoadResult, PersistentGameState};
use crate::world::WorldState;

/// One system in the report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub id: String,
    pub name: String,
    pub scanned: bool,
    /// Stored scan data, for scanned systems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// What is saved, as printed by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Trainee designation; empty when nothing is saved.
    pub user_name: String,
    pub status: MissionStatus,
    pub scanned: usize,
    pub total: usize,
    pub percent: f64,
    /// Set when a corrupt record was found and discarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub systems: Vec<SystemStatus>,
}

impl StatusReport {
    /// Build the report from a load result and the map layout in `config`.
    #[must_use]
    pub fn from_load(result: &LoadResult, config: &Config) -> Self {
        match result {
            LoadResult::Found(state) => Self::from_state(state, config),
            LoadResult::NotFound => Self::empty(None),
            LoadResult::Corrupt(reason) => Self::empty(Some(format!(
                "Saved progress was corrupt ({}) and has been discarded.",
                reason
            ))),
        }
    }

    fn from_state(state: &PersistentGameState, config: &Config) -> Self {
        let world = WorldState::build(
            config.target_count,
            &config.system_names,
            &state.scanned_targets,
        );
        let status = if state.mission_in_progress {
            MissionStatus::InProgress
        } else if world.is_complete() {
            MissionStatus::Completed
        } else {
            MissionStatus::NotStarted
        };
        let scanned = world.scanned_count();
        let total = world.count();
        Self {
            user_name: state.user_name.clone(),
            status,
            scanned,
            total,
            percent: if total == 0 {
                0.0
            } else {
                scanned as f64 * 100.0 / total as f64
            },
            warning: None,
            systems: world
                .targets()
                .iter()
                .map(|t| SystemStatus {
                    id: t.id.clone(),
                    name: t.name.clone(),
                    scanned: t.scanned,
                    data: t.data.clone(),
                })
                .collect(),
        }
    }

    fn empty(warning: Option<String>) -> Self {
        Self {
            user_name: String::new(),
            status: MissionStatus::NotStarted,
            scanned: 0,
            total: 0,
            percent: 0.0,
            warning,
            systems: Vec::new(),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the human-readable report; colours follow `yansi`'s global switch.
    pub fn write_text<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        if let Some(warning) = &self.warning {
            writeln!(writer, "{}", warning.red())?;
        }
        if self.user_name.is_empty() && self.systems.is_empty() {
            writeln!(writer, "{}", "No saved mission.".dim())?;
            return Ok(());
        }

        let status = match self.status {
            MissionStatus::NotStarted => "not started".yellow(),
            MissionStatus::InProgress => "in progress".cyan(),
            MissionStatus::Completed => "completed".green(),
        };
        writeln!(writer, "Trainee {}: mission {}", self.user_name.bold(), status)?;
        writeln!(
            writer,
            "Systems Scanned: {} / {} ({:.0}%)",
            self.scanned, self.total, self.percent
        )?;
        for system in &self.systems {
            if system.scanned {
                writeln!(
                    writer,
                    "  {} {:<18} {}",
                    "★".green(),
                    system.name,
                    system.data.as_deref().unwrap_or_default().dim()
                )?;
            } else {
                writeln!(writer, "  {} {}", "☆".dim(), system.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{CorruptState, ScanRecord};

    fn config() -> Config {
        Config {
            target_count: 3,
            ..Config::default()
        }
    }

    #[test]
    fn test_report_from_state() {
        let mut state = PersistentGameState {
            user_name: "Nova".to_string(),
            mission_in_progress: true,
            ..PersistentGameState::default()
        };
        state.scanned_targets.insert(
            "sys-1".to_string(),
            ScanRecord {
                name: "Sirius".to_string(),
                data: "Scan complete. Detected characteristics: Trace Organics.".to_string(),
            },
        );

        let report = StatusReport::from_load(&LoadResult::Found(state), &config());
        assert_eq!(report.status, MissionStatus::InProgress);
        assert_eq!((report.scanned, report.total), (1, 3));
        assert!(report.systems[1].scanned);
        assert!(report.systems[0].data.is_none());

        let json = report.to_json_pretty().unwrap();
        assert!(json.contains("\"status\": \"in-progress\""));
    }

    #[test]
    fn test_text_report() {
        yansi::disable();
        let report = StatusReport::from_load(&LoadResult::NotFound, &config());
        let mut out = Vec::new();
        report.write_text(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No saved mission.\n");

        let report = StatusReport::from_load(
            &LoadResult::Corrupt(CorruptState::ChecksumMismatch),
            &config(),
        );
        assert!(report.warning.is_some());
    }
}
