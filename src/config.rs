//! Application configuration management.
//!
//! Settings are layered with figment, later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory when it exists
//! 3. Environment variables prefixed `STARSCAN_`, with `__` separating
//!    nested keys (`STARSCAN_TUNING__RATE_CLICK__TARGET=20`)
//! 4. Command line flags, applied by the caller
//!
//! Unknown challenge names in the roster are not a load error. They are
//! reported by [`Config::validate`] and fail their calibration at play time.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::challenges::{ChallengeKind, Tuning};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "STARSCAN_";

/// Canonical star names, in map order.
pub const SYSTEM_NAMES: [&str; 12] = [
    "Alpha Centauri",
    "Sirius",
    "Proxima Centauri",
    "Barnard's Star",
    "Wolf 359",
    "Lalande 21185",
    "Epsilon Eridani",
    "Tau Ceti",
    "Gliese 581",
    "Kepler-186f",
    "TRAPPIST-1",
    "Vega",
];

/// Errors raised while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong shape.
    #[error("invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Offending key.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The config file could not be written.
    #[error("failed to write config file {}: {source}", path.display())]
    Io {
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config could not be rendered as TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of targets on the map.
    pub target_count: usize,
    /// Names the targets cycle through.
    pub system_names: Vec<String>,
    /// Challenge roster, by kind name. A scan draws uniformly from it.
    pub challenges: Vec<String>,
    /// Fixed RNG seed for reproducible play.
    pub seed: Option<u64>,
    /// SQLite file holding saved progress.
    pub store_path: Option<PathBuf>,
    /// Delay between acknowledging the briefing and the challenge starting.
    pub launch_delay_ms: u64,
    /// How long a success message lingers before the scan resolves.
    pub feedback_delay_success_ms: u64,
    /// How long a failure message lingers before the scan resolves.
    pub feedback_delay_failure_ms: u64,
    /// Per-challenge constants.
    pub tuning: Tuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_count: SYSTEM_NAMES.len(),
            system_names: SYSTEM_NAMES.iter().map(|s| s.to_string()).collect(),
            challenges: ChallengeKind::ALL
                .iter()
                .map(|k| k.name().to_string())
                .collect(),
            seed: None,
            store_path: None,
            launch_delay_ms: 150,
            feedback_delay_success_ms: 1000,
            feedback_delay_failure_ms: 1500,
            tuning: Tuning::default(),
        }
    }
}

impl Config {
    /// Load all layers. `path` overrides the default config file location.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        let config = Self::figment(file.as_deref())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Self>()
            .map_err(Box::new)?;
        config.check()?;
        log::debug!(
            "Loaded config ({} targets, {} challenges) from {}",
            config.target_count,
            config.challenges.len(),
            file.as_deref()
                .map_or_else(|| "defaults".to_string(), |p| p.display().to_string())
        );
        Ok(config)
    }

    /// Defaults plus an optional TOML file, without environment overrides.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(p) => figment.merge(Toml::file(p)),
            None => figment,
        }
    }

    /// Reject values the game cannot run with.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.target_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "target_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.challenges.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "challenges",
                reason: "roster must name at least one challenge".to_string(),
            });
        }

        let timed_hit = &self.tuning.timed_hit;
        let non_negative = [
            ("tuning.timed_hit.zone_min_width", timed_hit.zone_min_width),
            ("tuning.timed_hit.zone_max_width", timed_hit.zone_max_width),
            ("tuning.timed_hit.zone_limit", timed_hit.zone_limit),
            ("tuning.arithmetic.tolerance", self.tuning.arithmetic.tolerance),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("must be a finite, non-negative number (got {})", value),
                });
            }
        }
        Ok(())
    }

    /// Warnings about roster names that match no challenge kind.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.challenges
            .iter()
            .filter(|name| name.parse::<ChallengeKind>().is_err())
            .map(|name| match suggest_kind(name) {
                Some(kind) => format!(
                    "Unknown challenge '{}' in roster (did you mean '{}'?)",
                    name, kind
                ),
                None => format!("Unknown challenge '{}' in roster", name),
            })
            .collect()
    }

    /// Write this config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    /// Store file to use: the configured one or the platform default.
    #[must_use]
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        self.store_path.clone().or_else(default_store_path)
    }
}

/// Closest kind name to `name`, if it is plausibly a typo.
#[must_use]
pub fn suggest_kind(name: &str) -> Option<ChallengeKind> {
    let wanted = name.trim().to_ascii_lowercase();
    ChallengeKind::ALL
        .into_iter()
        .map(|kind| (kind, strsim::levenshtein(&wanted, kind.name())))
        .filter(|(_, distance)| *distance <= 3)
        .min_by_key(|(_, distance)| *distance)
        .map(|(kind, _)| kind)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "starscan", "starscan")
}

/// Platform path of `config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Platform path of the progress database.
#[must_use]
pub fn default_store_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("starscan.db"))
}

/// Platform path of the diagnostic log written while the TUI runs.
#[must_use]
pub fn default_log_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("starscan.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target_count, 12);
        assert_eq!(config.system_names.len(), 12);
        assert_eq!(config.challenges.len(), 7);
        assert_eq!(config.launch_delay_ms, 150);
        assert!(config.check().is_ok());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_zero_targets_rejected() {
        let config = Config {
            target_count: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.check(),
            Err(ConfigError::InvalidValue {
                key: "target_count",
                ..
            })
        ));
    }

    #[test]
    fn test_non_finite_tuning_rejected() {
        let mut config = Config::default();
        config.tuning.timed_hit.zone_max_width = f64::NAN;
        assert!(matches!(
            config.check(),
            Err(ConfigError::InvalidValue {
                key: "tuning.timed_hit.zone_max_width",
                ..
            })
        ));

        let mut config = Config::default();
        config.tuning.timed_hit.zone_limit = f64::INFINITY;
        assert!(config.check().is_err());

        let mut config = Config::default();
        config.tuning.timed_hit.zone_min_width = -5.0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_validate_suggests() {
        let config = Config {
            challenges: vec!["pattern".into(), "patern".into(), "qte".into()],
            ..Config::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("did you mean 'pattern'"));
        assert!(!warnings[1].contains("did you mean"));
    }

    #[test]
    fn test_suggest_kind() {
        assert_eq!(suggest_kind("rate_click"), Some(ChallengeKind::RateClick));
        assert_eq!(suggest_kind("whatever-this-is"), None);
    }
}
