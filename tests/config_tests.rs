//! Integration tests for configuration: defaults, TOML files, environment
//! overrides, command line overrides and roster validation.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use starscan::cli::GlobalArgs;
use starscan::config::{suggest_kind, Config, ConfigError};
use starscan::challenges::ChallengeKind;
use tempfile::tempdir;

// =============================================================================
// Helper Functions
// =============================================================================

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all STARSCAN_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("STARSCAN_") {
            std::env::remove_var(key);
        }
    }
}

fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

// =============================================================================
// Layers
// =============================================================================

#[test]
fn test_toml_overrides_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config(
        r#"
target_count = 5
challenges = ["pattern", "arithmetic"]
feedback_delay_failure_ms = 2000

[tuning.arithmetic]
time_limit_ms = 20000
"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.target_count, 5);
    assert_eq!(config.challenges, vec!["pattern", "arithmetic"]);
    assert_eq!(config.feedback_delay_failure_ms, 2000);
    assert_eq!(config.tuning.arithmetic.time_limit_ms, 20_000);
    // Untouched keys keep their defaults.
    assert_eq!(config.feedback_delay_success_ms, 1000);
    assert_eq!(config.system_names.len(), 12);
    assert_eq!(config.tuning.rate_click.target, 15);
}

#[test]
fn test_env_overrides_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("target_count = 5\n");

    std::env::set_var("STARSCAN_TARGET_COUNT", "8");
    std::env::set_var("STARSCAN_TUNING__RATE_CLICK__TARGET", "20");
    let config = Config::load(Some(&path));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.target_count, 8);
    assert_eq!(config.tuning.rate_click.target, 20);
}

#[test]
fn test_cli_overrides_everything() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (dir, path) = write_config("seed = 1\n");
    std::env::set_var("STARSCAN_SEED", "2");

    let globals = GlobalArgs {
        config: Some(path),
        store: Some(dir.path().join("cli.db")),
        seed: Some(3),
        ..GlobalArgs::default()
    };
    let config = starscan::load_config(&globals);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.seed, Some(3));
    assert_eq!(config.store_path, Some(dir.path().join("cli.db")));
    assert_eq!(config.resolved_store_path(), Some(dir.path().join("cli.db")));
}

// =============================================================================
// Errors and validation
// =============================================================================

#[test]
fn test_missing_explicit_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        Config::load(Some(&missing)),
        Err(ConfigError::NotFound(p)) if p == missing
    ));
}

#[test]
fn test_invalid_values_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let (_dir, path) = write_config("target_count = 0\n");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::InvalidValue {
            key: "target_count",
            ..
        })
    ));

    let (_dir, path) = write_config("challenges = []\n");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::InvalidValue {
            key: "challenges",
            ..
        })
    ));

    let (_dir, path) = write_config("target_count = \"many\"\n");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::Extract(_))
    ));
}

#[test]
fn test_nan_tuning_rejected_at_load() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config("[tuning.timed_hit]\nzone_max_width = nan\n");
    assert!(matches!(
        Config::load(Some(&path)),
        Err(ConfigError::InvalidValue {
            key: "tuning.timed_hit.zone_max_width",
            ..
        })
    ));
}

#[test]
fn test_unknown_roster_names_are_warnings() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let (_dir, path) = write_config(r#"challenges = ["patern", "timed-hit", "zzzzzzzzzzzz"]"#);

    let config = Config::load(Some(&path)).unwrap();
    let warnings = config.validate();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("did you mean 'pattern'"));
    assert!(!warnings[1].contains("did you mean"));
}

#[test]
fn test_suggest_kind() {
    assert_eq!(suggest_kind("rate-clik"), Some(ChallengeKind::RateClick));
    assert_eq!(suggest_kind("TIMED-HIT"), Some(ChallengeKind::TimedHit));
    assert_eq!(suggest_kind("completely-different"), None);
}

#[test]
fn test_saved_config_loads_back() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub").join("config.toml");

    let config = Config {
        target_count: 6,
        seed: Some(77),
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load(Some(&path)).unwrap();
    assert_eq!(loaded, config);
}
