//! Diagnostic logging for starscan.
//!
//! Uses the `log` facade with an `env_logger` backend. The level comes from,
//! in priority order:
//!
//! 1. `RUST_LOG`, if set
//! 2. CLI flags: `--quiet` (errors only), `-v` (debug), `-vv` (trace)
//! 3. Default: info
//!
//! While the terminal front end owns the screen, log records are written to
//! a file instead of stderr so they cannot tear the display.
//!
//! ```rust,no_run
//! use starscan::logging::{init_logging, LogTarget};
//!
//! init_logging(1, false, LogTarget::Stderr);
//! log::debug!("Debug info here");
//! ```

use std::env;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Where log records go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard error.
    Stderr,
    /// Append to a file; falls back to stderr if it cannot be opened.
    File(PathBuf),
}

/// Initialize logging once, at startup.
///
/// A second call in the same process is ignored.
pub fn init_logging(verbose: u8, quiet: bool, target: LogTarget) {
    let use_env = env::var("RUST_LOG").is_ok();
    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    let to_file = match &target {
        LogTarget::Stderr => false,
        LogTarget::File(path) => match open_log_file(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
                true
            }
            Err(err) => {
                eprintln!("Cannot open log file {}: {}", path.display(), err);
                false
            }
        },
    };

    configure_format(&mut builder, verbose, to_file);

    if builder.try_init().is_err() {
        return;
    }
    if use_env {
        log::debug!("Logging initialized from RUST_LOG: {:?}", env::var("RUST_LOG").ok());
    } else {
        log::debug!(
            "Logging initialized at level {:?}",
            determine_level(verbose, quiet)
        );
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Level implied by the CLI flags. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Debug builds and log files get timestamps and module paths; release
/// builds on a terminal get level and message only.
fn configure_format(builder: &mut Builder, verbose: u8, to_file: bool) {
    if to_file || cfg!(debug_assertions) {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_millis();
            if verbose >= 1 || to_file {
                writeln!(
                    buf,
                    "{} {:<5} [{}] {}",
                    timestamp,
                    record.level(),
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {:<5} {}", timestamp, record.level(), record.args())
            }
        });
    } else {
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Name of the active maximum level.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
