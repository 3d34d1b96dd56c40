//! Command-line interface definitions for starscan.
//!
//! Global options (verbosity, colour, config and store overrides) apply to
//! every subcommand. Running without a subcommand starts the game.
//!
//! # Example
//!
//! ```bash
//! # Play (default)
//! starscan
//!
//! # Play a reproducible mission with a throwaway store
//! starscan --seed 42 --store /tmp/starscan.db play
//!
//! # Inspect saved progress as JSON
//! starscan status --json
//!
//! # Wipe saved progress without prompting
//! starscan reset --yes
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Chart Sector 7G one calibration at a time.
///
/// starscan is a terminal star-mapping game: pick a system on the map, pass
/// its calibration challenge, and the scan data is saved so the mission can
/// be resumed later.
#[derive(Debug, Parser)]
#[command(name = "starscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Path to a config file (default: platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite file holding saved progress (default: platform data dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Fixed random seed for reproducible missions
    #[arg(long, global = true, value_name = "N")]
    pub seed: Option<u64>,

    /// Subcommand to execute (default: play)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start or resume the mission in the terminal UI
    Play(PlayArgs),
    /// Show saved progress
    Status(StatusArgs),
    /// Delete saved progress
    Reset(ResetArgs),
    /// Write a config file with the default settings
    InitConfig(InitConfigArgs),
}

/// Arguments for `play`.
#[derive(Debug, Args, Default)]
pub struct PlayArgs {
    /// Keep progress in memory only; nothing is saved
    #[arg(long)]
    pub ephemeral: bool,

    /// Write diagnostic logs to this file while playing
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Arguments for `status`.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `reset`.
#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Do not ask for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Arguments for `init-config`.
#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// The subcommand, defaulting to `play`.
    #[must_use]
    pub fn command_or_default(self) -> (GlobalArgs, Commands) {
        let globals = GlobalArgs {
            verbose: self.verbose,
            quiet: self.quiet,
            no_color: self.no_color,
            config: self.config,
            store: self.store,
            seed: self.seed,
        };
        let command = self
            .command
            .unwrap_or_else(|| Commands::Play(PlayArgs::default()));
        (globals, command)
    }
}

/// Global options, split off the parsed command.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// `-v` count.
    pub verbose: u8,
    /// `--quiet`.
    pub quiet: bool,
    /// `--no-color`.
    pub no_color: bool,
    /// `--config`.
    pub config: Option<PathBuf>,
    /// `--store`.
    pub store: Option<PathBuf>,
    /// `--seed`.
    pub seed: Option<u64>,
}
