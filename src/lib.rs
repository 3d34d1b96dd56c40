//! starscan - star-mapping scan game
//!
//! Chart every system in Sector 7G. Each scan is gated by a short timed
//! calibration challenge; scanned systems and their data are saved so a
//! mission can be resumed later.
//!
//! The game logic lives in [`engine`] and runs on a virtual clock, so it can
//! be driven by the terminal front end in [`tui`] or stepped directly in
//! tests.

pub mod challenges;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod output;
pub mod persist;
pub mod signal;
pub mod timers;
pub mod tui;
pub mod world;

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context};

use cli::{Cli, Commands, GlobalArgs, InitConfigArgs, PlayArgs, ResetArgs, StatusArgs};
use config::Config;
use engine::{EventQueue, ScanEngine};
use error::ExitCode;
use logging::LogTarget;
use output::StatusReport;
use persist::{KeyValueStore, MemoryStore, PersistenceGateway, SqliteStore};
use tui::{run_tui, App, Theme};

/// Run the command line application.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let (globals, command) = cli.command_or_default();

    let log_target = match &command {
        Commands::Play(args) => args
            .log_file
            .clone()
            .or_else(config::default_log_path)
            .map_or(LogTarget::Stderr, LogTarget::File),
        _ => LogTarget::Stderr,
    };
    logging::init_logging(globals.verbose, globals.quiet, log_target);

    if globals.no_color {
        yansi::disable();
    }

    match command {
        Commands::Play(args) => run_play(&globals, &args),
        Commands::Status(args) => run_status(&globals, &args),
        Commands::Reset(args) => run_reset(&globals, &args),
        Commands::InitConfig(args) => run_init_config(&globals, &args),
    }
}

/// Load configuration and apply the command line overrides.
pub fn load_config(globals: &GlobalArgs) -> anyhow::Result<Config> {
    let mut config =
        Config::load(globals.config.as_deref()).context("Failed to load configuration")?;
    if let Some(store) = &globals.store {
        config.store_path = Some(store.clone());
    }
    if globals.seed.is_some() {
        config.seed = globals.seed;
    }
    for warning in config.validate() {
        log::warn!("{}", warning);
    }
    Ok(config)
}

fn open_store(config: &Config) -> anyhow::Result<Box<dyn KeyValueStore>> {
    let Some(path) = config.resolved_store_path() else {
        bail!("No location for saved progress; pass --store PATH");
    };
    let store = SqliteStore::open(&path)
        .with_context(|| format!("Failed to open progress store at {}", path.display()))?;
    Ok(Box::new(store))
}

fn run_play(globals: &GlobalArgs, args: &PlayArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(globals)?;
    let store: Box<dyn KeyValueStore> = if args.ephemeral {
        log::info!("Ephemeral mission: progress will not be saved");
        Box::new(MemoryStore::new())
    } else {
        open_store(&config)?
    };

    let shutdown = signal::install_handler().context("Failed to install Ctrl+C handler")?;
    let engine = ScanEngine::new(config, store, EventQueue::new());
    let mut app = App::new(engine)
        .context("Failed to load saved progress")?
        .with_theme(Theme::auto());

    run_tui(&mut app, Some(shutdown.get_flag())).context("Terminal UI failed")?;
    log::info!("Left orbit at {}", app.engine().progress());
    Ok(ExitCode::Success)
}

fn run_status(globals: &GlobalArgs, args: &StatusArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(globals)?;
    let mut gateway = PersistenceGateway::new(open_store(&config)?);
    let loaded = gateway.load().context("Failed to read saved progress")?;
    let report = StatusReport::from_load(&loaded, &config);

    let mut stdout = io::stdout().lock();
    if args.json {
        writeln!(stdout, "{}", report.to_json_pretty()?)?;
    } else {
        report.write_text(&mut stdout)?;
    }
    Ok(ExitCode::Success)
}

fn run_reset(globals: &GlobalArgs, args: &ResetArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(globals)?;
    if !args.yes && !confirm("Delete all saved mission progress? [y/N] ")? {
        println!("Reset cancelled.");
        return Ok(ExitCode::Success);
    }

    let mut gateway = PersistenceGateway::new(open_store(&config)?);
    gateway.clear().context("Failed to clear saved progress")?;
    println!("Saved progress cleared.");
    Ok(ExitCode::Success)
}

fn run_init_config(globals: &GlobalArgs, args: &InitConfigArgs) -> anyhow::Result<ExitCode> {
    let Some(path) = globals.config.clone().or_else(config::default_config_path) else {
        bail!("No config location available; pass --config PATH");
    };
    if path.exists() && !args.force {
        bail!(
            "Config file {} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(ExitCode::Success)
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}
