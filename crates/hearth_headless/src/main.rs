//! Headless game runner.
//!
//! Runs the gameplay core without graphics, either from a scenario file or
//! controlled via JSON on stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and print its report
//! cargo run -p hearth_headless -- run scenarios/economy.ron
//!
//! # Interactive mode - read commands from stdin
//! cargo run -p hearth_headless -- play --scenario scenarios/skirmish.ron
//!
//! # Check a catalog file for problems
//! cargo run -p hearth_headless -- validate scenarios/catalog.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hearth_core::data::Catalog;
use hearth_core::factions::FactionId;
use hearth_headless::{load_catalog, HeadlessConfig, HeadlessRunner, Scenario};

#[derive(Parser)]
#[command(name = "hearth_headless")]
#[command(about = "Headless runner for gameplay scenarios and scripted play")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario to completion and print a JSON report
    Run {
        /// Scenario file to load
        scenario: PathBuf,

        /// Override the scenario's tick count
        #[arg(long)]
        ticks: Option<u64>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Serve JSON commands on stdin
    Play {
        /// Scenario file to start from
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Catalog file for an empty world
        #[arg(short, long, conflicts_with = "scenario")]
        catalog: Option<PathBuf>,

        /// Output state after every tick
        #[arg(long)]
        auto_state: bool,

        /// Land hits without waiting for end_attack commands
        #[arg(long)]
        auto_end_attacks: bool,
    },

    /// Check a catalog file and list its problems
    Validate {
        /// Catalog file to check
        catalog: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the protocol.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            ticks,
            pretty,
        } => cmd_run(&scenario, ticks, pretty),
        Commands::Play {
            scenario,
            catalog,
            auto_state,
            auto_end_attacks,
        } => cmd_play(scenario, catalog, auto_state, auto_end_attacks),
        Commands::Validate { catalog } => cmd_validate(&catalog),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(path: &Path, ticks: Option<u64>, pretty: bool) -> Result<(), String> {
    let mut scenario = Scenario::load(path).map_err(|e| e.to_string())?;
    if let Some(ticks) = ticks {
        scenario.ticks = ticks;
    }

    tracing::info!(
        name = %scenario.name,
        ticks = scenario.ticks,
        "Running scenario"
    );
    let report = HeadlessRunner::run_scenario(&scenario).map_err(|e| e.to_string())?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn cmd_play(
    scenario: Option<PathBuf>,
    catalog: Option<PathBuf>,
    auto_state: bool,
    auto_end_attacks: bool,
) -> Result<(), String> {
    let config = HeadlessConfig {
        auto_state,
        auto_end_attacks,
        ..HeadlessConfig::default()
    };

    let mut runner = match (scenario, catalog) {
        (Some(path), _) => {
            let scenario = Scenario::load(&path).map_err(|e| e.to_string())?;
            HeadlessRunner::from_scenario(&scenario, config).map_err(|e| e.to_string())?
        }
        (None, Some(path)) => {
            let catalog = load_catalog(&path).map_err(|e| e.to_string())?;
            HeadlessRunner::new(catalog, FactionId::new("player"), config)
        }
        (None, None) => HeadlessRunner::new(Catalog::default(), FactionId::new("player"), config),
    };

    tracing::info!("Starting interactive session");
    let stdin = io::stdin();
    runner
        .run_session(stdin.lock(), io::stdout().lock())
        .map_err(|e| e.to_string())
}

fn cmd_validate(path: &Path) -> Result<(), String> {
    let catalog = load_catalog(path).map_err(|e| e.to_string())?;
    let problems = catalog.validate();

    if problems.is_empty() {
        println!(
            "{}: {} units, {} buildings, no problems",
            path.display(),
            catalog.units.len(),
            catalog.buildings.len()
        );
        return Ok(());
    }

    for problem in &problems {
        println!("{}: {problem}", path.display());
    }
    Err(format!("{} problem(s) in {}", problems.len(), path.display()))
}
