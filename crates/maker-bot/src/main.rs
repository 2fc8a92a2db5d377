//! Perpetual-futures market maker - entry point.

mod app;
mod config;
mod error;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::AppConfig;
use maker_sim::Scenario;
use std::path::PathBuf;
use tracing::info;

/// Automated market maker for perpetual futures.
#[derive(Parser, Debug)]
#[command(name = "perpmaker", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (also via MAKER_CONFIG env var).
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start live quoting.
    Live {
        /// Quote a single market id.
        #[arg(short, long)]
        market: Option<u32>,
        /// Dry run against the in-process paper venue.
        #[arg(short, long)]
        test: bool,
    },
    /// Replay historical or synthetic bars through the quoting pipeline.
    Backtest {
        /// Bar file (.json or .csv); synthetic data when absent.
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Synthetic bar count when no data file is given.
        #[arg(short, long, default_value_t = 1000)]
        steps: usize,
        /// Write results (.json or .csv).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// RNG seed for reproducible fills.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate a synthetic bar stream.
    Simulate {
        #[arg(short, long, default_value_t = 10_000)]
        steps: usize,
        /// Scenario: illiquid, trending, trending-down, or ranging.
        #[arg(short = 't', long)]
        scenario: Option<Scenario>,
        /// Write bars (.json).
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Check configuration, credentials, and venue connectivity.
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let _log_guards = maker_telemetry::init_logging(&config.log)?;

    info!(version = env!("CARGO_PKG_VERSION"), "perpmaker starting");

    match cli.command {
        Command::Live { market, test } => app::run_live(config, market, test).await,
        Command::Backtest {
            data,
            steps,
            output,
            seed,
        } => app::run_backtest(config, data.as_deref(), steps, output.as_deref(), seed),
        Command::Simulate {
            steps,
            scenario,
            output,
            seed,
        } => app::run_simulate(steps, scenario, output.as_deref(), seed),
        Command::Test => app::run_self_test(config).await,
    }
}
