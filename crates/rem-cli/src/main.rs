//! rem - ripple effect of metrics for npm dependency trees.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rem_cli::commands::{self, AnalyzeArgs, ConfigCommand};
use rem_config::ConfigManager;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rem", version)]
#[command(about = "Trace how flagged npm packages ripple through a dependency tree", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file path (defaults to ./rem.toml, then the user config)
    #[arg(long, global = true, env = "REM_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a package.json / package-lock.json pair
    Analyze(AnalyzeArgs),

    /// Manage rem configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Analyze(args) => {
            let manager =
                ConfigManager::discover(cli.config.as_deref()).context("Failed to load configuration")?;
            commands::analyze::run(&args, manager.config())
        }
        Command::Config { command } => commands::handle_config_command(command, cli.config.as_deref()),
    }
}
