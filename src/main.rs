//! Marker scripts - main entry point
//!
//! This binary provides three subcommands:
//! - run: Evaluate a marker script over bar data and export the markers
//! - inspect: Decode the labels of exported open markers
//! - scripts: List registered scripts

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "marker-scripts")]
#[command(about = "Per-bar marker scripts exporting session OHLC and earnings labels", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a marker script over bar data
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/ohlc_1m.json")]
        config: String,

        /// Script name (overrides config file)
        #[arg(short, long)]
        script: Option<String>,

        /// Symbols to run (comma-separated, overrides config file)
        #[arg(long)]
        symbols: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Output directory (overrides config file)
        #[arg(short, long)]
        output: Option<String>,

        /// Run symbols sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },

    /// Decode the labels in an exported markers CSV
    Inspect {
        /// Markers CSV written by `run`
        path: PathBuf,
    },

    /// List registered scripts
    Scripts,
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Console goes to stderr so `inspect` output stays pipeable
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Run { .. } => "run",
        Commands::Inspect { .. } => "inspect",
        Commands::Scripts => "scripts",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Run {
            config,
            script,
            symbols,
            start,
            end,
            output,
            sequential,
        } => commands::run::run(commands::run::RunArgs {
            config_path: config,
            script,
            symbols,
            start,
            end,
            output,
            sequential,
        }),
        Commands::Inspect { path } => commands::inspect::run(path),
        Commands::Scripts => commands::scripts::run(),
    }
}
