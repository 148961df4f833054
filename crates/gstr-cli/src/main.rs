//! # gstr CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gstr_cli::generate::{run_generate, GenerateArgs};
use gstr_cli::map::{run_map, MapArgs};
use gstr_cli::ranges::{run_ranges, RangesArgs};

/// GSTR filing engine.
///
/// Maps spreadsheet headers onto canonical fields, generates outward-supply
/// returns from mapped rows, and audits document number series.
#[derive(Parser, Debug)]
#[command(name = "gstr", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML filing configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show how source headers map onto canonical fields.
    Map(MapArgs),

    /// Generate a filing from JSON rows.
    Generate(GenerateArgs),

    /// Detect document number ranges and missing serials.
    Ranges(RangesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match gstr_cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::Map(args) => run_map(&args, &config),
        Commands::Generate(args) => run_generate(&args, &config),
        Commands::Ranges(args) => run_ranges(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
