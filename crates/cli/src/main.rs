//! Annalist CLI - Main Entry Point
//!
//! Aggregates the outcome artifacts left behind by test runs into reports
//! and a per-story summary.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::aggregate;

/// Annalist - acceptance test outcome aggregation
#[derive(Parser)]
#[command(name = "annalist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate stored test outcomes into reports
    Aggregate(aggregate::AggregateArgs),

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Aggregate(args) => {
            let strict = args.strict;
            match aggregate::execute(args, cli.format) {
                Ok(successful) => {
                    if strict && !successful {
                        output::print_error("Not every test passed");
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    output::print_error(&format!("{:#}", e));
                    std::process::exit(1);
                }
            }
        }
        Commands::Version => {
            println!("Annalist CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Core library: annalist-common v{}", annalist_common::VERSION);
        }
    }

    Ok(())
}
