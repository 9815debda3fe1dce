//! dgr CLI - Resilient diagram renderer.
//!
//! Provides commands for:
//! - `render`: Render a diagram file to SVG with tiered fallbacks
//! - `normalize`: Print the repaired diagram source
//! - `watch`: Re-render a diagram file whenever it changes

mod commands;
mod error;
mod output;

use std::future::Future;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{NormalizeArgs, RenderArgs, WatchArgs};
use error::CliError;
use output::Output;

/// dgr - Render diagrams, even broken ones.
#[derive(Parser)]
#[command(name = "dgr", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a diagram to SVG.
    Render(RenderArgs),
    /// Print the normalized diagram source.
    Normalize(NormalizeArgs),
    /// Re-render a diagram file on every change.
    Watch(WatchArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Render(args) => args.engine.verbose,
        Commands::Watch(args) => args.engine.verbose,
        Commands::Normalize(_) => false,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => block_on(args.execute()),
        Commands::Normalize(args) => args.execute(),
        Commands::Watch(args) => block_on(args.execute()),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

fn block_on(command: impl Future<Output = Result<(), CliError>>) -> Result<(), CliError> {
    tokio::runtime::Runtime::new()?.block_on(command)
}
