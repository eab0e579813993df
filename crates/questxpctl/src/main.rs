//! Questxp Control - CLI for the leveling and daily XP engine
//!
//! Drives the engine against a local JSON state file.

use anyhow::Result;
use clap::Parser;
use questxpctl::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet by default; RUST_LOG or --verbose opens it up
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    questxpctl::run(cli).await
}
