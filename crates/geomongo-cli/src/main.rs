//! geomongo CLI
//!
//! Imports shapefile datasets into MongoDB and queries them back by location.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod output;
mod output_types;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create async runtime
    let runtime = tokio::runtime::Runtime::new()?;

    // Execute the command
    if let Err(error) = runtime.block_on(commands::execute(cli)) {
        errors::from_anyhow(&error).display();
        std::process::exit(1);
    }

    Ok(())
}
