//! Command implementations

mod import;
mod inspect;
mod query;

use crate::cli::{Cli, Commands, ImportArgs};
use crate::output::OutputWriter;
use anyhow::Result;
use geomongo_core::config::CliConfigOverrides;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let overrides = CliConfigOverrides {
        uri: cli.uri,
        database: cli.database,
        ..Default::default()
    };
    let config_file = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Import(ImportArgs::default())) {
        Commands::Import(args) => import::execute(args, config_file, overrides, &output).await,
        Commands::Query(args) => query::execute(args, config_file, overrides, &output).await,
        Commands::Inspect(args) => inspect::execute(args, config_file, overrides, &output).await,
    }
}
