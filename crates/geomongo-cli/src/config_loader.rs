//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use geomongo_core::config::{CliConfigOverrides, LayeredConfig};
use geomongo_store::mongo::{MongoConfig, MongoConnector};
use std::path::Path;

/// Configuration file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "geomongo.toml";

/// Load layered configuration: defaults, file, environment, then CLI flags
pub fn load_config(config_file: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    match config_file {
        Some(path) => {
            config = config
                .load_from_file(path)
                .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
        }
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                config = config
                    .load_from_file(path)
                    .context("Failed to load configuration file geomongo.toml")?;
            }
        }
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    Ok(config)
}

/// Build a MongoDB connector for the configured server and database
pub fn mongo_connector(config: &LayeredConfig) -> Result<MongoConnector> {
    let mongo = MongoConfig::new(config.uri.value.clone(), config.database.value.clone())
        .context("Invalid MongoDB configuration")?;
    let connector = MongoConnector::new(mongo)?;
    Ok(connector)
}
