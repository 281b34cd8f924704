use crate::error::{GeomongoError, Result};
use crate::models::{DatasetDescriptor, DEFAULT_DATASETS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "gis";
pub const DEFAULT_DATA_DIR: &str = "shp";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for geomongo
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub uri: ConfigValue<String>,
    pub database: ConfigValue<String>,
    pub data_dir: ConfigValue<PathBuf>,
    pub datasets: ConfigValue<Vec<String>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            uri: ConfigValue::new(DEFAULT_URI.to_string(), ConfigSource::Default),
            database: ConfigValue::new(DEFAULT_DATABASE.to_string(), ConfigSource::Default),
            data_dir: ConfigValue::new(PathBuf::from(DEFAULT_DATA_DIR), ConfigSource::Default),
            datasets: ConfigValue::new(
                DEFAULT_DATASETS.iter().map(|s| s.to_string()).collect(),
                ConfigSource::Default,
            ),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| GeomongoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| GeomongoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(uri) = file_config.uri {
            self.uri.update(uri, ConfigSource::File);
        }

        if let Some(database) = file_config.database {
            self.database.update(database, ConfigSource::File);
        }

        if let Some(data_dir) = file_config.data_dir {
            self.data_dir.update(data_dir, ConfigSource::File);
        }

        if let Some(datasets) = file_config.datasets {
            let datasets = validate_datasets(datasets)?;
            self.datasets.update(datasets, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // GEOMONGO_URI
        if let Ok(uri) = env::var("GEOMONGO_URI") {
            if uri.trim().is_empty() {
                tracing::warn!("Ignoring empty GEOMONGO_URI");
            } else {
                self.uri.update(uri, ConfigSource::Environment);
            }
        }

        // GEOMONGO_DATABASE
        if let Ok(database) = env::var("GEOMONGO_DATABASE") {
            if database.trim().is_empty() {
                tracing::warn!("Ignoring empty GEOMONGO_DATABASE");
            } else {
                self.database.update(database, ConfigSource::Environment);
            }
        }

        // GEOMONGO_DATA_DIR
        if let Ok(data_dir) = env::var("GEOMONGO_DATA_DIR") {
            self.data_dir.update(PathBuf::from(data_dir), ConfigSource::Environment);
        }

        // GEOMONGO_DATASETS
        if let Ok(datasets_str) = env::var("GEOMONGO_DATASETS") {
            match parse_dataset_list(&datasets_str) {
                Ok(datasets) => self.datasets.update(datasets, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid GEOMONGO_DATASETS value '{}': expected comma separated dataset names",
                    datasets_str
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(uri) = overrides.uri {
            self.uri.update(uri, ConfigSource::Cli);
        }

        if let Some(database) = overrides.database {
            self.database.update(database, ConfigSource::Cli);
        }

        if let Some(data_dir) = overrides.data_dir {
            self.data_dir.update(data_dir, ConfigSource::Cli);
        }

        if let Some(datasets) = overrides.datasets {
            self.datasets.update(datasets, ConfigSource::Cli);
        }
    }

    /// Dataset descriptors for the configured names and data directory
    pub fn dataset_descriptors(&self) -> Vec<DatasetDescriptor> {
        DatasetDescriptor::all(self.datasets.value.iter().cloned(), &self.data_dir.value)
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert("uri".to_string(), (self.uri.value.clone(), self.uri.source));
        map.insert(
            "database".to_string(),
            (self.database.value.clone(), self.database.source),
        );
        map.insert(
            "data_dir".to_string(),
            (self.data_dir.value.display().to_string(), self.data_dir.source),
        );
        map.insert(
            "datasets".to_string(),
            (self.datasets.value.join(","), self.datasets.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    uri: Option<String>,
    database: Option<String>,
    data_dir: Option<PathBuf>,
    datasets: Option<Vec<String>>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub uri: Option<String>,
    pub database: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub datasets: Option<Vec<String>>,
}

/// Parse a comma separated list of dataset names
pub fn parse_dataset_list(s: &str) -> Result<Vec<String>> {
    validate_datasets(s.split(',').map(|name| name.to_string()).collect())
}

fn validate_datasets(names: Vec<String>) -> Result<Vec<String>> {
    let names: Vec<String> = names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return Err(GeomongoError::ConfigInvalid {
            key: "datasets".to_string(),
            reason: "at least one dataset name is required".to_string(),
        });
    }

    if let Some(name) = names.iter().find(|name| name.contains(['/', '\\', '$'])) {
        return Err(GeomongoError::ConfigInvalid {
            key: "datasets".to_string(),
            reason: format!("'{}' cannot be used as a collection name", name),
        });
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dataset_list() {
        assert_eq!(
            parse_dataset_list("points, roads ,,parcels").unwrap(),
            vec!["points", "roads", "parcels"]
        );
        assert!(parse_dataset_list(" , ").is_err());
        assert!(parse_dataset_list("points,a/b").is_err());
        assert!(parse_dataset_list("$cmd").is_err());
    }

    #[test]
    fn test_lower_precedence_does_not_override() {
        let mut value = ConfigValue::new("cli".to_string(), ConfigSource::Cli);
        value.update("env".to_string(), ConfigSource::Environment);
        assert_eq!(value.value, "cli");
        assert_eq!(value.source, ConfigSource::Cli);
    }

    #[test]
    fn test_dataset_descriptors_follow_data_dir() {
        let mut config = LayeredConfig::with_defaults();
        config.update_from_cli(CliConfigOverrides {
            data_dir: Some(PathBuf::from("/srv/shp")),
            ..Default::default()
        });

        let datasets = config.dataset_descriptors();
        assert_eq!(datasets.len(), 3);
        assert_eq!(datasets[0].path, PathBuf::from("/srv/shp/points"));
    }
}
