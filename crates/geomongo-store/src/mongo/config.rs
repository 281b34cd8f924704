//! MongoDB configuration

use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Characters MongoDB does not allow in database names
const FORBIDDEN_DATABASE_CHARS: [char; 8] = ['/', '\\', '.', ' ', '"', '$', '*', '\0'];

/// MongoDB connection configuration
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection string (`mongodb://` or `mongodb+srv://`)
    pub uri: String,
    /// Database holding the dataset collections
    pub database: String,
    /// Application name reported to the server
    pub app_name: String,
    /// Timeout for establishing a connection
    pub connect_timeout: Duration,
    /// Timeout for finding a suitable server
    pub server_selection_timeout: Duration,
}

impl MongoConfig {
    /// Create a new configuration for the given server and database
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            uri: uri.into(),
            database: database.into(),
            app_name: "geomongo".to_string(),
            connect_timeout: Duration::from_secs(10),
            server_selection_timeout: Duration::from_secs(30),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::Missing("uri".to_string()));
        }

        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::Invalid {
                key: "uri".to_string(),
                reason: "must start with mongodb:// or mongodb+srv://".to_string(),
            });
        }

        if self.database.is_empty() {
            return Err(ConfigError::Missing("database".to_string()));
        }

        if self.database.len() >= 64 {
            return Err(ConfigError::Invalid {
                key: "database".to_string(),
                reason: "must be shorter than 64 characters".to_string(),
            });
        }

        if self.database.contains(FORBIDDEN_DATABASE_CHARS) {
            return Err(ConfigError::Invalid {
                key: "database".to_string(),
                reason: format!("cannot contain any of {:?}", FORBIDDEN_DATABASE_CHARS),
            });
        }

        if self.connect_timeout.is_zero() || self.server_selection_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "timeout".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
