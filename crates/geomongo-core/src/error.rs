//! Error types for geomongo

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeomongoError {
    // Dataset errors
    #[error("Invalid dataset path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    #[error("Unsupported geometry at feature {feature_id}: {reason}")]
    UnsupportedGeometry { feature_id: u64, reason: String },

    // Store errors
    #[error("Failed to connect to {uri}: {message}")]
    Connection { uri: String, message: String },

    #[error("{operation} failed: {message}")]
    Store { operation: String, message: String },

    #[error("Insert into {collection} failed: {message}")]
    Insert { collection: String, message: String },

    #[error("Collection not found: {name}")]
    CollectionNotFound { name: String },

    // Query errors
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GeomongoError {
    /// Whether the error only affects a single feature.
    ///
    /// Record-level errors are logged and skipped by the importer; everything
    /// else aborts the dataset.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            GeomongoError::UnsupportedGeometry { .. } | GeomongoError::Insert { .. }
        )
    }
}

impl From<serde_json::Error> for GeomongoError {
    fn from(err: serde_json::Error) -> Self {
        GeomongoError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeomongoError>;
