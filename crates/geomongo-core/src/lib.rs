//! geomongo Core - Domain models, configuration and shapefile reading
//!
//! This crate contains the pieces shared by the importer, the storage adapters
//! and the CLI: the error type, the layered configuration, the feature models
//! and the shapefile reader that streams features one at a time.

pub mod config;
pub mod error;
pub mod formats;
pub mod models;

pub use error::{GeomongoError, Result};
