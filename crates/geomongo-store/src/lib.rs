//! geomongo Store - Storage ports and adapters
//!
//! This crate defines the storage ports used by the importer and the query
//! commands, and provides the MongoDB adapter plus an in-memory adapter for
//! development and testing.

pub mod memory;
pub mod mongo;
pub mod ports;
