//! geomongo Import - Shapefile to collection import pipeline
//!
//! Every dataset gets its own connection, collection and 2dsphere index, and
//! its features are inserted one at a time. Datasets run concurrently and the
//! run finishes once all of them are exhausted.

pub mod pipeline;
pub mod report;

pub use pipeline::Importer;
pub use report::{DatasetReport, ImportSummary};
