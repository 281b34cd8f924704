use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of importing one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    /// Items pulled from the feature stream
    pub read: u64,
    pub inserted: u64,
    /// Items that were logged and skipped
    pub failed: u64,
}

impl DatasetReport {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            read: 0,
            inserted: 0,
            failed: 0,
        }
    }
}

/// Outcome of a whole import run, datasets in configuration order
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub datasets: Vec<DatasetReport>,
}

impl ImportSummary {
    pub fn total_inserted(&self) -> u64 {
        self.datasets.iter().map(|d| d.inserted).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.datasets.iter().map(|d| d.failed).sum()
    }

    pub fn report(&self, dataset: &str) -> Option<&DatasetReport> {
        self.datasets.iter().find(|d| d.dataset == dataset)
    }
}
