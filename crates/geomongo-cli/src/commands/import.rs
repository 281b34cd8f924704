//! Import command implementation

use crate::cli::ImportArgs;
use crate::config_loader::{load_config, mongo_connector};
use crate::output::OutputWriter;
use anyhow::Result;
use geomongo_core::config::{parse_dataset_list, CliConfigOverrides};
use geomongo_core::formats::ShapefileFeatureReader;
use geomongo_import::{DatasetReport, Importer};
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct DatasetRow {
    #[tabled(rename = "Dataset")]
    dataset: String,
    #[tabled(rename = "Read")]
    read: u64,
    #[tabled(rename = "Inserted")]
    inserted: u64,
    #[tabled(rename = "Failed")]
    failed: u64,
}

impl From<&DatasetReport> for DatasetRow {
    fn from(report: &DatasetReport) -> Self {
        Self {
            dataset: report.dataset.clone(),
            read: report.read,
            inserted: report.inserted,
            failed: report.failed,
        }
    }
}

pub async fn execute(
    args: ImportArgs,
    config_file: Option<&Path>,
    mut overrides: CliConfigOverrides,
    output: &OutputWriter,
) -> Result<()> {
    overrides.data_dir = args.data_dir;
    overrides.datasets = args
        .datasets
        .as_deref()
        .map(parse_dataset_list)
        .transpose()?;

    let config = load_config(config_file, overrides)?;
    let connector = mongo_connector(&config)?;
    let datasets = config.dataset_descriptors();

    tracing::info!(
        uri = %config.uri.value,
        database = %config.database.value,
        data_dir = %config.data_dir.value.display(),
        "Importing {} datasets",
        datasets.len()
    );

    let importer = Importer::new(connector, ShapefileFeatureReader);
    let summary = importer.run(datasets).await?;

    if output.is_json() {
        output.result(&summary)?;
        return Ok(());
    }

    output.section("Import Summary");
    output.table(summary.datasets.iter().map(DatasetRow::from).collect());

    let elapsed = summary.finished_at - summary.started_at;
    let message = format!(
        "Inserted {} features into {} collections in {:.1}s",
        summary.total_inserted(),
        summary.datasets.len(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    if summary.total_failed() > 0 {
        output.warning(format!("{} features could not be inserted", summary.total_failed()));
    }
    output.success(message);

    Ok(())
}
