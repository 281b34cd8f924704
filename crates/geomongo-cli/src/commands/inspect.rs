//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::config_loader::{load_config, mongo_connector};
use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, InspectOutput};
use anyhow::Result;
use geomongo_core::config::CliConfigOverrides;
use geomongo_store::ports::{FeatureStore, SpatialQuery, StoreConnector};
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub async fn execute(
    args: InspectArgs,
    config_file: Option<&Path>,
    overrides: CliConfigOverrides,
    output: &OutputWriter,
) -> Result<()> {
    let config = load_config(config_file, overrides)?;

    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();
    // Sort by key for consistent output
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    let store = mongo_connector(&config)?.connect().await?;
    let collection = store.collection(&args.collection).await?;
    let geometry_kind = store.geometry_kind(&collection).await?;
    store.close().await?;

    if output.is_json() {
        output.result(InspectOutput {
            collection: args.collection,
            geometry_kind,
            config: entries,
        })?;
        return Ok(());
    }

    output.section(format!("Collection {}", args.collection));
    match geometry_kind {
        Some(kind) => output.kv("Geometry type", kind),
        None => output.kv("Geometry type", "unknown (empty or mixed collection)"),
    }

    output.section("Configuration Values");
    output.table(
        entries
            .into_iter()
            .map(|entry| ConfigRow {
                key: entry.key,
                value: entry.value,
                source: entry.source,
            })
            .collect(),
    );
    output.info("CLI arguments > Environment variables > Config file > Defaults");

    Ok(())
}
