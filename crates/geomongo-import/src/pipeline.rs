use chrono::Utc;
use geomongo_core::error::{GeomongoError, Result};
use geomongo_core::formats::{FeatureReader, FeatureStream};
use geomongo_core::models::DatasetDescriptor;
use geomongo_store::ports::{FeatureStore, StoreConnector};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::report::{DatasetReport, ImportSummary};

/// Import pipeline writing datasets through a store connector
pub struct Importer<C, R>
where
    C: StoreConnector,
    R: FeatureReader,
{
    connector: C,
    reader: Arc<R>,
}

impl<C, R> Importer<C, R>
where
    C: StoreConnector + Clone + 'static,
    R: FeatureReader + 'static,
{
    /// Create a new import pipeline
    pub fn new(connector: C, reader: R) -> Self {
        Self {
            connector,
            reader: Arc::new(reader),
        }
    }

    /// Import every dataset concurrently and wait until all are exhausted.
    ///
    /// The first fatal error aborts the remaining datasets and is returned.
    pub async fn run(&self, datasets: Vec<DatasetDescriptor>) -> Result<ImportSummary> {
        let started_at = Utc::now();
        let total = datasets.len();

        let mut tasks = JoinSet::new();
        for (position, dataset) in datasets.into_iter().enumerate() {
            let connector = self.connector.clone();
            let reader = Arc::clone(&self.reader);
            tasks.spawn(async move {
                import_dataset(&connector, reader.as_ref(), &dataset)
                    .await
                    .map(|report| (position, report))
            });
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let (position, report) = match joined {
                Ok(Ok(finished)) => finished,
                Ok(Err(e)) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Err(e) => {
                    tasks.abort_all();
                    return Err(GeomongoError::Store {
                        operation: "import".to_string(),
                        message: format!("dataset task failed: {}", e),
                    });
                }
            };

            tracing::info!(
                dataset = %report.dataset,
                inserted = report.inserted,
                failed = report.failed,
                "Dataset {} finished ({}/{})",
                report.dataset,
                reports.len() + 1,
                total
            );
            reports.push((position, report));
        }

        reports.sort_by_key(|(position, _)| *position);
        tracing::info!("done...");

        Ok(ImportSummary {
            started_at,
            finished_at: Utc::now(),
            datasets: reports.into_iter().map(|(_, report)| report).collect(),
        })
    }
}

/// Import one dataset over its own connection.
///
/// Connection, collection and index setup errors are fatal, as are errors
/// opening or reading the feature source itself.
pub async fn import_dataset<C, R>(
    connector: &C,
    reader: &R,
    dataset: &DatasetDescriptor,
) -> Result<DatasetReport>
where
    C: StoreConnector,
    R: FeatureReader + ?Sized,
{
    let store = connector.connect().await?;

    let collection = store.ensure_collection(&dataset.collection).await?;
    tracing::info!("Collection {} created", dataset.collection);

    store.ensure_geo_index(&collection).await?;
    tracing::info!("2dsphere index on {} created", dataset.collection);

    let mut features = reader.open(dataset)?;
    let report = insert_features(&store, &collection, dataset, &mut features).await?;

    store.close().await?;
    Ok(report)
}

/// Insert features one at a time until the stream is exhausted.
///
/// Insert failures and record-level read errors are logged and counted;
/// any other read error stops the dataset.
pub async fn insert_features<S>(
    store: &S,
    collection: &S::Collection,
    dataset: &DatasetDescriptor,
    features: &mut FeatureStream,
) -> Result<DatasetReport>
where
    S: FeatureStore,
{
    let mut report = DatasetReport::new(&dataset.name);

    while let Some(item) = features.next().await {
        report.read += 1;

        let feature = match item {
            Ok(feature) => feature,
            Err(e) if e.is_record_level() => {
                tracing::warn!(dataset = %dataset.name, "inserting error: {}", e);
                report.failed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        match feature.to_document() {
            Ok(document) => tracing::info!(
                dataset = %dataset.name,
                feature_id = feature.id,
                "insert feature in {} {}",
                dataset.name,
                serde_json::Value::Object(document)
            ),
            Err(e) => tracing::debug!(feature_id = feature.id, "Cannot render document: {}", e),
        }

        match store.insert_feature(collection, &feature).await {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                tracing::warn!(dataset = %dataset.name, feature_id = feature.id, "inserting error: {}", e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
