//! Import pipeline tests against the in-memory store

use geojson::{Geometry, Value};
use geomongo_core::error::{GeomongoError, Result};
use geomongo_core::formats::{FeatureReader, FeatureStream};
use geomongo_core::models::{DatasetDescriptor, Feature, DEFAULT_DATASETS};
use geomongo_import::Importer;
use geomongo_store::memory::{IndexKind, MemoryDatabase};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
enum Fixture {
    Point(u64, f64, f64),
    Unsupported(u64),
    Truncated,
}

impl Fixture {
    fn item(&self) -> Result<Feature> {
        match self {
            Fixture::Point(id, x, y) => Ok(Feature::new(
                *id,
                Some(Geometry::new(Value::Point(vec![*x, *y]))),
            )
            .with_property("label", format!("feature {}", id))),
            Fixture::Unsupported(id) => Err(GeomongoError::UnsupportedGeometry {
                feature_id: *id,
                reason: "Multipatch geometry type is not supported".to_string(),
            }),
            Fixture::Truncated => Err(GeomongoError::FormatError {
                format: "Shapefile".to_string(),
                message: "unexpected end of file".to_string(),
            }),
        }
    }
}

/// Serves canned features per dataset; unknown datasets fail to open
#[derive(Default)]
struct FixtureReader {
    datasets: HashMap<String, Vec<Fixture>>,
    delays: HashMap<String, Duration>,
}

impl FixtureReader {
    fn with(mut self, dataset: &str, fixtures: Vec<Fixture>) -> Self {
        self.datasets.insert(dataset.to_string(), fixtures);
        self
    }

    fn slow(mut self, dataset: &str, delay: Duration) -> Self {
        self.delays.insert(dataset.to_string(), delay);
        self
    }
}

impl FeatureReader for FixtureReader {
    fn open(&self, dataset: &DatasetDescriptor) -> Result<FeatureStream> {
        let fixtures = self.datasets.get(&dataset.name).cloned().ok_or_else(|| {
            GeomongoError::InvalidPath {
                path: dataset.path.clone(),
                reason: "Shapefile not found".to_string(),
            }
        })?;
        let delay = self.delays.get(&dataset.name).copied();

        Ok(FeatureStream::from_blocking(move |sink| {
            for fixture in fixtures {
                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }
                if !sink.send(fixture.item()) {
                    break;
                }
            }
        }))
    }

    fn format_name(&self) -> &str {
        "Fixture"
    }
}

fn datasets() -> Vec<DatasetDescriptor> {
    DatasetDescriptor::all(DEFAULT_DATASETS, "shp")
}

fn full_reader() -> FixtureReader {
    FixtureReader::default()
        .with(
            "points",
            vec![
                Fixture::Point(1, 13.4, 52.5),
                Fixture::Point(2, 2.35, 48.85),
                Fixture::Point(3, -0.12, 51.5),
            ],
        )
        .with("linestrings", vec![Fixture::Point(1, 0.0, 0.0)])
        .with("polygons", vec![Fixture::Point(1, 1.0, 1.0), Fixture::Point(2, 2.0, 2.0)])
}

fn geo_index_count(db: &MemoryDatabase, collection: &str) -> usize {
    db.indexes(collection)
        .iter()
        .filter(|index| index.field == "geometry" && index.kind == IndexKind::Sphere2d)
        .count()
}

#[tokio::test]
async fn test_imports_every_dataset_into_its_own_collection() {
    let db = MemoryDatabase::new();
    let importer = Importer::new(db.clone(), full_reader());

    let summary = importer.run(datasets()).await.unwrap();

    assert_eq!(db.collection_names(), vec!["linestrings", "points", "polygons"]);
    assert_eq!(db.documents("points").len(), 3);
    assert_eq!(db.documents("linestrings").len(), 1);
    assert_eq!(db.documents("polygons").len(), 2);
    for name in DEFAULT_DATASETS {
        assert_eq!(geo_index_count(&db, name), 1);
    }

    let names: Vec<&str> = summary.datasets.iter().map(|d| d.dataset.as_str()).collect();
    assert_eq!(names, vec!["points", "linestrings", "polygons"]);
    assert_eq!(summary.total_inserted(), 6);
    assert_eq!(summary.total_failed(), 0);
    assert!(summary.finished_at >= summary.started_at);
}

#[tokio::test]
async fn test_each_dataset_uses_one_connection_and_closes_it() {
    let db = MemoryDatabase::new();
    let importer = Importer::new(db.clone(), full_reader());

    importer.run(datasets()).await.unwrap();

    assert_eq!(db.connections_opened(), 3);
    assert_eq!(db.open_connections(), 0);
}

#[tokio::test]
async fn test_documents_are_geojson_features_in_read_order() {
    let db = MemoryDatabase::new();
    let importer = Importer::new(db.clone(), full_reader());

    importer.run(datasets()).await.unwrap();

    let documents = db.documents("points");
    let ids: Vec<u64> = documents.iter().map(|d| d["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let first = &documents[0];
    assert_eq!(first["type"], "Feature");
    assert_eq!(first["geometry"]["type"], "Point");
    assert_eq!(first["properties"]["label"], "feature 1");
}

#[tokio::test]
async fn test_empty_dataset_still_completes() {
    let db = MemoryDatabase::new();
    let reader = full_reader().with("linestrings", Vec::new());
    let importer = Importer::new(db.clone(), reader);

    let summary = importer.run(datasets()).await.unwrap();

    let report = summary.report("linestrings").unwrap();
    assert_eq!(report.read, 0);
    assert_eq!(report.inserted, 0);
    assert!(db.collection_names().contains(&"linestrings".to_string()));
    assert_eq!(geo_index_count(&db, "linestrings"), 1);
    assert_eq!(db.open_connections(), 0);
}

#[tokio::test]
async fn test_rejected_insert_is_skipped() {
    let db = MemoryDatabase::new();
    db.create_unique_index("points", "id");
    let reader = full_reader().with(
        "points",
        vec![Fixture::Point(1, 13.4, 52.5), Fixture::Point(1, 2.35, 48.85)],
    );
    let importer = Importer::new(db.clone(), reader);

    let summary = importer.run(datasets()).await.unwrap();

    let report = summary.report("points").unwrap();
    assert_eq!(report.read, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(db.documents("points").len(), 1);
    assert_eq!(summary.report("polygons").unwrap().inserted, 2);
}

#[tokio::test]
async fn test_unsupported_record_is_skipped() {
    let db = MemoryDatabase::new();
    let reader = full_reader().with(
        "polygons",
        vec![
            Fixture::Point(1, 1.0, 1.0),
            Fixture::Unsupported(2),
            Fixture::Point(3, 3.0, 3.0),
        ],
    );
    let importer = Importer::new(db.clone(), reader);

    let summary = importer.run(datasets()).await.unwrap();

    let report = summary.report("polygons").unwrap();
    assert_eq!(report.read, report.inserted + report.failed);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_rerun_duplicates_documents_but_not_indexes() {
    let db = MemoryDatabase::new();
    let importer = Importer::new(db.clone(), full_reader());

    importer.run(datasets()).await.unwrap();
    importer.run(datasets()).await.unwrap();

    assert_eq!(db.documents("points").len(), 6);
    assert_eq!(geo_index_count(&db, "points"), 1);
}

#[tokio::test]
async fn test_missing_dataset_fails_the_run() {
    let db = MemoryDatabase::new();
    let reader = FixtureReader::default().with("points", vec![Fixture::Point(1, 0.0, 0.0)]);
    let importer = Importer::new(db, reader);

    let err = importer.run(datasets()).await.unwrap_err();
    assert!(matches!(err, GeomongoError::InvalidPath { .. }));
}

#[tokio::test]
async fn test_refused_connection_fails_the_run() {
    let db = MemoryDatabase::new();
    db.refuse_connections();
    let importer = Importer::new(db, full_reader());

    let err = importer.run(datasets()).await.unwrap_err();
    assert!(matches!(err, GeomongoError::Connection { .. }));
}

#[tokio::test]
async fn test_read_failure_fails_the_run() {
    let db = MemoryDatabase::new();
    let reader = full_reader().with(
        "points",
        vec![Fixture::Point(1, 0.0, 0.0), Fixture::Truncated],
    );
    let importer = Importer::new(db, reader);

    let err = importer.run(datasets()).await.unwrap_err();
    assert!(!err.is_record_level());
}

#[tokio::test]
async fn test_run_waits_for_slowest_dataset() {
    let db = MemoryDatabase::new();
    let reader = full_reader().slow("points", Duration::from_millis(20));
    let importer = Importer::new(db.clone(), reader);

    let summary = importer.run(datasets()).await.unwrap();

    assert_eq!(summary.report("points").unwrap().inserted, 3);
    assert_eq!(db.documents("points").len(), 3);
}

#[tokio::test]
async fn test_no_datasets_is_an_empty_run() {
    let db = MemoryDatabase::new();
    let importer = Importer::new(db.clone(), full_reader());

    let summary = importer.run(Vec::new()).await.unwrap();

    assert!(summary.datasets.is_empty());
    assert_eq!(db.connections_opened(), 0);
}
