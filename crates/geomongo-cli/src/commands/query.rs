//! Query command implementation

use crate::cli::QueryArgs;
use crate::config_loader::{load_config, mongo_connector};
use crate::output::OutputWriter;
use crate::output_types::QueryOutput;
use anyhow::{Context, Result};
use geojson::FeatureCollection;
use geomongo_core::config::CliConfigOverrides;
use geomongo_core::models::{Bbox, BboxQuery, Feature, GeoIndexKind, PointQuery};
use geomongo_store::ports::{FeatureStore, SpatialQuery, StoreConnector};
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Geometry")]
    geometry: String,
    #[tabled(rename = "Properties")]
    properties: String,
}

fn geometry_type(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

impl From<&Feature> for FeatureRow {
    fn from(feature: &Feature) -> Self {
        let geometry = feature
            .geometry
            .as_ref()
            .map(|geometry| geometry_type(&geometry.value).to_string())
            .unwrap_or_else(|| "-".to_string());

        let properties = feature
            .properties
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            id: feature.id,
            geometry,
            properties,
        }
    }
}

/// What the query command looks up
#[derive(Debug, Clone, PartialEq)]
enum Lookup {
    Area(BboxQuery),
    Point(PointQuery),
}

impl Lookup {
    fn bbox(&self) -> Bbox {
        match self {
            Lookup::Area(query) => query.bbox,
            Lookup::Point(query) => query.bbox(),
        }
    }
}

/// Build the lookup described by the arguments
fn build_lookup(args: &QueryArgs) -> Result<Lookup> {
    let index = if args.flat_index {
        GeoIndexKind::Flat2d
    } else {
        GeoIndexKind::Sphere2d
    };

    let lookup = match (args.bbox, args.point) {
        (Some(bbox), _) => {
            let mut query = BboxQuery::new(bbox).with_index(index);
            if let Some(filter) = &args.filter {
                query = query.with_filter(filter.clone());
            }
            Lookup::Area(query)
        }
        (None, Some((x, y))) => {
            let mut query = PointQuery::new(x, y, args.tolerance).with_index(index);
            if let Some(filter) = &args.filter {
                query = query.with_filter(filter.clone());
            }
            Lookup::Point(query)
        }
        (None, None) => anyhow::bail!("Either --bbox or --point is required"),
    };
    lookup.bbox().check_single_hemisphere()?;
    Ok(lookup)
}

async fn find_features<S: SpatialQuery>(
    store: &S,
    collection: &S::Collection,
    lookup: &Lookup,
) -> geomongo_core::Result<Vec<Feature>> {
    match lookup {
        Lookup::Area(query) => store.features_in(collection, query).await,
        Lookup::Point(query) => store.features_at_point(collection, query).await,
    }
}

pub async fn execute(
    args: QueryArgs,
    config_file: Option<&Path>,
    overrides: CliConfigOverrides,
    output: &OutputWriter,
) -> Result<()> {
    let lookup = build_lookup(&args)?;
    let bbox = lookup.bbox();

    let config = load_config(config_file, overrides)?;
    let store = mongo_connector(&config)?.connect().await?;
    let collection = store.collection(&args.collection).await?;

    let features = find_features(&store, &collection, &lookup)
        .await
        .with_context(|| format!("Query on {} failed", args.collection))?;
    store.close().await?;

    tracing::debug!(collection = %args.collection, bbox = %bbox, "Found {} features", features.len());

    if output.is_json() {
        let count = features.len();
        let features = FeatureCollection {
            bbox: None,
            features: features.into_iter().map(geojson::Feature::from).collect(),
            foreign_members: None,
        };
        output.result(QueryOutput {
            collection: args.collection,
            bbox,
            count,
            features,
        })?;
        return Ok(());
    }

    output.section(format!("Features in {} within {}", args.collection, bbox));
    output.table(features.iter().map(FeatureRow::from).collect());
    output.info(format!("{} features", features.len()));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use geomongo_store::memory::MemoryDatabase;

    fn query_args(args: &[&str]) -> QueryArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Some(Commands::Query(args)) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_point_lookup_uses_tolerance_box() {
        let args = query_args(&["geomongo", "query", "points", "--point", "10,20", "--tolerance", "1"]);
        let lookup = build_lookup(&args).unwrap();

        assert_eq!(lookup, Lookup::Point(PointQuery::new(10.0, 20.0, 1.0)));
        assert_eq!(lookup.bbox(), Bbox::new(9.0, 19.0, 11.0, 21.0));
    }

    #[test]
    fn test_flat_index_and_filter() {
        let args = query_args(&[
            "geomongo",
            "query",
            "points",
            "--bbox",
            "0,0,10,10",
            "--flat-index",
            "--filter",
            r#"{"properties.kind":"bar"}"#,
        ]);

        match build_lookup(&args).unwrap() {
            Lookup::Area(query) => {
                assert_eq!(query.index, GeoIndexKind::Flat2d);
                assert!(query.filter.is_some());
            }
            other => panic!("expected an area lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_point_lookup_keeps_filter() {
        let args = query_args(&[
            "geomongo",
            "query",
            "points",
            "--point",
            "1,1",
            "--filter",
            r#"{"properties.kind":"bar"}"#,
        ]);

        match build_lookup(&args).unwrap() {
            Lookup::Point(query) => assert!(query.filter.is_some()),
            other => panic!("expected a point lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_wide_bbox_is_rejected_before_connecting() {
        let args = query_args(&["geomongo", "query", "points", "--bbox", "-100,0,100,10"]);
        let err = build_lookup(&args).unwrap_err();
        assert!(err.to_string().contains("single hemisphere"));
    }

    #[tokio::test]
    async fn test_point_lookup_finds_nearby_features() {
        let db = MemoryDatabase::new();
        let store = db.connect().await.unwrap();
        let collection = store.ensure_collection("points").await.unwrap();
        for (id, x) in [(1, 10.0), (2, 10.05), (3, 11.0)] {
            let geometry = geojson::Geometry::new(geojson::Value::Point(vec![x, 20.0]));
            store
                .insert_feature(&collection, &Feature::new(id, Some(geometry)))
                .await
                .unwrap();
        }

        let args = query_args(&["geomongo", "query", "points", "--point", "10,20", "--tolerance", "0.1"]);
        let lookup = build_lookup(&args).unwrap();
        let features = find_features(&store, &collection, &lookup).await.unwrap();

        assert_eq!(features.len(), 2);
    }
}
