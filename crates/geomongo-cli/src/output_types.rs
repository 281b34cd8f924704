use geojson::FeatureCollection;
use geomongo_core::models::{Bbox, GeometryKind};
use serde::Serialize;

/// Output for query command
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub collection: String,
    pub bbox: Bbox,
    pub count: usize,
    pub features: FeatureCollection,
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub collection: String,
    pub geometry_kind: Option<GeometryKind>,
    pub config: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub source: String,
}
