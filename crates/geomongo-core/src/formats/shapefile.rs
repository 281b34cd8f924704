//! Shapefile format reader implementation
//!
//! This module provides support for reading ESRI Shapefiles using pure Rust.
//! Shapefiles consist of multiple component files (.shp, .shx, .dbf, .prj);
//! the first three must be present. Features are read one at a time and
//! converted to GeoJSON geometry plus a property map.

use geojson::{Geometry, JsonObject, JsonValue, Value};
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{PolygonRing, Reader as ShapefileReader, Shape};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{GeomongoError, Result};
use crate::formats::{FeatureReader, FeatureSink, FeatureStream};
use crate::models::{DatasetDescriptor, Feature};

const FORMAT_NAME: &str = "Shapefile";

/// Shapefile format reader
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapefileFeatureReader;

impl FeatureReader for ShapefileFeatureReader {
    fn open(&self, dataset: &DatasetDescriptor) -> Result<FeatureStream> {
        let path = shp_path(&dataset.path)?;

        // Verify all required component files exist
        verify_components(&path)?;

        tracing::debug!(dataset = %dataset.name, path = %path.display(), "Opening shapefile");

        Ok(FeatureStream::from_blocking(move |sink| {
            read_features(&path, &sink)
        }))
    }

    fn format_name(&self) -> &str {
        FORMAT_NAME
    }
}

/// Resolve the .shp file of a dataset path given with or without extension
fn shp_path(path: &Path) -> Result<PathBuf> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("shp") => Ok(path.to_path_buf()),
        _ if path.file_name().is_none() => Err(GeomongoError::InvalidPath {
            path: path.to_path_buf(),
            reason: "Not a Shapefile (.shp)".to_string(),
        }),
        _ => {
            let mut file: OsString = path.as_os_str().to_owned();
            file.push(".shp");
            Ok(PathBuf::from(file))
        }
    }
}

/// Verify that all required Shapefile component files exist
fn verify_components(path: &Path) -> Result<()> {
    let missing: Vec<String> = ["shp", "shx", "dbf"]
        .iter()
        .filter(|ext| !path.with_extension(ext).exists())
        .map(|ext| format!(".{}", ext))
        .collect();

    if !missing.is_empty() {
        return Err(GeomongoError::FormatError {
            format: FORMAT_NAME.to_string(),
            message: format!(
                "Missing required component files for {}: {}",
                path.display(),
                missing.join(", ")
            ),
        });
    }

    Ok(())
}

/// Read every shape and record, sending features until the consumer stops
fn read_features(path: &Path, sink: &FeatureSink) {
    let mut reader = match ShapefileReader::from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            sink.send(Err(GeomongoError::FormatError {
                format: FORMAT_NAME.to_string(),
                message: format!("Failed to open Shapefile: {}", e),
            }));
            return;
        }
    };

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let id = index as u64 + 1;
        let item = result
            .map_err(|e| GeomongoError::FormatError {
                format: FORMAT_NAME.to_string(),
                message: format!("Failed to read feature {}: {}", id, e),
            })
            .and_then(|(shape, record)| {
                let geometry = convert_shape(id, &shape)?;
                Ok(Feature {
                    id,
                    geometry,
                    properties: extract_properties(record),
                })
            });

        let fatal = matches!(&item, Err(e) if !e.is_record_level());
        if !sink.send(item) || fatal {
            break;
        }
    }
}

/// Points of any dimension as GeoJSON positions
trait Position {
    fn position(&self) -> Vec<f64>;
}

impl Position for shapefile::Point {
    fn position(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }
}

impl Position for shapefile::PointM {
    fn position(&self) -> Vec<f64> {
        vec![self.x, self.y]
    }
}

impl Position for shapefile::PointZ {
    fn position(&self) -> Vec<f64> {
        vec![self.x, self.y, self.z]
    }
}

fn positions<P: Position>(points: &[P]) -> Vec<Vec<f64>> {
    points.iter().map(Position::position).collect()
}

fn line_value<P: Position>(parts: &[Vec<P>]) -> Value {
    let mut lines: Vec<Vec<Vec<f64>>> = parts.iter().map(|part| positions(part)).collect();

    if lines.len() == 1 {
        Value::LineString(lines.remove(0))
    } else {
        Value::MultiLineString(lines)
    }
}

/// Outer rings start a polygon; inner rings belong to the latest outer ring
fn polygon_value<P: Position>(rings: &[PolygonRing<P>]) -> Value {
    let mut polygons: Vec<Vec<Vec<Vec<f64>>>> = Vec::new();

    for ring in rings {
        let coordinates = positions(ring.points());
        match (ring, polygons.last_mut()) {
            (PolygonRing::Inner(_), Some(polygon)) => polygon.push(coordinates),
            _ => polygons.push(vec![coordinates]),
        }
    }

    if polygons.len() == 1 {
        Value::Polygon(polygons.remove(0))
    } else {
        Value::MultiPolygon(polygons)
    }
}

/// Convert shapefile Shape to GeoJSON geometry
fn convert_shape(id: u64, shape: &Shape) -> Result<Option<Geometry>> {
    let value = match shape {
        Shape::Point(point) => Value::Point(point.position()),
        Shape::PointM(point) => Value::Point(point.position()),
        Shape::PointZ(point) => Value::Point(point.position()),
        Shape::Polyline(polyline) => line_value(polyline.parts()),
        Shape::PolylineM(polyline) => line_value(polyline.parts()),
        Shape::PolylineZ(polyline) => line_value(polyline.parts()),
        Shape::Polygon(polygon) => polygon_value(polygon.rings()),
        Shape::PolygonM(polygon) => polygon_value(polygon.rings()),
        Shape::PolygonZ(polygon) => polygon_value(polygon.rings()),
        Shape::Multipoint(multipoint) => Value::MultiPoint(positions(multipoint.points())),
        Shape::MultipointM(multipoint) => Value::MultiPoint(positions(multipoint.points())),
        Shape::MultipointZ(multipoint) => Value::MultiPoint(positions(multipoint.points())),
        Shape::Multipatch(_) => {
            return Err(GeomongoError::UnsupportedGeometry {
                feature_id: id,
                reason: "Multipatch geometry type is not supported".to_string(),
            })
        }
        Shape::NullShape => return Ok(None),
    };

    Ok(Some(Geometry::new(value)))
}

/// Extract properties from DBF record
fn extract_properties(record: shapefile::dbase::Record) -> JsonObject {
    record
        .into_iter()
        .map(|(name, value)| (name, convert_dbase_value(&value)))
        .collect()
}

fn number(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Convert dBase field value to JSON value
fn convert_dbase_value(value: &DbaseFieldValue) -> JsonValue {
    match value {
        DbaseFieldValue::Character(Some(s)) => JsonValue::String(s.clone()),
        DbaseFieldValue::Numeric(Some(n)) => number(*n),
        DbaseFieldValue::Logical(Some(b)) => JsonValue::Bool(*b),
        DbaseFieldValue::Date(Some(date)) => JsonValue::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        DbaseFieldValue::Float(Some(f)) => number(*f as f64),
        DbaseFieldValue::Character(None)
        | DbaseFieldValue::Numeric(None)
        | DbaseFieldValue::Logical(None)
        | DbaseFieldValue::Date(None)
        | DbaseFieldValue::Float(None) => JsonValue::Null,
        DbaseFieldValue::Integer(i) => JsonValue::Number((*i).into()),
        DbaseFieldValue::Currency(c) => number(*c),
        // dbase::DateTime only exposes the date part
        DbaseFieldValue::DateTime(dt) => JsonValue::String(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
        DbaseFieldValue::Double(d) => number(*d),
        DbaseFieldValue::Memo(s) => JsonValue::String(s.clone()),
    }
}
