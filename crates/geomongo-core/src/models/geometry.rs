use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GeomongoError, Result};
use crate::models::GEOMETRY_FIELD;

/// Axis-aligned bounding box in longitude/latitude degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Bbox {
    /// Build a box from two corners in any order
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            minx: x0.min(x1),
            miny: y0.min(y1),
            maxx: x0.max(x1),
            maxy: y0.max(y1),
        }
    }

    /// Square box of half-size `tolerance` centered on a point
    pub fn around_point(x: f64, y: f64, tolerance: f64) -> Self {
        Self::new(x - tolerance, y - tolerance, x + tolerance, y + tolerance)
    }

    /// The whole lon/lat extent
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }

    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }

    /// Spherical queries cannot span more than one hemisphere
    pub fn check_single_hemisphere(&self) -> Result<()> {
        if self.width().abs() > 180.0 || self.height().abs() > 180.0 {
            return Err(GeomongoError::InvalidQuery(
                "try to query more than a single hemisphere".to_string(),
            ));
        }
        Ok(())
    }

    /// Closed exterior ring, counter-clockwise from the lower-left corner
    pub fn exterior_ring(&self) -> Vec<[f64; 2]> {
        vec![
            [self.minx, self.miny],
            [self.maxx, self.miny],
            [self.maxx, self.maxy],
            [self.minx, self.maxy],
            [self.minx, self.miny],
        ]
    }
}

impl FromStr for Bbox {
    type Err = GeomongoError;

    /// Parse `minx,miny,maxx,maxy`; commas and whitespace both separate
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            GeomongoError::InvalidQuery(format!(
                "Invalid bbox '{}': expected minx,miny,maxx,maxy",
                s
            ))
        };

        let values = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<f64>>>()?;

        match values.as_slice() {
            [x0, y0, x1, y1] => Ok(Self::new(*x0, *y0, *x1, *y1)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.minx, self.miny, self.maxx, self.maxy)
    }
}

/// Geometry type reported for a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    /// Map a GeoJSON `type` member; other types have no kind
    pub fn from_geojson_type(type_name: &str) -> Option<Self> {
        match type_name {
            "Point" => Some(GeometryKind::Point),
            "LineString" => Some(GeometryKind::LineString),
            "Polygon" => Some(GeometryKind::Polygon),
            _ => None,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
        };
        f.write_str(name)
    }
}

/// Index the geometry field was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeoIndexKind {
    /// Spherical index; queries use `$geoIntersects`
    #[default]
    Sphere2d,
    /// Flat legacy index; queries use `$geoWithin` with `$box`
    Flat2d,
}

/// Bounding box query against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct BboxQuery {
    pub bbox: Bbox,
    pub index: GeoIndexKind,
    /// Extra conditions merged into the spatial filter
    pub filter: Option<JsonObject>,
}

impl BboxQuery {
    pub fn new(bbox: Bbox) -> Self {
        Self {
            bbox,
            index: GeoIndexKind::default(),
            filter: None,
        }
    }

    pub fn with_index(mut self, index: GeoIndexKind) -> Self {
        self.index = index;
        self
    }

    pub fn with_filter(mut self, filter: JsonObject) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Extra conditions may not touch the geometry field the bbox applies to
    pub fn check_filter(&self) -> Result<()> {
        let prefix = format!("{}.", GEOMETRY_FIELD);
        let clash = self.filter.iter().flat_map(|filter| filter.keys()).find(|key| {
            key.as_str() == GEOMETRY_FIELD || key.starts_with(&prefix)
        });

        match clash {
            Some(key) => Err(GeomongoError::InvalidQuery(format!(
                "extra filter cannot constrain '{}'; the bbox already applies to it",
                key
            ))),
            None => Ok(()),
        }
    }
}

/// Lookup of the features around a point
///
/// Matched through the square of half side `tolerance` centered on the point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointQuery {
    pub x: f64,
    pub y: f64,
    pub tolerance: f64,
    pub index: GeoIndexKind,
    pub filter: Option<JsonObject>,
}

impl PointQuery {
    pub fn new(x: f64, y: f64, tolerance: f64) -> Self {
        Self {
            x,
            y,
            tolerance,
            index: GeoIndexKind::default(),
            filter: None,
        }
    }

    pub fn with_index(mut self, index: GeoIndexKind) -> Self {
        self.index = index;
        self
    }

    pub fn with_filter(mut self, filter: JsonObject) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn bbox(&self) -> Bbox {
        Bbox::around_point(self.x, self.y, self.tolerance)
    }

    /// The equivalent bounding box query
    pub fn to_bbox_query(&self) -> BboxQuery {
        BboxQuery {
            bbox: self.bbox(),
            index: self.index,
            filter: self.filter.clone(),
        }
    }
}
