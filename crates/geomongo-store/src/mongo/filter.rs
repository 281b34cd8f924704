//! Spatial filter documents for bounding box queries

use bson::{doc, Document};
use geomongo_core::error::{GeomongoError, Result};
use geomongo_core::models::{BboxQuery, GeoIndexKind, GEOMETRY_FIELD};

/// Build the `find` filter for a bounding box query.
///
/// A 2dsphere index is queried with `$geoIntersects` against the box polygon;
/// a flat 2d index with `$geoWithin`/`$box` on the raw coordinates. Extra
/// conditions of the query are appended to the same document and may not
/// name the geometry field.
pub fn geo_filter(query: &BboxQuery) -> Result<Document> {
    let bbox = &query.bbox;
    bbox.check_single_hemisphere()?;
    query.check_filter()?;

    let mut filter = Document::new();
    match query.index {
        GeoIndexKind::Flat2d => {
            filter.insert(
                format!("{}.coordinates", GEOMETRY_FIELD),
                doc! {
                    "$geoWithin": {
                        "$box": [[bbox.minx, bbox.miny], [bbox.maxx, bbox.maxy]]
                    }
                },
            );
        }
        GeoIndexKind::Sphere2d => {
            let ring: Vec<Vec<f64>> = bbox.exterior_ring().iter().map(|p| p.to_vec()).collect();
            filter.insert(
                GEOMETRY_FIELD,
                doc! {
                    "$geoIntersects": {
                        "$geometry": {
                            "type": "Polygon",
                            "coordinates": [ring]
                        }
                    }
                },
            );
        }
    }

    if let Some(extra) = &query.filter {
        let extra = bson::to_document(extra).map_err(|e| {
            GeomongoError::InvalidQuery(format!("Invalid extra filter: {}", e))
        })?;
        for (key, value) in extra {
            filter.insert(key, value);
        }
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::Bson;
    use geomongo_core::models::Bbox;
    use serde_json::json;

    #[test]
    fn test_sphere_filter_uses_box_polygon() {
        let query = BboxQuery::new(Bbox::new(10.0, 20.0, 30.0, 40.0));
        let filter = geo_filter(&query).unwrap();

        let geometry = filter
            .get_document("geometry")
            .unwrap()
            .get_document("$geoIntersects")
            .unwrap()
            .get_document("$geometry")
            .unwrap();
        assert_eq!(geometry.get_str("type").unwrap(), "Polygon");

        let rings = geometry.get_array("coordinates").unwrap();
        assert_eq!(rings.len(), 1);
        let ring = rings[0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(
            ring[2],
            Bson::Array(vec![Bson::Double(30.0), Bson::Double(40.0)])
        );
    }

    #[test]
    fn test_flat_filter_uses_box() {
        let query =
            BboxQuery::new(Bbox::new(1.0, 2.0, 3.0, 4.0)).with_index(GeoIndexKind::Flat2d);
        let filter = geo_filter(&query).unwrap();

        assert_eq!(
            filter,
            doc! {
                "geometry.coordinates": {
                    "$geoWithin": { "$box": [[1.0, 2.0], [3.0, 4.0]] }
                }
            }
        );
    }

    #[test]
    fn test_extra_filter_is_concatenated() {
        let extra = json!({"properties.kind": "cafe", "properties.rank": {"$gte": 3}});
        let query = BboxQuery::new(Bbox::new(0.0, 0.0, 1.0, 1.0))
            .with_filter(extra.as_object().unwrap().clone());
        let filter = geo_filter(&query).unwrap();

        assert!(filter.contains_key("geometry"));
        assert_eq!(filter.get_str("properties.kind").unwrap(), "cafe");
        assert!(filter.get_document("properties.rank").is_ok());
    }

    #[test]
    fn test_extra_filter_cannot_replace_spatial_clause() {
        for extra in [
            json!({"geometry": {"$exists": true}}),
            json!({"geometry.coordinates": [5.0, 5.0]}),
        ] {
            let query = BboxQuery::new(Bbox::new(0.0, 0.0, 1.0, 1.0))
                .with_filter(extra.as_object().unwrap().clone());
            assert!(matches!(
                geo_filter(&query),
                Err(GeomongoError::InvalidQuery(_))
            ));
        }
    }

    #[test]
    fn test_more_than_a_hemisphere_is_rejected() {
        let query = BboxQuery::new(Bbox::new(-100.0, 0.0, 100.0, 10.0));
        assert!(matches!(
            geo_filter(&query),
            Err(GeomongoError::InvalidQuery(_))
        ));
    }
}
