//! Features and their document form.
//!
//! A feature is stored as a GeoJSON Feature object. Reading a document back
//! flattens every non-geometry field into the property map, the way the
//! map renderer expects attributes.

use geojson::{Geometry, JsonObject, JsonValue};

use crate::error::Result;

/// Name of the document field holding the GeoJSON geometry
pub const GEOMETRY_FIELD: &str = "geometry";

/// One geometry + attributes record
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: u64,
    pub geometry: Option<Geometry>,
    pub properties: JsonObject,
}

impl Feature {
    pub fn new(id: u64, geometry: Option<Geometry>) -> Self {
        Self {
            id,
            geometry,
            properties: JsonObject::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Convert to the document inserted into a collection
    pub fn to_document(&self) -> Result<JsonObject> {
        let geometry = match &self.geometry {
            Some(geometry) => serde_json::to_value(geometry)?,
            None => JsonValue::Null,
        };

        let mut document = JsonObject::new();
        document.insert("type".to_string(), JsonValue::from("Feature"));
        document.insert("id".to_string(), JsonValue::from(self.id));
        document.insert(GEOMETRY_FIELD.to_string(), geometry);
        document.insert(
            "properties".to_string(),
            JsonValue::Object(self.properties.clone()),
        );
        Ok(document)
    }

    /// Rebuild a feature from a stored document.
    ///
    /// Returns `None` when the geometry field is missing or not an object.
    pub fn from_document(id: u64, document: &JsonObject) -> Option<Self> {
        let geometry = match document.get(GEOMETRY_FIELD) {
            Some(JsonValue::Object(object)) => object,
            _ => return None,
        };

        let geometry = match Geometry::from_json_object(geometry.clone()) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                tracing::warn!(feature_id = id, "Failed to read geometry: {}", e);
                None
            }
        };

        let mut properties = JsonObject::new();
        read_properties(document, &mut properties);

        Some(Self {
            id,
            geometry,
            properties,
        })
    }
}

impl From<Feature> for geojson::Feature {
    fn from(feature: Feature) -> Self {
        geojson::Feature {
            bbox: None,
            geometry: feature.geometry,
            id: Some(geojson::feature::Id::Number(feature.id.into())),
            properties: Some(feature.properties),
            foreign_members: None,
        }
    }
}

/// Copy scalar fields into `properties`, descending into nested objects.
///
/// Nested objects that carry `coordinates` are geometries and are skipped,
/// as are arrays and nulls.
fn read_properties(document: &JsonObject, properties: &mut JsonObject) {
    for (key, value) in document {
        if key == GEOMETRY_FIELD {
            continue;
        }
        match value {
            JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
                properties.insert(key.clone(), value.clone());
            }
            JsonValue::Object(nested) => {
                if !nested.contains_key("coordinates") {
                    read_properties(nested, properties);
                }
            }
            JsonValue::Array(_) | JsonValue::Null => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value;
    use serde_json::json;

    fn object(value: JsonValue) -> JsonObject {
        match value {
            JsonValue::Object(object) => object,
            other => panic!("expected object, got {}", other),
        }
    }

    #[test]
    fn test_document_is_geojson_feature() {
        let feature = Feature::new(7, Some(Geometry::new(Value::Point(vec![13.4, 52.5]))))
            .with_property("name", "Berlin");

        let document = feature.to_document().unwrap();

        assert_eq!(document["type"], json!("Feature"));
        assert_eq!(document["id"], json!(7));
        assert_eq!(
            document[GEOMETRY_FIELD],
            json!({"type": "Point", "coordinates": [13.4, 52.5]})
        );
        assert_eq!(document["properties"], json!({"name": "Berlin"}));
    }

    #[test]
    fn test_into_geojson_feature() {
        let feature = Feature::new(3, Some(Geometry::new(Value::Point(vec![1.0, 2.0]))))
            .with_property("name", "a");
        let geojson: geojson::Feature = feature.into();

        assert_eq!(geojson.id, Some(geojson::feature::Id::Number(3.into())));
        assert_eq!(geojson.property("name"), Some(&json!("a")));
        assert!(geojson.geometry.is_some());
    }

    #[test]
    fn test_null_geometry_document() {
        let document = Feature::new(1, None).to_document().unwrap();
        assert_eq!(document[GEOMETRY_FIELD], JsonValue::Null);
    }

    #[test]
    fn test_from_document_flattens_properties() {
        let document = object(json!({
            "type": "Feature",
            "id": 3,
            "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]},
            "properties": {
                "name": "A1",
                "lanes": 2,
                "meta": {"surface": "asphalt", "tags": ["a", "b"]},
                "centroid": {"type": "Point", "coordinates": [0.5, 0.5]},
                "note": null
            }
        }));

        let feature = Feature::from_document(1, &document).unwrap();

        assert_eq!(feature.id, 1);
        assert!(matches!(
            feature.geometry.as_ref().map(|g| &g.value),
            Some(Value::LineString(_))
        ));
        assert_eq!(feature.properties["name"], json!("A1"));
        assert_eq!(feature.properties["lanes"], json!(2));
        assert_eq!(feature.properties["surface"], json!("asphalt"));
        assert_eq!(feature.properties["type"], json!("Feature"));
        assert!(!feature.properties.contains_key("tags"));
        assert!(!feature.properties.contains_key("coordinates"));
        assert!(!feature.properties.contains_key("note"));
        assert!(!feature.properties.contains_key(GEOMETRY_FIELD));
    }

    #[test]
    fn test_from_document_requires_geometry_object() {
        let missing = object(json!({"properties": {"name": "x"}}));
        assert!(Feature::from_document(1, &missing).is_none());

        let null = object(json!({"geometry": null}));
        assert!(Feature::from_document(1, &null).is_none());
    }

    #[test]
    fn test_from_document_keeps_feature_with_unreadable_geometry() {
        let document = object(json!({"geometry": {"type": "Blob"}, "name": "x"}));
        let feature = Feature::from_document(4, &document).unwrap();
        assert!(feature.geometry.is_none());
        assert_eq!(feature.properties["name"], json!("x"));
    }
}
