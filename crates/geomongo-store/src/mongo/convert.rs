//! BSON to JSON conversion for documents read back from a collection

use bson::{Bson, Document};
use geojson::{JsonObject, JsonValue};

/// Convert a stored document to JSON, dropping values without a JSON form
pub fn document_to_json(document: &Document) -> JsonObject {
    document
        .iter()
        .filter_map(|(key, value)| bson_to_json(value).map(|value| (key.clone(), value)))
        .collect()
}

/// Dates become epoch milliseconds and decimals their string form.
/// Object ids, binaries, regexes and the like have no attribute value.
fn bson_to_json(value: &Bson) -> Option<JsonValue> {
    match value {
        Bson::Boolean(b) => Some(JsonValue::Bool(*b)),
        Bson::DateTime(dt) => Some(JsonValue::from(dt.timestamp_millis())),
        Bson::Decimal128(d) => Some(JsonValue::String(d.to_string())),
        Bson::Double(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Bson::Int32(i) => Some(JsonValue::from(*i)),
        Bson::Int64(i) => Some(JsonValue::from(*i)),
        Bson::String(s) => Some(JsonValue::String(s.clone())),
        Bson::Document(nested) => Some(JsonValue::Object(document_to_json(nested))),
        Bson::Array(items) => Some(JsonValue::Array(
            items.iter().filter_map(bson_to_json).collect(),
        )),
        Bson::Null => Some(JsonValue::Null),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use bson::{doc, DateTime};
    use geomongo_core::models::Feature;
    use serde_json::json;

    #[test]
    fn test_scalar_conversions() {
        let document = doc! {
            "_id": ObjectId::new(),
            "name": "Alexanderplatz",
            "open": true,
            "rank": 3_i32,
            "visitors": 1_000_000_i64,
            "height": 12.5,
            "updated": DateTime::from_millis(1_600_000_000_000),
            "nothing": Bson::Null,
        };

        let json = document_to_json(&document);

        assert!(!json.contains_key("_id"));
        assert_eq!(json["name"], json!("Alexanderplatz"));
        assert_eq!(json["open"], json!(true));
        assert_eq!(json["rank"], json!(3));
        assert_eq!(json["visitors"], json!(1_000_000));
        assert_eq!(json["height"], json!(12.5));
        assert_eq!(json["updated"], json!(1_600_000_000_000_i64));
        assert_eq!(json["nothing"], JsonValue::Null);
    }

    #[test]
    fn test_stored_feature_reads_back() {
        let document = doc! {
            "_id": ObjectId::new(),
            "type": "Feature",
            "id": 1_i64,
            "geometry": {
                "type": "Point",
                "coordinates": [13.4, 52.5]
            },
            "properties": {
                "name": "Berlin",
                "address": { "city": "Berlin", "zip": "10178" }
            }
        };

        let json = document_to_json(&document);
        let feature = Feature::from_document(1, &json).unwrap();

        assert!(feature.geometry.is_some());
        assert_eq!(feature.properties["name"], json!("Berlin"));
        assert_eq!(feature.properties["zip"], json!("10178"));
        assert!(!feature.properties.contains_key("_id"));
    }
}
