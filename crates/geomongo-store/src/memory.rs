//! In-memory storage implementation for development and testing.
//!
//! This implementation uses `RwLock::unwrap()` intentionally. Lock poisoning
//! only occurs when another thread panicked while holding the lock, which is
//! an unrecoverable state. For production workloads, use the MongoDB backend.
//!
//! Collections keep documents in insertion order. Unique indexes reject
//! duplicate values and a 2dsphere index rejects geometries it cannot read,
//! mirroring the server's behavior for the cases the importer cares about.

use async_trait::async_trait;
use geo::{Contains, Intersects};
use geojson::{JsonObject, JsonValue};
use geomongo_core::error::{GeomongoError, Result};
use geomongo_core::models::{BboxQuery, Feature, GeoIndexKind, GeometryKind, GEOMETRY_FIELD};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::ports::{FeatureStore, SpatialQuery, StoreConnector};

/// Kind of a collection index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Sphere2d,
    Unique,
}

/// Index definition on one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: String,
    pub kind: IndexKind,
}

#[derive(Debug, Clone, Default)]
struct CollectionState {
    documents: Vec<JsonObject>,
    indexes: Vec<IndexSpec>,
}

/// Shared in-memory database; also the connector handing out connections
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<RwLock<HashMap<String, CollectionState>>>,
    open_connections: Arc<AtomicUsize>,
    connections_opened: Arc<AtomicUsize>,
    refuse_connections: Arc<AtomicBool>,
}

impl MemoryDatabase {
    /// Create a new empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `connect` fail
    pub fn refuse_connections(&self) {
        self.refuse_connections.store(true, Ordering::SeqCst);
    }

    /// Add a unique index, creating the collection if needed
    pub fn create_unique_index(&self, collection: &str, field: &str) {
        let mut collections = self.collections.write().unwrap();
        let state = collections.entry(collection.to_string()).or_default();
        let spec = IndexSpec {
            field: field.to_string(),
            kind: IndexKind::Unique,
        };
        if !state.indexes.contains(&spec) {
            state.indexes.push(spec);
        }
    }

    /// Names of all collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// Documents of a collection in insertion order
    pub fn documents(&self, collection: &str) -> Vec<JsonObject> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|state| state.documents.clone())
            .unwrap_or_default()
    }

    /// Indexes of a collection
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map(|state| state.indexes.clone())
            .unwrap_or_default()
    }

    /// Connections opened and not yet closed
    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::SeqCst)
    }

    /// Connections opened since creation
    pub fn connections_opened(&self) -> usize {
        self.connections_opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MemoryDatabase {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore> {
        if self.refuse_connections.load(Ordering::SeqCst) {
            return Err(GeomongoError::Connection {
                uri: "memory://".to_string(),
                message: "connection refused".to_string(),
            });
        }

        self.open_connections.fetch_add(1, Ordering::SeqCst);
        self.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryStore {
            database: self.clone(),
        })
    }
}

/// One connection to a `MemoryDatabase`
#[derive(Debug)]
pub struct MemoryStore {
    database: MemoryDatabase,
}

/// Handle to an in-memory collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCollection {
    name: String,
}

impl MemoryCollection {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Follow a dotted path through nested objects
fn lookup<'a>(document: &'a JsonObject, path: &str) -> Option<&'a JsonValue> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Every position in a coordinates array needs at least x and y
fn positions_ok(coordinates: &JsonValue) -> bool {
    match coordinates {
        JsonValue::Array(items) if items.iter().all(JsonValue::is_number) => items.len() >= 2,
        JsonValue::Array(items) => items.iter().all(positions_ok),
        _ => false,
    }
}

fn to_geo(geometry: &JsonValue) -> Option<geo::Geometry<f64>> {
    if let Some(coordinates) = geometry.get("coordinates") {
        if !positions_ok(coordinates) {
            return None;
        }
    }
    let geometry = geojson::Geometry::from_json_value(geometry.clone()).ok()?;
    geo::Geometry::<f64>::try_from(geometry).ok()
}

fn check_insert(name: &str, state: &CollectionState, document: &JsonObject) -> Result<()> {
    for index in &state.indexes {
        let value = match lookup(document, &index.field) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };

        match index.kind {
            IndexKind::Unique => {
                let duplicate = state
                    .documents
                    .iter()
                    .any(|existing| lookup(existing, &index.field) == Some(value));
                if duplicate {
                    return Err(GeomongoError::Insert {
                        collection: name.to_string(),
                        message: format!(
                            "E11000 duplicate key error index: {}_1 dup key: {{ {}: {} }}",
                            index.field, index.field, value
                        ),
                    });
                }
            }
            IndexKind::Sphere2d => {
                if to_geo(value).is_none() {
                    return Err(GeomongoError::Insert {
                        collection: name.to_string(),
                        message: format!("Can't extract geo keys from {}", value),
                    });
                }
            }
        }
    }
    Ok(())
}

fn matches_query(document: &JsonObject, query: &BboxQuery) -> bool {
    if let Some(filter) = &query.filter {
        let all_equal = filter
            .iter()
            .all(|(path, expected)| lookup(document, path) == Some(expected));
        if !all_equal {
            return false;
        }
    }

    let geometry = match document.get(GEOMETRY_FIELD).and_then(to_geo) {
        Some(geometry) => geometry,
        None => return false,
    };

    let bbox = &query.bbox;
    let rect = geo::Rect::new(
        geo::coord! { x: bbox.minx, y: bbox.miny },
        geo::coord! { x: bbox.maxx, y: bbox.maxy },
    )
    .to_polygon();

    match query.index {
        GeoIndexKind::Sphere2d => geometry.intersects(&rect),
        GeoIndexKind::Flat2d => rect.contains(&geometry),
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    type Collection = MemoryCollection;

    async fn ensure_collection(&self, name: &str) -> Result<MemoryCollection> {
        let mut collections = self.database.collections.write().unwrap();
        collections.entry(name.to_string()).or_default();
        Ok(MemoryCollection {
            name: name.to_string(),
        })
    }

    async fn ensure_geo_index(&self, collection: &MemoryCollection) -> Result<()> {
        let mut collections = self.database.collections.write().unwrap();
        let state = collections
            .get_mut(&collection.name)
            .ok_or_else(|| GeomongoError::CollectionNotFound {
                name: collection.name.clone(),
            })?;

        let spec = IndexSpec {
            field: GEOMETRY_FIELD.to_string(),
            kind: IndexKind::Sphere2d,
        };
        if !state.indexes.contains(&spec) {
            state.indexes.push(spec);
        }
        Ok(())
    }

    async fn insert_feature(&self, collection: &MemoryCollection, feature: &Feature) -> Result<()> {
        let document = feature.to_document()?;

        let mut collections = self.database.collections.write().unwrap();
        let state = collections
            .get_mut(&collection.name)
            .ok_or_else(|| GeomongoError::CollectionNotFound {
                name: collection.name.clone(),
            })?;

        check_insert(&collection.name, state, &document)?;
        state.documents.push(document);
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.database.open_connections.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SpatialQuery for MemoryStore {
    async fn collection(&self, name: &str) -> Result<MemoryCollection> {
        if !self.database.collections.read().unwrap().contains_key(name) {
            return Err(GeomongoError::CollectionNotFound {
                name: name.to_string(),
            });
        }
        Ok(MemoryCollection {
            name: name.to_string(),
        })
    }

    async fn features_in(
        &self,
        collection: &MemoryCollection,
        query: &BboxQuery,
    ) -> Result<Vec<Feature>> {
        query.bbox.check_single_hemisphere()?;
        query.check_filter()?;

        let documents = self.database.documents(&collection.name);
        let features = documents
            .iter()
            .filter(|document| matches_query(document, query))
            .filter_map(|document| Feature::from_document(0, document))
            .enumerate()
            .map(|(index, mut feature)| {
                feature.id = index as u64 + 1;
                feature
            })
            .collect();

        Ok(features)
    }

    async fn geometry_kind(&self, collection: &MemoryCollection) -> Result<Option<GeometryKind>> {
        let documents = self.database.documents(&collection.name);
        let kind = documents
            .iter()
            .find_map(|document| document.get(GEOMETRY_FIELD))
            .and_then(|geometry| geometry.get("type"))
            .and_then(JsonValue::as_str)
            .and_then(GeometryKind::from_geojson_type);
        Ok(kind)
    }
}
