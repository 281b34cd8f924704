use async_trait::async_trait;
use geomongo_core::error::Result;
use geomongo_core::models::{BboxQuery, Feature, GeometryKind, PointQuery};

/// Port for opening database connections
///
/// The importer opens one connection per dataset.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: FeatureStore;

    /// Open a new connection
    async fn connect(&self) -> Result<Self::Store>;
}

/// Port for writing features into collections
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Adapter specific collection handle
    type Collection: Send + Sync;

    /// Create the collection unless it already exists
    async fn ensure_collection(&self, name: &str) -> Result<Self::Collection>;

    /// Create the 2dsphere index on the geometry field; a no-op when present
    async fn ensure_geo_index(&self, collection: &Self::Collection) -> Result<()>;

    /// Insert one feature as one document
    async fn insert_feature(&self, collection: &Self::Collection, feature: &Feature) -> Result<()>;

    /// Close the connection
    async fn close(self) -> Result<()>;
}

/// Port for reading features back by location
#[async_trait]
pub trait SpatialQuery: FeatureStore {
    /// Handle to an existing collection
    async fn collection(&self, name: &str) -> Result<Self::Collection>;

    /// Features whose geometry matches the bounding box query
    async fn features_in(
        &self,
        collection: &Self::Collection,
        query: &BboxQuery,
    ) -> Result<Vec<Feature>>;

    /// Features within `tolerance` of a point
    async fn features_at_point(
        &self,
        collection: &Self::Collection,
        query: &PointQuery,
    ) -> Result<Vec<Feature>> {
        self.features_in(collection, &query.to_bbox_query()).await
    }

    /// Geometry type of the first document that has a geometry
    async fn geometry_kind(&self, collection: &Self::Collection) -> Result<Option<GeometryKind>>;
}
