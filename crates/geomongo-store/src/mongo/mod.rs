//! MongoDB storage adapter implementation

pub mod config;
pub mod convert;
pub mod filter;

pub use config::{ConfigError, MongoConfig};
pub use convert::document_to_json;
pub use filter::geo_filter;

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use geomongo_core::error::{GeomongoError, Result};
use geomongo_core::models::{BboxQuery, Feature, GeometryKind, GEOMETRY_FIELD};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::ports::{FeatureStore, SpatialQuery, StoreConnector};

/// Server error code for creating a collection that already exists
const NAMESPACE_EXISTS: i32 = 48;

fn is_namespace_exists(err: &MongoError) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS)
}

fn store_error(operation: &str, err: MongoError) -> GeomongoError {
    GeomongoError::Store {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

/// Opens MongoDB connections for a configured server and database
#[derive(Debug, Clone)]
pub struct MongoConnector {
    config: MongoConfig,
}

impl MongoConnector {
    /// Create a connector with the given configuration
    pub fn new(config: MongoConfig) -> Result<Self> {
        config.validate().map_err(|e| match e {
            ConfigError::Missing(key) => GeomongoError::ConfigMissing { key },
            ConfigError::Invalid { key, reason } => GeomongoError::ConfigInvalid { key, reason },
        })?;
        Ok(Self { config })
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Driver options for the configured URI.
    ///
    /// Timeouts given in the URI win over the configured defaults.
    pub async fn client_options(&self) -> Result<ClientOptions> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|e| self.connection_error(e))?;
        options.app_name = Some(self.config.app_name.clone());
        options.connect_timeout.get_or_insert(self.config.connect_timeout);
        options
            .server_selection_timeout
            .get_or_insert(self.config.server_selection_timeout);
        Ok(options)
    }

    fn connection_error(&self, err: MongoError) -> GeomongoError {
        GeomongoError::Connection {
            uri: self.config.uri.clone(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    type Store = MongoStore;

    async fn connect(&self) -> Result<MongoStore> {
        let options = self.client_options().await?;
        let client = Client::with_options(options).map_err(|e| self.connection_error(e))?;
        let database = client.database(&self.config.database);

        // The driver connects lazily; ping so an unreachable server fails here
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| self.connection_error(e))?;

        tracing::debug!(uri = %self.config.uri, database = %self.config.database, "Connected to MongoDB");

        Ok(MongoStore { client, database })
    }
}

/// One MongoDB connection bound to a database
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Get a reference to the database
    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl FeatureStore for MongoStore {
    type Collection = Collection<Document>;

    async fn ensure_collection(&self, name: &str) -> Result<Collection<Document>> {
        match self.database.create_collection(name).await {
            Ok(()) => tracing::debug!(collection = name, "Created collection"),
            Err(e) if is_namespace_exists(&e) => {
                tracing::debug!(collection = name, "Collection already exists")
            }
            Err(e) => return Err(store_error("createCollection", e)),
        }
        Ok(self.database.collection::<Document>(name))
    }

    async fn ensure_geo_index(&self, collection: &Collection<Document>) -> Result<()> {
        // Creating an identical index again is a no-op on the server
        let index = IndexModel::builder()
            .keys(doc! { GEOMETRY_FIELD: "2dsphere" })
            .build();
        collection
            .create_index(index)
            .await
            .map_err(|e| store_error("createIndex", e))?;
        Ok(())
    }

    async fn insert_feature(
        &self,
        collection: &Collection<Document>,
        feature: &Feature,
    ) -> Result<()> {
        let json = feature.to_document()?;
        let document =
            bson::to_document(&json).map_err(|e| GeomongoError::Serialization(e.to_string()))?;

        collection
            .insert_one(document)
            .await
            .map_err(|e| GeomongoError::Insert {
                collection: collection.name().to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.client.shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl SpatialQuery for MongoStore {
    async fn collection(&self, name: &str) -> Result<Collection<Document>> {
        Ok(self.database.collection::<Document>(name))
    }

    async fn features_in(
        &self,
        collection: &Collection<Document>,
        query: &BboxQuery,
    ) -> Result<Vec<Feature>> {
        let filter = geo_filter(query)?;
        tracing::debug!(collection = collection.name(), %filter, "Querying features");

        let mut cursor = collection
            .find(filter)
            .await
            .map_err(|e| store_error("find", e))?;

        let mut features = Vec::new();
        while let Some(document) = cursor.try_next().await.map_err(|e| store_error("find", e))? {
            let id = features.len() as u64 + 1;
            if let Some(feature) = Feature::from_document(id, &document_to_json(&document)) {
                features.push(feature);
            }
        }

        Ok(features)
    }

    async fn geometry_kind(&self, collection: &Collection<Document>) -> Result<Option<GeometryKind>> {
        let document = collection
            .find_one(doc! { GEOMETRY_FIELD: { "$exists": true } })
            .await
            .map_err(|e| store_error("findOne", e))?;

        let kind = document.as_ref().and_then(|document| {
            document
                .get_document(GEOMETRY_FIELD)
                .ok()
                .and_then(|geometry| geometry.get_str("type").ok())
                .and_then(GeometryKind::from_geojson_type)
        });
        Ok(kind)
    }
}
