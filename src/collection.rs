//! Document-facing surface over the cluster index.
//!
//! A [`GeoCollection`] accepts whole JSON documents, pulls the coordinate out
//! of the configured field and either maintains the cluster hierarchy
//! (`with_clusters = true`) or writes one flat geotagged document per point.

use crate::compute::validation::coordinate_from_field;
use crate::config::Config;
use crate::error::{ClusterError, Result};
use crate::index::ClusterIndex;
use crate::storage::TransactionalStore;
use crate::types::{ClusterNode, Coordinate, Document, strip_reserved};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A point document after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub coordinate: Coordinate,
    pub point_id: Option<String>,
    pub fields: Document,
}

/// Collection of geotagged documents backed by a [`TransactionalStore`].
///
/// # Examples
///
/// ```rust
/// use geocluster::{GeoCollectionBuilder, MemoryStore};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
/// let places = GeoCollectionBuilder::new()
///     .precision(5)
///     .build(Arc::new(MemoryStore::new()))
///     .unwrap();
///
/// let key = places
///     .add(json!({"id": "louvre", "coordinates": {"lat": 48.8606, "lng": 2.3376}}))
///     .await
///     .unwrap();
/// assert_eq!(key.len(), 5);
///
/// places.delete(&key).await.unwrap();
/// assert_eq!(places.index().point_count().await.unwrap(), 0);
/// # });
/// ```
pub struct GeoCollection<S: TransactionalStore + ?Sized> {
    index: ClusterIndex<S>,
}

impl<S: TransactionalStore + ?Sized> Clone for GeoCollection<S> {
    fn clone(&self) -> Self {
        Self {
            index: self.index.clone(),
        }
    }
}

impl<S: TransactionalStore + ?Sized> GeoCollection<S> {
    pub fn new(store: Arc<S>, config: Config) -> Result<Self> {
        Ok(Self {
            index: ClusterIndex::new(store, &config)?,
        })
    }

    pub fn index(&self) -> &ClusterIndex<S> {
        &self.index
    }

    pub fn config(&self) -> &Config {
        self.index.config()
    }

    /// Key of the leaf a coordinate lands in.
    pub fn key_for(&self, coordinate: &Coordinate) -> Result<String> {
        self.index.key_for(coordinate)
    }

    /// Validate a document and extract its coordinate and identifier.
    ///
    /// The document must be a JSON object whose `custom_key` field holds a
    /// coordinate. The point identifier is its `id` field when that is a
    /// string or a number.
    pub fn parse(&self, document: Value) -> Result<ParsedDocument> {
        let Value::Object(fields) = document else {
            return Err(ClusterError::InvalidInput(
                "document must be an object".to_string(),
            ));
        };

        let coordinate = coordinate_from_field(&fields, &self.config().custom_key)?;
        let point_id = match fields.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };

        Ok(ParsedDocument {
            coordinate,
            point_id,
            fields,
        })
    }

    /// Add a document; returns the key it is stored under.
    ///
    /// Clustered collections return the full-precision geohash of the point's
    /// leaf; flat collections return a fresh UUID.
    pub async fn add(&self, document: Value) -> Result<String> {
        let parsed = self.parse(document)?;

        if !self.config().with_clusters {
            let key = Uuid::new_v4().to_string();
            let flat = self.flat_document(&parsed)?;
            self.index.store().set(&key, flat).await?;
            return Ok(key);
        }

        let key = self.index.key_for(&parsed.coordinate)?;
        self.index
            .add_point(&parsed.coordinate, parsed.point_id, parsed.fields)
            .await?
            .into_result()?;
        Ok(key)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.delete_with(key, &mut |_| {}).await
    }

    /// Delete the document at `key`; clustered collections report every
    /// surviving ancestor cluster to `on_update`.
    pub async fn delete_with(
        &self,
        key: &str,
        on_update: &mut (dyn FnMut(&ClusterNode) + Send),
    ) -> Result<()> {
        if !self.config().with_clusters {
            if !self.index.store().delete(key).await? {
                return Err(ClusterError::PointNotFound(key.to_string()));
            }
            return Ok(());
        }

        self.index
            .delete_point_with(key, on_update)
            .await?
            .into_result()?;
        Ok(())
    }

    /// Replace the document at `key` with `document`; returns its new key.
    pub async fn update(&self, key: &str, document: Value) -> Result<String> {
        let parsed = self.parse(document)?;

        if !self.config().with_clusters {
            if self.index.store().get(key).await?.is_none() {
                return Err(ClusterError::PointNotFound(key.to_string()));
            }
            let flat = self.flat_document(&parsed)?;
            self.index.store().set(key, flat).await?;
            return Ok(key.to_string());
        }

        let new_key = self.index.key_for(&parsed.coordinate)?;
        self.index
            .move_point(key, &parsed.coordinate, parsed.point_id, parsed.fields)
            .await?
            .into_result()?;
        Ok(new_key)
    }

    /// Raw document stored at `key`.
    pub async fn get(&self, key: &str) -> Result<Option<Document>> {
        self.index.store().get(key).await
    }

    fn flat_document(&self, parsed: &ParsedDocument) -> Result<Document> {
        let mut flat = strip_reserved(parsed.fields.clone());
        flat.insert(
            "g".to_string(),
            Value::String(self.index.key_for(&parsed.coordinate)?),
        );
        flat.insert("l".to_string(), serde_json::to_value(parsed.coordinate)?);
        Ok(flat)
    }
}
