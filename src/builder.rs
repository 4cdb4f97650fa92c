//! Builder for document collections
//!
//! Collects configuration step by step and validates it once in `build`.

use crate::collection::GeoCollection;
use crate::config::{Config, FailurePolicy};
use crate::error::{ClusterError, Result};
use crate::storage::TransactionalStore;
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`GeoCollection`] with custom precision, coordinate field and
/// failure handling.
#[derive(Debug, Clone, Default)]
pub struct GeoCollectionBuilder {
    config: Config,
}

impl GeoCollectionBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Finest precision level P (validated in `build`).
    pub fn precision(mut self, precision: usize) -> Self {
        self.config.geohash_precision = precision;
        self
    }

    /// Document field holding the coordinate.
    pub fn custom_key(mut self, key: impl Into<String>) -> Self {
        self.config.custom_key = key.into();
        self
    }

    pub fn with_clusters(mut self, enabled: bool) -> Self {
        self.config.with_clusters = enabled;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.config = self.config.with_retry_backoff(backoff);
        self
    }

    /// Build the collection over `store`.
    pub fn build<S: TransactionalStore + ?Sized>(self, store: Arc<S>) -> Result<GeoCollection<S>> {
        self.config.validate().map_err(ClusterError::Config)?;
        GeoCollection::new(store, self.config)
    }
}
