//! Geohash cluster index maintained incrementally over a transactional document store.
//!
//! Every point is folded into one cluster record per geohash prefix length, so
//! coarse map views can draw cluster markers (count + centroid) without reading
//! the underlying points.
//!
//! ```rust
//! use geocluster::{ClusterIndex, Config, Coordinate, MemoryStore};
//! use std::sync::Arc;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let index = ClusterIndex::new(Arc::new(MemoryStore::new()), &Config::with_geohash_precision(6))?;
//!
//! index.add_point(&Coordinate::new(0.0, 0.0), Some("a".into()), Default::default()).await?;
//! index.add_point(&Coordinate::new(0.0, 0.0001), Some("b".into()), Default::default()).await?;
//!
//! let top = index.clusters_at_level("", 1).await?;
//! assert_eq!(top[0].size, 2);
//! # Ok::<(), geocluster::ClusterError>(())
//! # }).unwrap();
//! ```

pub mod builder;
pub mod collection;
pub mod compute;
pub mod config;
pub mod error;
pub mod index;
pub mod storage;
pub mod types;

pub use builder::GeoCollectionBuilder;
pub use collection::{GeoCollection, ParsedDocument};
pub use config::{Config, FailurePolicy};
pub use error::{ClusterError, Result};
pub use index::{ClusterIndex, LevelOutcome, LevelReport, Operation, WalkReport};
pub use storage::{MemoryStore, Mutation, StoreStats, TransactionalStore};
pub use types::{ClusterNode, Coordinate, Document};

pub use geo::Point;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{ClusterError, ClusterIndex, Config, FailurePolicy, GeoCollectionBuilder, Result};

    pub use crate::{ClusterNode, Coordinate, Document};

    pub use crate::{MemoryStore, TransactionalStore};

    pub use crate::compute::geohash::{common_prefix_len, decode, encode, prefix};
}
