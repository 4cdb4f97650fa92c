//! Compute layer: pure, synchronous building blocks of the cluster walk.
//!
//! - Geohash encoding and prefix handling
//! - Incremental centroid arithmetic
//! - Coordinate and key validation
//!
//! Nothing in here touches the store.

pub mod centroid;
pub mod geohash;
pub mod validation;
