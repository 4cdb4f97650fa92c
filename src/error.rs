//! Error types for the cluster index.

use thiserror::Error;

/// Errors produced by the geohash encoder, the cluster walk and the stores.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// Payload or argument is malformed (not an object, missing coordinate, bad precision)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Latitude/longitude outside [-90, 90] x [-180, 180] or not finite
    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Invalid geohash: {0}")]
    InvalidGeohash(String),

    /// A delete or move walk reached a level with no cluster node
    #[error("Point not found: {0}")]
    PointNotFound(String),

    /// The store gave up committing a transaction on `key`
    #[error("Transaction conflict on '{key}' after {attempts} attempt(s)")]
    TransactionConflict { key: String, attempts: u32 },

    /// Backend failure reported by the store
    #[error("Store error: {0}")]
    Store(String),

    /// A persisted record does not satisfy the cluster node schema
    #[error("Corrupt cluster node '{key}': {reason}")]
    CorruptNode { key: String, reason: String },

    /// Some levels of a walk committed and at least one did not
    #[error("{operation} partially applied, failed levels: {failed_levels:?}")]
    PartialApplication {
        operation: String,
        failed_levels: Vec<usize>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for cluster index operations.
pub type Result<T> = std::result::Result<T, ClusterError>;

impl ClusterError {
    /// Whether retrying the same transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClusterError::TransactionConflict { .. } | ClusterError::Store(_)
        )
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::PointNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let conflict = ClusterError::TransactionConflict {
            key: "u4pr".into(),
            attempts: 5,
        };
        assert!(conflict.is_retryable());
        assert!(ClusterError::Store("timeout".into()).is_retryable());
        assert!(!ClusterError::PointNotFound("u4pr".into()).is_retryable());
        assert!(!ClusterError::InvalidInput("x".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ClusterError::PartialApplication {
            operation: "add_point".into(),
            failed_levels: vec![3, 4],
        };
        assert_eq!(
            err.to_string(),
            "add_point partially applied, failed levels: [3, 4]"
        );
        assert!(ClusterError::PointNotFound("s0".into()).is_not_found());
    }
}
