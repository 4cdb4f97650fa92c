//! Validation for geographic coordinates, geohash keys and source payloads.

use crate::error::{ClusterError, Result};
use crate::types::Coordinate;
use serde_json::Value;

const GEOHASH_ALPHABET: &str = "0123456789bcdefghjkmnpqrstuvwxyz";

/// Validates a coordinate has finite latitude in [-90, 90] and longitude in [-180, 180].
///
/// # Examples
///
/// ```
/// use geocluster::compute::validation::validate_coordinate;
/// use geocluster::Coordinate;
///
/// assert!(validate_coordinate(&Coordinate::new(40.7128, -74.0060)).is_ok());
/// assert!(validate_coordinate(&Coordinate::new(95.0, -74.0)).is_err());
/// assert!(validate_coordinate(&Coordinate::new(40.0, 200.0)).is_err());
/// ```
pub fn validate_coordinate(coordinate: &Coordinate) -> Result<()> {
    let Coordinate { lat, lng } = *coordinate;

    if !lat.is_finite() || !lng.is_finite() {
        return Err(ClusterError::InvalidCoordinate { lat, lng });
    }

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ClusterError::InvalidCoordinate { lat, lng });
    }

    Ok(())
}

/// Validates a geohash key: non-empty, at most `max_len` characters, base-32 alphabet only.
pub fn validate_geohash(hash: &str, max_len: usize) -> Result<()> {
    if hash.is_empty() {
        return Err(ClusterError::InvalidGeohash("empty geohash".to_string()));
    }

    if hash.len() > max_len {
        return Err(ClusterError::InvalidGeohash(format!(
            "'{}' is longer than {} characters",
            hash, max_len
        )));
    }

    if let Some(bad) = hash.chars().find(|c| !GEOHASH_ALPHABET.contains(*c)) {
        return Err(ClusterError::InvalidGeohash(format!(
            "'{}' contains invalid character '{}'",
            hash, bad
        )));
    }

    Ok(())
}

/// Extracts and validates the coordinate stored under `field` of a document.
pub fn coordinate_from_field(document: &serde_json::Map<String, Value>, field: &str) -> Result<Coordinate> {
    let value = document
        .get(field)
        .ok_or_else(|| ClusterError::InvalidInput(format!("document has no '{}' field", field)))?;

    let coordinate: Coordinate = serde_json::from_value(value.clone()).map_err(|e| {
        ClusterError::InvalidInput(format!("field '{}' is not a coordinate: {}", field, e))
    })?;

    validate_coordinate(&coordinate)?;
    Ok(coordinate)
}
