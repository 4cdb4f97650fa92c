//! Geohash encoding and prefix handling.
//!
//! Keys of the cluster hierarchy are prefixes of the full-precision geohash of
//! a point: the key of level `n - 1` is always a prefix of the key of level `n`.

use super::validation::{validate_coordinate, validate_geohash};
use crate::config::MAX_GEOHASH_PRECISION;
use crate::error::{ClusterError, Result};
use crate::types::Coordinate;

fn check_precision(precision: usize) -> Result<()> {
    if !(1..=MAX_GEOHASH_PRECISION).contains(&precision) {
        return Err(ClusterError::InvalidInput(format!(
            "geohash precision must be between 1 and {}, got {}",
            MAX_GEOHASH_PRECISION, precision
        )));
    }
    Ok(())
}

/// Encodes a coordinate into a geohash of exactly `precision` characters.
///
/// # Examples
///
/// ```
/// use geocluster::compute::geohash::encode;
/// use geocluster::Coordinate;
///
/// let hash = encode(&Coordinate::new(57.64911, 10.40744), 11).unwrap();
/// assert_eq!(hash, "u4pruydqqvj");
/// ```
pub fn encode(coordinate: &Coordinate, precision: usize) -> Result<String> {
    check_precision(precision)?;
    validate_coordinate(coordinate)?;

    let coord = ::geohash::Coord {
        x: coordinate.lng,
        y: coordinate.lat,
    };
    ::geohash::encode(coord, precision).map_err(|_| ClusterError::InvalidCoordinate {
        lat: coordinate.lat,
        lng: coordinate.lng,
    })
}

/// Decodes a geohash to the center of its cell.
pub fn decode(hash: &str) -> Result<Coordinate> {
    validate_geohash(hash, MAX_GEOHASH_PRECISION)?;
    let (center, _, _) =
        ::geohash::decode(hash).map_err(|e| ClusterError::InvalidGeohash(e.to_string()))?;
    Ok(Coordinate::new(center.y, center.x))
}

/// Returns the first `level` characters of `hash`.
pub fn prefix(hash: &str, level: usize) -> Result<&str> {
    if level == 0 || level > hash.len() {
        return Err(ClusterError::InvalidInput(format!(
            "level {} is outside 1..={} for geohash '{}'",
            level,
            hash.len(),
            hash
        )));
    }
    // The geohash alphabet is ASCII, so byte offsets are char boundaries.
    Ok(&hash[..level])
}

/// Number of leading characters two geohashes share.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}
