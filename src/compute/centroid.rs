//! Incremental centroid maintenance.
//!
//! A cluster node stores only its size and the mean of its points, so every
//! insertion and removal is folded in arithmetically. Removal is the exact
//! inverse of insertion only when the removed coordinate is the same value
//! that was inserted; callers must thread that value through every level.

use crate::types::Coordinate;

/// Folds `point` into a centroid of `old_size` points.
///
/// With `old_size == 0` the result is the point itself.
///
/// ```
/// use geocluster::compute::centroid::on_insert;
/// use geocluster::Coordinate;
///
/// let (c, n) = on_insert(&Coordinate::new(0.0, 0.0), 1, &Coordinate::new(2.0, 4.0));
/// assert_eq!(n, 2);
/// assert_eq!(c, Coordinate::new(1.0, 2.0));
/// ```
pub fn on_insert(old_centroid: &Coordinate, old_size: u64, point: &Coordinate) -> (Coordinate, u64) {
    if old_size == 0 {
        return (*point, 1);
    }

    let new_size = old_size + 1;
    let weight = old_size as f64;
    let n = new_size as f64;
    let centroid = Coordinate::new(
        (old_centroid.lat * weight + point.lat) / n,
        (old_centroid.lng * weight + point.lng) / n,
    );
    (centroid, new_size)
}

/// Removes `removed` from a centroid of `old_size` points.
///
/// Returns `None` when no point would remain; the node must then be deleted.
pub fn on_remove(
    old_centroid: &Coordinate,
    old_size: u64,
    removed: &Coordinate,
) -> Option<(Coordinate, u64)> {
    if old_size <= 1 {
        return None;
    }

    let new_size = old_size - 1;
    let weight = old_size as f64;
    let n = new_size as f64;
    let centroid = Coordinate::new(
        (old_centroid.lat * weight - removed.lat) / n,
        (old_centroid.lng * weight - removed.lng) / n,
    );
    Some((centroid, new_size))
}

/// Replaces `from` with `to` inside a centroid of `size` points (size unchanged).
pub fn on_shift(centroid: &Coordinate, size: u64, from: &Coordinate, to: &Coordinate) -> Coordinate {
    if size <= 1 {
        return *to;
    }

    let n = size as f64;
    Coordinate::new(
        centroid.lat + (to.lat - from.lat) / n,
        centroid.lng + (to.lng - from.lng) / n,
    )
}
