//! Value types shared by the encoder, the aggregator and the cluster walk.
use crate::error::{ClusterError, Result};
use geo::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record type exchanged with the backing store.
pub type Document = serde_json::Map<String, Value>;

/// Field names owned by the cluster record schema.
pub const RESERVED_FIELDS: [&str; 4] = ["g", "s", "l", "pointId"];

/// A geographic coordinate in degrees.
///
/// Serialized as `{"lat": .., "lng": ..}`; `latitude`/`longitude` are accepted
/// when reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_point()
    }
}

/// Aggregate record persisted for one geohash prefix.
///
/// `size` counts the points folded under `key` and `centroid` is their mean.
/// `point_id` is only kept while the node represents a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    #[serde(rename = "g")]
    pub key: String,
    #[serde(rename = "s")]
    pub size: u64,
    #[serde(rename = "l")]
    pub centroid: Coordinate,
    #[serde(rename = "pointId", default, skip_serializing_if = "Option::is_none")]
    pub point_id: Option<String>,
    #[serde(flatten)]
    pub source_data: Document,
}

impl ClusterNode {
    /// A fresh single-point node without payload.
    pub fn new(key: impl Into<String>, centroid: Coordinate) -> Self {
        Self {
            key: key.into(),
            size: 1,
            centroid,
            point_id: None,
            source_data: Document::new(),
        }
    }

    /// A single-point node carrying the point's identifier and original fields.
    pub fn leaf(
        key: impl Into<String>,
        centroid: Coordinate,
        point_id: Option<String>,
        source_data: Document,
    ) -> Self {
        Self {
            key: key.into(),
            size: 1,
            centroid,
            point_id,
            source_data: strip_reserved(source_data),
        }
    }

    pub fn is_single_point(&self) -> bool {
        self.size == 1
    }

    /// Parse and validate a record read from `key`.
    pub fn from_document(key: &str, document: &Document) -> Result<Self> {
        let node: ClusterNode = serde_json::from_value(Value::Object(document.clone()))
            .map_err(|e| ClusterError::CorruptNode {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        node.validate(key)?;
        Ok(node)
    }

    pub fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(ClusterError::CorruptNode {
                key: self.key.clone(),
                reason: format!("serialized to non-object {}", other),
            }),
        }
    }

    /// Check the record against the storage path it lives at.
    pub fn validate(&self, expected_key: &str) -> Result<()> {
        if self.key != expected_key {
            return Err(ClusterError::CorruptNode {
                key: expected_key.to_string(),
                reason: format!("stored geohash '{}' does not match its path", self.key),
            });
        }
        if self.size == 0 {
            return Err(ClusterError::CorruptNode {
                key: expected_key.to_string(),
                reason: "size must be at least 1".to_string(),
            });
        }
        if !self.centroid.lat.is_finite() || !self.centroid.lng.is_finite() {
            return Err(ClusterError::CorruptNode {
                key: expected_key.to_string(),
                reason: "centroid is not finite".to_string(),
            });
        }
        Ok(())
    }
}

/// Drop the fields the cluster schema owns so they cannot shadow `g`/`s`/`l`.
pub fn strip_reserved(mut document: Document) -> Document {
    for field in RESERVED_FIELDS {
        document.remove(field);
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coordinate_point_conversion() {
        let c = Coordinate::new(40.7128, -74.0060);
        let p: Point<f64> = c.into();
        assert_eq!(p.x(), -74.0060);
        assert_eq!(p.y(), 40.7128);
        assert_eq!(Coordinate::from(p), c);
    }

    #[test]
    fn test_coordinate_aliases() {
        let c: Coordinate = serde_json::from_value(json!({"latitude": 1.5, "longitude": 2.5})).unwrap();
        assert_eq!(c, Coordinate::new(1.5, 2.5));
    }

    #[test]
    fn test_node_document_schema() {
        let mut source = Document::new();
        source.insert("name".into(), json!("cafe"));
        source.insert("s".into(), json!(99));
        let node = ClusterNode::leaf("u4pruy", Coordinate::new(1.0, 2.0), Some("p1".into()), source);

        let doc = node.to_document().unwrap();
        assert_eq!(doc["g"], json!("u4pruy"));
        assert_eq!(doc["s"], json!(1));
        assert_eq!(doc["l"], json!({"lat": 1.0, "lng": 2.0}));
        assert_eq!(doc["pointId"], json!("p1"));
        assert_eq!(doc["name"], json!("cafe"));

        let parsed = ClusterNode::from_document("u4pruy", &doc).unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_point_id_omitted_for_clusters() {
        let mut node = ClusterNode::new("u4", Coordinate::new(0.0, 0.0));
        node.size = 3;
        let doc = node.to_document().unwrap();
        assert!(!doc.contains_key("pointId"));
    }

    #[test]
    fn test_from_document_rejects_mismatched_key() {
        let doc = ClusterNode::new("u4", Coordinate::new(0.0, 0.0))
            .to_document()
            .unwrap();
        let err = ClusterNode::from_document("u5", &doc).unwrap_err();
        assert!(matches!(err, ClusterError::CorruptNode { .. }));
    }

    #[test]
    fn test_from_document_rejects_zero_size() {
        let doc = json!({"g": "u4", "s": 0, "l": {"lat": 0.0, "lng": 0.0}});
        let Value::Object(doc) = doc else { unreachable!() };
        assert!(ClusterNode::from_document("u4", &doc).is_err());
    }
}
