use geocluster::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn new_index(precision: usize) -> ClusterIndex<MemoryStore> {
    ClusterIndex::new(Arc::new(MemoryStore::new()), &Config::with_geohash_precision(precision))
        .expect("Failed to create index")
}

/// Test 1: Large dataset stays consistent across levels
#[tokio::test]
async fn test_large_dataset_insertion() {
    let index = new_index(8);

    for i in 0..2_000 {
        let lat = 40.0 + (i as f64 * 0.001);
        let lng = -74.0 + (i as f64 * 0.001);
        index
            .add_point(&Coordinate::new(lat, lng), Some(format!("p{}", i)), Document::new())
            .await
            .unwrap_or_else(|_| panic!("Failed to insert point {}", i));
    }

    assert_eq!(index.point_count().await.unwrap(), 2_000);

    // Each level partitions the same points.
    for level in 2..=8 {
        let total: u64 = index
            .clusters_at_level("", level)
            .await
            .unwrap()
            .iter()
            .map(|n| n.size)
            .sum();
        assert_eq!(total, 2_000, "level {} lost points", level);
    }
}

/// Test 2: Extreme coordinate values
#[tokio::test]
async fn test_extreme_coordinates() {
    let index = new_index(6);
    let extremes = [
        Coordinate::new(90.0, 180.0),
        Coordinate::new(-90.0, -180.0),
        Coordinate::new(0.0, 180.0),
        Coordinate::new(0.0, -180.0),
        Coordinate::new(89.999999, 0.0),
    ];

    for point in &extremes {
        index.add_point(point, None, Document::new()).await.unwrap();
    }
    assert_eq!(index.point_count().await.unwrap(), extremes.len() as u64);

    for point in &extremes {
        let key = index.key_for(point).unwrap();
        index.delete_point(&key).await.unwrap();
    }
    assert_eq!(index.point_count().await.unwrap(), 0);
}

/// Test 3: Non-finite and out-of-range coordinates
#[tokio::test]
async fn test_invalid_coordinates_rejected() {
    let index = new_index(6);
    for point in [
        Coordinate::new(f64::NAN, 0.0),
        Coordinate::new(0.0, f64::INFINITY),
        Coordinate::new(-90.5, 0.0),
        Coordinate::new(0.0, 180.5),
    ] {
        let err = index.add_point(&point, None, Document::new()).await.unwrap_err();
        assert!(matches!(err, ClusterError::InvalidCoordinate { .. }));
    }
    assert_eq!(index.store().len(), 0);
}

/// Test 4: Empty index queries
#[tokio::test]
async fn test_empty_index_queries() {
    let index = new_index(5);
    assert_eq!(index.point_count().await.unwrap(), 0);
    assert!(index.clusters_at_level("", 1).await.unwrap().is_empty());
    assert!(index.clusters_at_level("u09", 5).await.unwrap().is_empty());
    assert!(index.get_cluster("u09tu").await.unwrap().is_none());
}

/// Test 5: Reserved fields in source data cannot shadow the schema
#[tokio::test]
async fn test_reserved_fields_stripped() {
    let index = new_index(4);
    let mut fields = Document::new();
    fields.insert("g".into(), json!("zzzz"));
    fields.insert("s".into(), json!(99));
    fields.insert("l".into(), json!({"lat": 1.0, "lng": 1.0}));
    fields.insert("pointId".into(), json!("spoofed"));
    fields.insert("kept".into(), json!({"nested": [1, 2, 3]}));

    let point = Coordinate::new(0.0, 0.0);
    index.add_point(&point, Some("real".into()), fields).await.unwrap();

    let leaf = index.get_cluster("s000").await.unwrap().unwrap();
    assert_eq!(leaf.size, 1);
    assert_eq!(leaf.centroid, point);
    assert_eq!(leaf.point_id.as_deref(), Some("real"));
    assert_eq!(leaf.source_data.len(), 1);
    assert_eq!(leaf.source_data["kept"], json!({"nested": [1, 2, 3]}));
}

/// Test 6: Single-level index
#[tokio::test]
async fn test_precision_one() {
    let index = new_index(1);
    let a = Coordinate::new(0.0, 0.0);
    let b = Coordinate::new(10.0, 10.0);

    index.add_point(&a, Some("a".into()), Document::new()).await.unwrap();
    let leaf = index.get_cluster("s").await.unwrap().unwrap();
    assert_eq!(leaf.point_id.as_deref(), Some("a"));

    index.add_point(&b, Some("b".into()), Document::new()).await.unwrap();
    let leaf = index.get_cluster("s").await.unwrap().unwrap();
    assert_eq!(leaf.size, 2);
    assert!(leaf.point_id.is_none());

    index.delete_point("s").await.unwrap();
    index.delete_point("s").await.unwrap();
    assert!(index.store().is_empty());
}

/// Test 7: Maximum precision
#[tokio::test]
async fn test_max_precision() {
    let index = new_index(12);
    let point = Coordinate::new(57.64911, 10.40744);
    let report = index.add_point(&point, None, Document::new()).await.unwrap();

    assert_eq!(report.levels.len(), 12);
    let key = index.key_for(&point).unwrap();
    assert!(key.starts_with("u4pruydqqvj"));
    assert_eq!(index.store().len(), 12);
}

/// Test 8: Invalid configuration is rejected up front
#[test]
fn test_invalid_config() {
    let mut config = Config::default();
    config.geohash_precision = 0;
    assert!(matches!(
        ClusterIndex::new(Arc::new(MemoryStore::new()), &config),
        Err(ClusterError::Config(_))
    ));

    let mut config = Config::default();
    config.custom_key = String::new();
    assert!(ClusterIndex::new(Arc::new(MemoryStore::new()), &config).is_err());
}

/// Test 9: Corrupt stored node surfaces on read
#[tokio::test]
async fn test_corrupt_node_on_read() {
    let index = new_index(4);
    let mut doc = Document::new();
    doc.insert("g".into(), json!("s001"));
    doc.insert("s".into(), json!(1));
    doc.insert("l".into(), json!({"lat": 0.0, "lng": 0.0}));
    index.store().set("s000", doc).await.unwrap();

    assert!(matches!(
        index.get_cluster("s000").await,
        Err(ClusterError::CorruptNode { .. })
    ));
}
