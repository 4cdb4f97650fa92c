//! Getting started with geocluster
//!
//! Adds a handful of landmarks to a clustered collection, reads the cluster
//! markers a map would draw at a few zoom levels, then moves and deletes a
//! point.

use geocluster::prelude::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    println!("geocluster getting started");
    println!("==========================\n");

    let store = Arc::new(MemoryStore::new());
    let places = GeoCollectionBuilder::new()
        .precision(8)
        .custom_key("location")
        .build(Arc::clone(&store))?;

    let landmarks = [
        ("eiffel", "Eiffel Tower", 48.8584, 2.2945),
        ("louvre", "Louvre", 48.8606, 2.3376),
        ("notre-dame", "Notre-Dame", 48.8530, 2.3499),
        ("big-ben", "Big Ben", 51.5007, -0.1246),
        ("tower-bridge", "Tower Bridge", 51.5055, -0.0754),
        ("colosseum", "Colosseum", 41.8902, 12.4922),
    ];

    let mut keys = Vec::new();
    for (id, name, lat, lng) in landmarks {
        let key = places
            .add(json!({"id": id, "name": name, "location": {"lat": lat, "lng": lng}}))
            .await?;
        println!("Added {:<14} at {}", name, key);
        keys.push(key);
    }

    println!("\nStored {} cluster records for {} points", store.len(), keys.len());

    for level in [1, 3, 5] {
        println!("\nLevel {} markers:", level);
        for node in places.index().clusters_at_level("", level).await? {
            println!(
                "  {:<6} {} point(s) around ({:.4}, {:.4})",
                node.key, node.size, node.centroid.lat, node.centroid.lng
            );
        }
    }

    let moved = places
        .update(
            &keys[0],
            json!({"id": "eiffel", "name": "Eiffel Tower", "location": {"lat": 48.8606, "lng": 2.3376}}),
        )
        .await?;
    println!("\nMoved eiffel from {} to {}", keys[0], moved);

    let shared = places.index().get_cluster(&moved).await?;
    if let Some(node) = shared {
        println!("Leaf {} now holds {} point(s)", node.key, node.size);
    }

    places
        .delete_with(&keys[3], &mut |node| {
            println!("  cluster {} now has {} point(s)", node.key, node.size)
        })
        .await?;
    println!("Deleted big-ben; {} point(s) remain", places.index().point_count().await?);

    let stats = store.stats();
    println!(
        "\nStore: {} transactions, {} commits, {} conflicts",
        stats.transactions, stats.commits, stats.conflicts
    );

    Ok(())
}
