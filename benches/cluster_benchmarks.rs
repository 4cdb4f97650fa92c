use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geocluster::compute::centroid::{on_insert, on_remove};
use geocluster::compute::geohash::encode;
use geocluster::{ClusterIndex, Config, Coordinate, Document, MemoryStore};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn benchmark_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");

    for precision in [4, 8, 12] {
        group.bench_with_input(BenchmarkId::new("encode", precision), &precision, |b, &p| {
            let point = Coordinate::new(40.7128, -74.0060);
            b.iter(|| encode(black_box(&point), p).unwrap())
        });
    }

    group.bench_function("centroid_insert_remove", |b| {
        let centroid = Coordinate::new(10.0, 10.0);
        let point = Coordinate::new(11.0, 9.5);
        b.iter(|| {
            let (grown, size) = on_insert(black_box(&centroid), 1_000, black_box(&point));
            on_remove(&grown, size, &point)
        })
    });

    group.finish();
}

fn benchmark_index_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_operations");
    let rt = runtime();

    for precision in [6, 10] {
        let index = ClusterIndex::new(
            Arc::new(MemoryStore::new()),
            &Config::with_geohash_precision(precision),
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::new("add_point", precision), &precision, |b, _| {
            let mut counter = 0u64;
            b.to_async(&rt).iter(|| {
                counter += 1;
                let lat = 40.7128 + ((counter % 1000) as f64 * 0.001);
                let lng = -74.0060 + ((counter % 1000) as f64 * 0.001);
                let index = index.clone();
                async move {
                    index
                        .add_point(&Coordinate::new(lat, lng), None, Document::new())
                        .await
                        .unwrap()
                }
            })
        });
    }

    // Add then delete keeps the store at a fixed size between iterations.
    let index = ClusterIndex::new(Arc::new(MemoryStore::new()), &Config::with_geohash_precision(8)).unwrap();
    group.bench_function("add_then_delete", |b| {
        b.to_async(&rt).iter(|| {
            let index = index.clone();
            async move {
                let point = Coordinate::new(51.5074, -0.1278);
                index.add_point(&point, None, Document::new()).await.unwrap();
                let key = index.key_for(&point).unwrap();
                index.delete_point(&key).await.unwrap()
            }
        })
    });

    group.finish();
}

fn benchmark_concurrent_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_operations");
    let rt = runtime();

    group.bench_function("hot_cell_16_writers", |b| {
        b.to_async(&rt).iter(|| async {
            let store = Arc::new(MemoryStore::new().with_max_attempts(10_000));
            let index = ClusterIndex::new(store, &Config::with_geohash_precision(6)).unwrap();
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let index = index.clone();
                    tokio::spawn(async move {
                        let point = Coordinate::new(35.68 + i as f64 * 1e-5, 139.69);
                        index.add_point(&point, None, Document::new()).await.unwrap()
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_compute,
    benchmark_index_operations,
    benchmark_concurrent_operations
);
criterion_main!(benches);
