//! Connection benchmarks over the in-process reference engine.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvbridge::{Connection, OpenMode};
use kvbridge_bench::{generate_keys, random_data};
use kvbridge_testkit::SimEngine;
use tempfile::TempDir;

/// Benchmark auto-committed stores into an in-memory database.
fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    for size in [64, 512, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut conn = Connection::open_in_memory(SimEngine::new()).unwrap();
            let data = random_data(size);

            b.iter(|| {
                conn.store(black_box("bench"), black_box(&data)).unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark the two-call fetch.
fn bench_fetch(c: &mut Criterion) {
    let mut group = c.benchmark_group("fetch");

    for size in [64, 512, 4096] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut conn = Connection::open_in_memory(SimEngine::new()).unwrap();
            conn.store("bench", &random_data(size)).unwrap();

            b.iter(|| {
                let value = conn.fetch(black_box("bench")).unwrap();
                black_box(value);
            });
        });
    }

    group.finish();
}

/// Benchmark batched stores in one transaction versus auto-commit, on disk.
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_100");
    group.sample_size(20);

    let keys = generate_keys(100, 24);
    let data = random_data(256);

    group.bench_function("auto_commit", |b| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.db");
        let mut conn = Connection::open(SimEngine::new(), &path, OpenMode::default()).unwrap();

        b.iter(|| {
            for key in &keys {
                conn.store(key, &data).unwrap();
            }
        });
    });

    group.bench_function("transaction", |b| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.db");
        let mut conn = Connection::open(SimEngine::new(), &path, OpenMode::default()).unwrap();

        b.iter(|| {
            let mut txn = conn.begin_transaction().unwrap();
            for key in &keys {
                txn.store(key, &data).unwrap();
            }
            txn.commit().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_store, bench_fetch, bench_batch);
criterion_main!(benches);
