//! Benchmarks for B-tree inserts and lookups

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use diskbtree::{BTree, Config};
use tempfile::TempDir;

const KEYS: u64 = 2_000;

/// Every key in `0..KEYS` exactly once, in a scattered order.
fn scattered_keys() -> Vec<u64> {
    // 7919 is coprime with KEYS, so this is a permutation
    (0..KEYS).map(|i| (i * 7919) % KEYS).collect()
}

fn fresh_tree(block_size: u32) -> (BTree, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = Config::builder()
        .block_size(block_size)
        .sync_writes(false)
        .build();
    let tree = BTree::create(dir.path().join("bench.idx"), &config).unwrap();
    (tree, dir)
}

fn insert_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(10);

    for block_size in [73u32, 512, 4096] {
        group.bench_with_input(
            BenchmarkId::new("sequential", block_size),
            &block_size,
            |b, &bs| {
                b.iter_batched(
                    || fresh_tree(bs),
                    |(mut tree, _dir)| {
                        for k in 0..KEYS {
                            tree.insert(k, k).unwrap();
                        }
                    },
                    BatchSize::PerIteration,
                )
            },
        );

        group.bench_with_input(
            BenchmarkId::new("scattered", block_size),
            &block_size,
            |b, &bs| {
                let keys = scattered_keys();
                b.iter_batched(
                    || fresh_tree(bs),
                    |(mut tree, _dir)| {
                        for &k in &keys {
                            tree.insert(k, k).unwrap();
                        }
                    },
                    BatchSize::PerIteration,
                )
            },
        );
    }

    group.finish();
}

fn search_benchmarks(c: &mut Criterion) {
    let (mut tree, _dir) = fresh_tree(512);
    for k in scattered_keys() {
        tree.insert(k, k).unwrap();
    }

    c.bench_function("search_all", |b| {
        b.iter(|| {
            for k in 0..KEYS {
                criterion::black_box(tree.search(k).unwrap());
            }
        })
    });
}

criterion_group!(benches, insert_benchmarks, search_benchmarks);
criterion_main!(benches);
