//! Benchmarks for social graph construction.
//!
//! Measures performance of:
//! - Full tiered builds at sweep-relevant sizes
//! - The bridge pass in isolation (via bridge-heavy configs)
//! - Statistics computation (BFS diameter dominates)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shroud_graph::{build_graph, compute_statistics, GraphConfig, LehmerRng};

/// Benchmark graph construction across the sweep's node counts.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for &users in &[50usize, 100, 200, 400] {
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::from_parameter(users), &users, |b, &n| {
            let config = GraphConfig {
                users: n,
                seed: 42,
                ..GraphConfig::default()
            };
            b.iter(|| {
                let mut rng = LehmerRng::new(config.seed);
                build_graph(black_box(&config), &mut rng)
            })
        });
    }
    group.finish();
}

/// Benchmark a bridge-heavy configuration (every node bridges).
fn bench_bridge_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph_bridged");
    group.sample_size(50);

    for &users in &[100usize, 300] {
        group.bench_with_input(BenchmarkId::from_parameter(users), &users, |b, &n| {
            let config = GraphConfig {
                users: n,
                p_bridge: 1.0,
                seed: 7,
                ..GraphConfig::default()
            };
            b.iter(|| {
                let mut rng = LehmerRng::new(config.seed);
                build_graph(black_box(&config), &mut rng)
            })
        });
    }
    group.finish();
}

/// Benchmark the statistics block used for ground-truth records.
fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_statistics");
    group.sample_size(30);

    for &users in &[100usize, 400] {
        let config = GraphConfig {
            users,
            seed: 3,
            ..GraphConfig::default()
        };
        let graph = build_graph(&config, &mut LehmerRng::new(config.seed));
        group.bench_with_input(BenchmarkId::from_parameter(users), &graph, |b, g| {
            b.iter(|| compute_statistics(black_box(g)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_bridge_heavy, bench_statistics);
criterion_main!(benches);
