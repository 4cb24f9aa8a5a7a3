//! Criterion micro-benchmarks for interval grouping and partial reads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use simobj_bench::{clustered_mask, halo_source, scattered_mask};
use simobj_core::Selector;
use simobj_select::{fetch_selected, group_intervals};

/// Benchmark: group a 1M-row mask at several ratios.
fn bench_group_intervals(c: &mut Criterion) {
    let scattered = scattered_mask(1_000_000, 10_000, 42);
    let clustered = clustered_mask(1_000_000, 64, 500);

    let mut group = c.benchmark_group("group_intervals");
    for ratio in [0.0, 0.001, 0.1] {
        group.bench_with_input(BenchmarkId::new("scattered", ratio), &ratio, |b, &r| {
            b.iter(|| black_box(group_intervals(&scattered, r)));
        });
        group.bench_with_input(BenchmarkId::new("clustered", ratio), &ratio, |b, &r| {
            b.iter(|| black_box(group_intervals(&clustered, r)));
        });
    }
    group.finish();
}

/// Benchmark: read one group's rows of a 100K-particle field, grouped
/// versus one whole read.
fn bench_fetch_selected(c: &mut Criterion) {
    let mask: Vec<bool> = (0..100_000).map(|i| i % 50 == 7).collect();
    let selector = Selector::BoolArray(mask);
    let mut source = halo_source(100_000, 50);

    let mut group = c.benchmark_group("fetch_selected");
    for ratio in [0.0, 0.01, 1.0] {
        group.bench_with_input(BenchmarkId::from_parameter(ratio), &ratio, |b, &r| {
            b.iter(|| {
                let v = fetch_selected(&mut source, "xyz_g", &selector, r).unwrap();
                black_box(v);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_group_intervals, bench_fetch_selected);
criterion_main!(benches);
