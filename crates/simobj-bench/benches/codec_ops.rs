//! Criterion micro-benchmarks for the cache codec and configuration hash.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use simobj_bench::synthetic_entry;
use simobj_cache::codec::{decode_entry, encode_entry};
use simobj_cache::ConfigHasher;

/// Benchmark: encode an entry with 5 fields of 10K rows.
fn bench_encode_entry(c: &mut Criterion) {
    let entry = synthetic_entry(5, 10_000);

    c.bench_function("codec_encode_entry", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(1 << 21);
            encode_entry(&mut buf, &entry).unwrap();
            black_box(&buf);
        });
    });
}

/// Benchmark: decode the same entry.
fn bench_decode_entry(c: &mut Criterion) {
    let entry = synthetic_entry(5, 10_000);
    let mut encoded = Vec::new();
    encode_entry(&mut encoded, &entry).unwrap();

    c.bench_function("codec_decode_entry", |b| {
        b.iter(|| {
            let mut cursor = encoded.as_slice();
            let decoded = decode_entry(&mut cursor).unwrap();
            black_box(&decoded);
        });
    });
}

/// Benchmark: hash a configuration-sized input.
fn bench_config_hash(c: &mut Criterion) {
    let names: Vec<String> = (0..64).map(|i| format!("field_{i}_g")).collect();

    c.bench_function("config_hash_64_fields", |b| {
        b.iter(|| {
            let h = names
                .iter()
                .fold(ConfigHasher::new(), |h, n| h.str(n).u8(1));
            black_box(h.finish());
        });
    });
}

criterion_group!(
    benches,
    bench_encode_entry,
    bench_decode_entry,
    bench_config_hash
);
criterion_main!(benches);
