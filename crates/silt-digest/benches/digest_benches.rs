//! Benchmarks for the offset cursor codec.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use silt_core::types::Height;
use silt_digest::{build_offset, parse_offset};

fn bench_offset_codec(c: &mut Criterion) {
    c.bench_function("build_offset", |b| {
        b.iter(|| build_offset(black_box(Height(1_234_567)), black_box(42)))
    });

    let cursor = build_offset(Height(1_234_567), 42);
    c.bench_function("parse_offset", |b| {
        b.iter(|| parse_offset(black_box(&cursor)).unwrap())
    });

    c.bench_function("offset_round_trip", |b| {
        b.iter(|| {
            let s = build_offset(black_box(Height(9)), black_box(7));
            parse_offset(&s).unwrap()
        })
    });
}

criterion_group!(benches, bench_offset_codec);
criterion_main!(benches);
