//! Criterion benchmarks for ShareLab hot paths.
//!
//! Benchmarks:
//! 1. Cache merge (fresh store, overlapping re-store)
//! 2. Cache range load
//! 3. Moving average over a long series

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::NaiveDate;
use sharelab_core::data::synthetic::generate_series;
use sharelab_core::data::PriceCache;
use sharelab_core::domain::{PriceRecord, Query};
use sharelab_core::indicators::moving_average;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_records(years: i32) -> Vec<PriceRecord> {
    let start = NaiveDate::from_ymd_opt(2024 - years, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    generate_series("BENCH", start, end)
}

// ── 1. Cache Merge ───────────────────────────────────────────────────

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_store");

    for &years in &[1, 2, 10] {
        let records = make_records(years);

        group.bench_with_input(BenchmarkId::new("fresh", records.len()), &records, |b, records| {
            b.iter(|| {
                let cache = PriceCache::new();
                cache.store(black_box(records))
            });
        });

        // Second half overlaps what is already cached.
        let (first, _) = records.split_at(records.len() / 2);
        group.bench_with_input(
            BenchmarkId::new("overlapping", records.len()),
            &records,
            |b, records| {
                b.iter(|| {
                    let cache = PriceCache::new();
                    cache.store(first);
                    cache.store(black_box(records))
                });
            },
        );
    }

    group.finish();
}

// ── 2. Cache Load ────────────────────────────────────────────────────

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_load");

    let cache = PriceCache::new();
    cache.store(&make_records(10));
    let quarter = Query::new(
        "BENCH",
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2020, 3, 31).unwrap(),
    )
    .unwrap();
    let two_years = Query::new(
        "BENCH",
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
    )
    .unwrap();

    group.bench_function("quarter", |b| b.iter(|| cache.load(black_box(&quarter))));
    group.bench_function("two_years", |b| b.iter(|| cache.load(black_box(&two_years))));
    group.bench_function("has_cached_data", |b| {
        b.iter(|| cache.has_cached_data(black_box(&two_years)))
    });

    group.finish();
}

// ── 3. Moving Average ────────────────────────────────────────────────

fn bench_moving_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("moving_average");

    for &years in &[1, 10] {
        let records = make_records(years);
        for &window in &[20, 200] {
            group.bench_with_input(
                BenchmarkId::new(format!("sma_{window}"), records.len()),
                &records,
                |b, records| b.iter(|| moving_average(black_box(records), window)),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_store, bench_load, bench_moving_average);
criterion_main!(benches);
