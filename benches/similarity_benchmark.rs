//! Benchmark comparing Pearson and Cramér's V similarity computation
//!
//! Run with: cargo bench --bench similarity_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use riskscan::pipeline::{cramers_v, pearson, summarize_column, ColumnSummary};

fn continuous_column(name: &str, n_rows: usize, seed: u64) -> ColumnSummary {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let values: Vec<String> = (0..n_rows)
        .map(|_| format!("{:.3}", rng.gen::<f64>() * 1000.0))
        .collect();
    let mask = vec![false; n_rows];
    summarize_column(name, &values, &mask, 25, true).expect("continuous column")
}

fn categorical_column(name: &str, n_rows: usize, seed: u64) -> ColumnSummary {
    let options = ["red", "green", "blue", "yellow", "purple"];
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let values: Vec<String> = (0..n_rows)
        .map(|_| options[rng.gen_range(0..options.len())].to_string())
        .collect();
    let mask = vec![false; n_rows];
    summarize_column(name, &values, &mask, 0, true).expect("categorical column")
}

fn benchmark_pearson(c: &mut Criterion) {
    let mut group = c.benchmark_group("pearson");

    for n_rows in [1_000, 10_000, 100_000] {
        let x = continuous_column("x", n_rows, 1);
        let y = continuous_column("y", n_rows, 2);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| pearson(black_box(x), black_box(y)))
        });
    }

    group.finish();
}

fn benchmark_cramers_v(c: &mut Criterion) {
    let mut group = c.benchmark_group("cramers_v");

    for n_rows in [1_000, 10_000, 100_000] {
        let x = categorical_column("x", n_rows, 3);
        let y = categorical_column("y", n_rows, 4);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| cramers_v(black_box(x), black_box(y)))
        });
    }

    group.finish();
}

fn benchmark_mixed_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_similarity");

    let n_rows = 10_000;
    let x = continuous_column("x", n_rows, 5);
    let y = categorical_column("y", n_rows, 6);
    group.throughput(Throughput::Elements(n_rows as u64));

    group.bench_with_input(
        BenchmarkId::from_parameter(n_rows),
        &(x, y),
        |b, (x, y)| b.iter(|| riskscan::pipeline::similarity(black_box(x), black_box(y))),
    );

    group.finish();
}

criterion_group!(
    benches,
    benchmark_pearson,
    benchmark_cramers_v,
    benchmark_mixed_similarity
);
criterion_main!(benches);
