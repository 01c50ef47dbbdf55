//! Benchmark for column classification, pretty binning and edge merging
//!
//! Run with: cargo bench --bench bucketing_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use riskscan::pipeline::summarize_column;

/// Generate a continuous column with a mild right skew and a sprinkle of
/// missing values
fn generate_column(n_rows: usize, seed: u64) -> (Vec<String>, Vec<bool>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let values: Vec<String> = (0..n_rows)
        .map(|_| {
            if rng.gen::<f64>() < 0.02 {
                String::new()
            } else {
                let v = rng.gen::<f64>();
                format!("{:.2}", v * v * 500.0)
            }
        })
        .collect();
    let mask: Vec<bool> = values
        .iter()
        .map(|v| v.parse::<f64>().map(|n| n > 250.0).unwrap_or(false))
        .collect();
    (values, mask)
}

fn benchmark_summarize_continuous(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize_continuous");

    for n_rows in [1_000, 10_000, 100_000] {
        let (values, mask) = generate_column(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(n_rows),
            &(values, mask),
            |b, (values, mask)| {
                b.iter(|| {
                    summarize_column(
                        black_box("value"),
                        black_box(values),
                        black_box(mask),
                        black_box(25),
                        black_box(true),
                    )
                })
            },
        );
    }

    group.finish();
}

fn benchmark_summarize_categorical(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize_categorical");
    let options = ["a", "b", "c", "d", "e", "f"];

    for n_rows in [10_000, 100_000] {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let values: Vec<String> = (0..n_rows)
            .map(|_| options[rng.gen_range(0..options.len())].to_string())
            .collect();
        let mask: Vec<bool> = (0..n_rows).map(|_| rng.gen::<f64>() < 0.3).collect();
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(n_rows),
            &(values, mask),
            |b, (values, mask)| {
                b.iter(|| {
                    summarize_column(
                        black_box("category"),
                        black_box(values),
                        black_box(mask),
                        black_box(0),
                        black_box(true),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_summarize_continuous,
    benchmark_summarize_categorical
);
criterion_main!(benches);
