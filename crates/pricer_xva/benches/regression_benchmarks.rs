//! Regression and exposure benchmarks.
//!
//! # Benchmark Coverage
//!
//! - Linear, multiple and segmented fits across path counts
//! - Exposure statistics over sorted predictions

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_xva::exposure::ExposureCalculator;
use pricer_xva::regression::{
    LinearRegression, MultipleLinearRegression, Regression, SegmentedLinearRegression,
};

/// Deterministic scatter around a kinked payoff.
fn sample(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| 80.0 + 40.0 * ((i as f64 * 0.618_034) % 1.0)).collect();
    let z: Vec<f64> = (0..n).map(|i| ((i as f64 * 0.414_214) % 1.0) - 0.5).collect();
    let y = x
        .iter()
        .zip(&z)
        .map(|(s, e)| (s - 100.0).max(0.0) + 5.0 * e)
        .collect();
    (x, z, y)
}

fn bench_fits(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression_fit");

    for n in [1_024usize, 16_384, 131_072] {
        let (x, z, y) = sample(n);
        let one: [&[f64]; 1] = [&x];
        let two: [&[f64]; 2] = [&x, &z];

        group.bench_with_input(BenchmarkId::new("linear", n), &n, |b, _| {
            b.iter(|| LinearRegression.fit(black_box(&one), black_box(&y)).unwrap())
        });

        let multiple = MultipleLinearRegression::new(2);
        group.bench_with_input(BenchmarkId::new("multiple_2", n), &n, |b, _| {
            b.iter(|| multiple.fit(black_box(&two), black_box(&y)).unwrap())
        });

        let segmented = SegmentedLinearRegression::new(8).unwrap();
        group.bench_with_input(BenchmarkId::new("segmented_8", n), &n, |b, _| {
            b.iter(|| segmented.fit(black_box(&one), black_box(&y)).unwrap())
        });

        let continuous = segmented.continuous(true);
        group.bench_with_input(BenchmarkId::new("segmented_8_continuous", n), &n, |b, _| {
            b.iter(|| continuous.fit(black_box(&one), black_box(&y)).unwrap())
        });
    }
    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("exposure_statistics");

    for n in [16_384usize, 131_072] {
        let (_, _, mut y) = sample(n);
        y.sort_by(f64::total_cmp);

        group.bench_with_input(BenchmarkId::new("epe", n), &y, |b, y| {
            b.iter(|| ExposureCalculator::expected_positive(black_box(y)))
        });
        group.bench_with_input(BenchmarkId::new("pfe_99", n), &y, |b, y| {
            b.iter(|| ExposureCalculator::quantile(black_box(y), 0.99))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fits, bench_statistics);
criterion_main!(benches);
