use criterion::{
    criterion_group, criterion_main, measurement::Measurement, BenchmarkGroup, Criterion,
    SamplingMode,
};
use lib::analysis::{aggregate, compare_file, FileComparison};
use lib::statistics;

fn synthetic_rows(n: usize) -> Vec<FileComparison> {
    (0..n)
        .map(|i| {
            let baseline = 0.5 + (i % 17) as f64 * 0.05;
            let samples = [baseline; 10];
            let slowed = [baseline + 0.01 + (i % 5) as f64 * 0.02; 10];
            compare_file(&format!("tests/file_{i}.rs"), &samples, &slowed).unwrap()
        })
        .collect()
}

fn analysis<'a, M: Measurement>(c: &'a mut Criterion<M>) -> BenchmarkGroup<'a, M> {
    let rows = synthetic_rows(1000);
    let percentages: Vec<f64> = rows.iter().map(|row| row.difference_percentage).collect();

    let mut group = c.benchmark_group("analysis");
    group.sample_size(100);
    group.sampling_mode(SamplingMode::Flat);
    group.bench_function("aggregate 1000 files", |b| {
        b.iter(|| aggregate(&rows))
    });
    group.bench_function("histogram 1000 percentages", |b| {
        b.iter(|| statistics::histogram(&percentages, 100))
    });
    group.bench_function("median 1000 baselines", |b| {
        let baselines: Vec<f64> = rows.iter().map(|row| row.baseline_mean).collect();
        b.iter(|| statistics::median(&baselines))
    });
    group
}

criterion_group!(benches, analysis);
criterion_main!(benches);
