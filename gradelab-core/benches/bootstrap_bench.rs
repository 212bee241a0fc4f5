//! Criterion benchmarks for GradeLab hot paths.
//!
//! Benchmarks:
//! 1. Metric evaluation on aligned label vectors (kappa, screening)
//! 2. Bootstrap loop per rater policy
//! 3. Sequential vs parallel iteration scheduling
//! 4. Summary statistics over a large distribution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use gradelab_core::sampling::{run_bootstrap, Distribution, Execution};
use gradelab_core::{
    summarize, BootstrapConfig, Case, Grade, GradeTable, Metric, MetricResult, RaterPolicy,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_grades(n: usize, offset: usize) -> Vec<Grade> {
    (0..n)
        .map(|i| Grade::new(((i * 7 + offset) % 6) as u8).unwrap())
        .collect()
}

fn make_table(n: usize, offset: usize) -> GradeTable {
    GradeTable::from_cases(
        make_grades(n, offset)
            .into_iter()
            .enumerate()
            .map(|(i, g)| Case::new(format!("case_{i:05}"), g)),
    )
    .unwrap()
}

fn make_cohort(n_cases: usize, n_runs: usize) -> (GradeTable, Vec<GradeTable>) {
    let reference = make_table(n_cases, 0);
    let runs = (0..n_runs).map(|k| make_table(n_cases, k % 3)).collect();
    (reference, runs)
}

// ── 1. Metrics ───────────────────────────────────────────────────────

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");

    for &n in &[100, 1000, 10_000] {
        let reference = make_grades(n, 0);
        let submission = make_grades(n, 1);

        for metric in [Metric::Qwk, Metric::ScreeningTumor] {
            group.bench_with_input(BenchmarkId::new(metric.name(), n), &n, |b, _| {
                b.iter(|| metric.compute(black_box(&reference), black_box(&submission)));
            });
        }
    }

    group.finish();
}

// ── 2. Policies ──────────────────────────────────────────────────────

fn bench_policies(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap_policy");
    group.sample_size(20);

    let (reference, runs) = make_cohort(400, 5);
    let metrics = Metric::default_bootstrapped();
    let config = BootstrapConfig::new(100, 42);

    for policy in [
        RaterPolicy::FixedSet,
        RaterPolicy::SingleRandom,
        RaterPolicy::ResampledMultiset,
    ] {
        group.bench_function(format!("{policy:?}"), |b| {
            b.iter(|| {
                run_bootstrap(
                    black_box(&metrics),
                    black_box(&reference),
                    black_box(&runs),
                    policy,
                    &config,
                )
            });
        });
    }

    group.finish();
}

// ── 3. Scheduling ────────────────────────────────────────────────────

fn bench_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootstrap_execution");
    group.sample_size(10);

    let (reference, runs) = make_cohort(400, 3);
    let metrics = [Metric::Qwk, Metric::Acc];

    for execution in [Execution::Sequential, Execution::Parallel] {
        let config = BootstrapConfig::new(500, 42).with_execution(execution);
        group.bench_function(format!("{execution:?}"), |b| {
            b.iter(|| {
                run_bootstrap(
                    black_box(&metrics),
                    black_box(&reference),
                    black_box(&runs),
                    RaterPolicy::FixedSet,
                    &config,
                )
            });
        });
    }

    group.finish();
}

// ── 4. Summary ───────────────────────────────────────────────────────

fn bench_summary(c: &mut Criterion) {
    let mut dist = Distribution::with_capacity(5000);
    for i in 0..5000 {
        let mut result = MetricResult::new();
        result.push("qwk", 0.7 + ((i as f64) * 0.37).sin() * 0.1);
        dist.push(result).unwrap();
    }

    c.bench_function("summarize_5000", |b| {
        b.iter(|| summarize(black_box(&dist)));
    });
}

criterion_group!(
    benches,
    bench_metrics,
    bench_policies,
    bench_execution,
    bench_summary
);
criterion_main!(benches);
