//! End-to-end checks of metrics and bootstrap summaries on tiny cohorts.
//!
//! Tests:
//! 1. Perfect submission: every agreement metric is 1.0, counts match
//! 2. One miss out of four: accuracy and tumor screening ratios
//! 3. Single-random over one run reproduces the fixed-set distribution
//! 4. Sequential and parallel execution are each reproducible
//! 5. Summary field layout follows distribution order
//! 6. Undefined iterations propagate into the summary as NaN

use gradelab_core::sampling::{run_bootstrap, Execution};
use gradelab_core::{
    average_performance_over_cases, average_performance_over_cases_and_subjects,
    bootstrap_metric, bootstrap_metrics, compute_metric_for_runs, BootstrapConfig, Case, Grade,
    GradeTable, Metric, RaterPolicy, SummaryValue,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn table(rows: &[(&str, u8)]) -> GradeTable {
    GradeTable::from_cases(
        rows.iter()
            .map(|&(id, g)| Case::new(id, Grade::new(g).unwrap())),
    )
    .unwrap()
}

fn labelled(grades: &[u8]) -> GradeTable {
    let rows: Vec<(String, u8)> = grades
        .iter()
        .enumerate()
        .map(|(i, &g)| (format!("case_{i:03}"), g))
        .collect();
    GradeTable::from_cases(
        rows.iter()
            .map(|(id, g)| Case::new(id.clone(), Grade::new(*g).unwrap())),
    )
    .unwrap()
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|v| v.to_bits()).collect()
}

// ── 1. Perfect submission ────────────────────────────────────────────

#[test]
fn perfect_submission_scores_one() {
    let reference = table(&[("A", 0), ("B", 1), ("C", 2)]);
    let submission = reference.clone();

    let acc = Metric::Acc.compute(reference.grades(), submission.grades());
    let qwk = Metric::Qwk.compute(reference.grades(), submission.grades());
    let count = Metric::Count.compute(reference.grades(), submission.grades());

    assert_eq!(acc.get("acc"), Some(1.0));
    assert_eq!(qwk.get("qwk"), Some(1.0));
    assert_eq!(count.get("N"), Some(3.0));
    assert_eq!(count.get("N_tumor"), Some(2.0));

    let summary = bootstrap_metric(
        Metric::Acc,
        &reference,
        &[submission],
        &BootstrapConfig::new(200, 42),
    )
    .unwrap();
    assert_eq!(summary.number("acc_mean"), Some(1.0));
    assert_eq!(summary.number("acc_cilow"), Some(1.0));
    assert_eq!(summary.number("acc_cihigh"), Some(1.0));
    assert_eq!(
        summary.get("acc_bxp_fliers"),
        Some(&SummaryValue::Text(String::new()))
    );
}

// ── 2. One miss ──────────────────────────────────────────────────────

#[test]
fn one_miss_out_of_four() {
    let reference = [0u8, 0, 1, 2].map(|g| Grade::new(g).unwrap());
    let submission = [0u8, 1, 1, 2].map(|g| Grade::new(g).unwrap());

    let acc = Metric::Acc.compute(&reference, &submission);
    assert_eq!(acc.get("acc"), Some(0.75));

    let screening = Metric::ScreeningTumor.compute(&reference, &submission);
    assert_eq!(screening.get("sensitivity_tumor"), Some(1.0));
    assert_eq!(screening.get("specificity_tumor"), Some(0.5));
    assert_eq!(screening.get("acc_tumor"), Some(0.75));
    assert_eq!(screening.get("fnr_tumor"), Some(0.0));
}

#[test]
fn runs_are_averaged_per_output_name() {
    let reference = [0u8, 0, 1, 2].map(|g| Grade::new(g).unwrap());
    let perfect = reference;
    let one_miss = [0u8, 1, 1, 2].map(|g| Grade::new(g).unwrap());

    let result =
        compute_metric_for_runs(Metric::Acc, &reference, [&perfect[..], &one_miss[..]]).unwrap();
    assert_eq!(result.get("acc"), Some(0.875));
}

// ── 3. Single rater equivalence ──────────────────────────────────────

#[test]
fn single_random_over_one_run_matches_cases_only() {
    let reference = labelled(&[0, 1, 2, 3, 4, 5, 0, 1, 3, 5, 2, 4]);
    let submission = labelled(&[0, 1, 3, 3, 4, 4, 0, 2, 3, 5, 2, 5]);
    let metrics = [Metric::Count, Metric::Acc];
    let config = BootstrapConfig::new(300, 7);
    let runs = [submission];

    let single =
        run_bootstrap(&metrics, &reference, &runs, RaterPolicy::SingleRandom, &config).unwrap();
    let fixed = run_bootstrap(&metrics, &reference, &runs, RaterPolicy::FixedSet, &config).unwrap();
    assert_eq!(single, fixed);

    let a = average_performance_over_cases(&metrics, &reference, &runs, &config).unwrap();
    let b = bootstrap_metrics(&metrics, &reference, &runs, &config).unwrap();
    assert_eq!(a, b);
}

// ── 4. Reproducibility ───────────────────────────────────────────────

#[test]
fn same_seed_same_distribution() {
    let reference = labelled(&[0, 1, 2, 3, 4, 5, 1, 2]);
    let runs = vec![
        labelled(&[0, 1, 2, 3, 4, 5, 1, 2]),
        labelled(&[1, 1, 2, 2, 4, 5, 0, 2]),
        labelled(&[0, 2, 2, 3, 5, 5, 1, 3]),
    ];
    let metrics = Metric::default_bootstrapped();

    for execution in [Execution::Sequential, Execution::Parallel] {
        let config = BootstrapConfig::new(150, 42).with_execution(execution);
        for policy in [
            RaterPolicy::FixedSet,
            RaterPolicy::SingleRandom,
            RaterPolicy::ResampledMultiset,
        ] {
            let first = run_bootstrap(&metrics, &reference, &runs, policy, &config).unwrap();
            let second = run_bootstrap(&metrics, &reference, &runs, policy, &config).unwrap();
            assert_eq!(first.iterations(), 150);
            for ((name, a), (_, b)) in first.iter().zip(second.iter()) {
                assert_eq!(bits(a), bits(b), "{name} under {policy:?}/{execution:?}");
            }
        }
    }
}

#[test]
fn different_seeds_differ() {
    let reference = labelled(&[0, 1, 2, 3, 4, 5, 1, 2, 3, 0]);
    let runs = [labelled(&[0, 2, 2, 3, 5, 5, 1, 1, 3, 0])];
    let a = run_bootstrap(
        &[Metric::Acc],
        &reference,
        &runs,
        RaterPolicy::FixedSet,
        &BootstrapConfig::new(100, 1),
    )
    .unwrap();
    let b = run_bootstrap(
        &[Metric::Acc],
        &reference,
        &runs,
        RaterPolicy::FixedSet,
        &BootstrapConfig::new(100, 2),
    )
    .unwrap();
    assert_ne!(a.get("acc"), b.get("acc"));
}

// ── 5. Summary layout ────────────────────────────────────────────────

#[test]
fn summary_fields_follow_distribution_order() {
    let reference = labelled(&[0, 1, 2, 3, 4, 5]);
    let runs = [labelled(&[0, 1, 2, 3, 4, 4]), labelled(&[0, 1, 1, 3, 4, 5])];
    let summary = average_performance_over_cases_and_subjects(
        &[Metric::Acc, Metric::Count],
        &reference,
        &runs,
        &BootstrapConfig::new(50, 3),
    )
    .unwrap();

    let names: Vec<&str> = summary.iter().map(|(name, _)| name).collect();
    assert_eq!(names.len(), 3 * 13);
    assert_eq!(&names[..4], &["acc_mean", "acc_cilow", "acc_cihigh", "acc_bxp_mean"]);
    assert_eq!(names[13], "N_mean");
    assert_eq!(names[26], "N_tumor_mean");
    assert_eq!(summary.number("N_mean"), Some(6.0));
    assert!(matches!(
        summary.get("acc_bxp_fliers"),
        Some(SummaryValue::Text(_))
    ));
}

// ── 6. Undefined iterations ──────────────────────────────────────────

#[test]
fn undefined_iterations_make_the_summary_undefined() {
    // One tumor case out of eight: many resamples contain no tumor case.
    let reference = labelled(&[0, 0, 0, 0, 0, 0, 0, 3]);
    let runs = [reference.clone()];
    let config = BootstrapConfig::new(200, 42);

    let distribution = run_bootstrap(
        &[Metric::AccTumorOnly],
        &reference,
        &runs,
        RaterPolicy::FixedSet,
        &config,
    )
    .unwrap();
    let values = distribution.get("acc_gg_tumor").unwrap();
    assert_eq!(values.len(), 200);
    assert!(values.iter().any(|v| v.is_nan()));
    assert!(values.iter().any(|v| *v == 1.0));

    let summary = bootstrap_metrics(&[Metric::AccTumorOnly], &reference, &runs, &config).unwrap();
    for field in [
        "acc_gg_tumor_mean",
        "acc_gg_tumor_cilow",
        "acc_gg_tumor_cihigh",
        "acc_gg_tumor_bxp_med",
    ] {
        assert!(summary.number(field).unwrap().is_nan(), "{field}");
    }
    assert_eq!(
        summary.get("acc_gg_tumor_bxp_fliers"),
        Some(&SummaryValue::Text(String::new()))
    );
}
