//! Property tests for metric and bootstrap invariants.
//!
//! Uses proptest to verify:
//! 1. Kappa never exceeds 1 and is exactly 1 on identical labels
//! 2. Accuracy and screening ratios stay in [0, 1] when defined
//! 3. Resampled distributions have exactly n_bootstraps values per metric
//! 4. Percentile interval is ordered and brackets the median
//! 5. Re-running with the same seed reproduces the distribution bit for bit

use proptest::prelude::*;

use gradelab_core::metrics::{accuracy, weighted_kappa, KappaWeights};
use gradelab_core::sampling::run_bootstrap;
use gradelab_core::{BootstrapConfig, Case, Grade, GradeTable, Metric, RaterPolicy};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_grades(len: usize) -> impl Strategy<Value = Vec<Grade>> {
    prop::collection::vec((0u8..=5).prop_map(|g| Grade::new(g).unwrap()), len)
}

/// Reference and submission labels of equal length.
fn arb_pair() -> impl Strategy<Value = (Vec<Grade>, Vec<Grade>)> {
    (1usize..40).prop_flat_map(|n| (arb_grades(n), arb_grades(n)))
}

fn arb_policy() -> impl Strategy<Value = RaterPolicy> {
    prop_oneof![
        Just(RaterPolicy::FixedSet),
        Just(RaterPolicy::SingleRandom),
        Just(RaterPolicy::ResampledMultiset),
    ]
}

fn to_table(grades: &[Grade]) -> GradeTable {
    GradeTable::from_cases(
        grades
            .iter()
            .enumerate()
            .map(|(i, &g)| Case::new(format!("img{i:04}"), g)),
    )
    .unwrap()
}

// ── 1. Kappa bounds ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn kappa_at_most_one((reference, submission) in arb_pair()) {
        for weights in [KappaWeights::Linear, KappaWeights::Quadratic] {
            let k = weighted_kappa(&reference, &submission, weights);
            prop_assert!(k.is_nan() || k <= 1.0 + 1e-12, "kappa {k}");
        }
    }

    #[test]
    fn kappa_of_identical_labels_is_one_or_undefined(grades in (1usize..40).prop_flat_map(arb_grades)) {
        let k = weighted_kappa(&grades, &grades, KappaWeights::Quadratic);
        let distinct = grades.iter().any(|g| *g != grades[0]);
        if distinct {
            prop_assert!((k - 1.0).abs() < 1e-12, "kappa {k}");
        } else {
            prop_assert!(k.is_nan());
        }
    }
}

// ── 2. Ratios in range ───────────────────────────────────────────────

proptest! {
    #[test]
    fn ratios_are_unit_interval((reference, submission) in arb_pair()) {
        let acc = accuracy(&reference, &submission);
        prop_assert!((0.0..=1.0).contains(&acc));

        for metric in [Metric::ScreeningTumor, Metric::ScreeningGg2, Metric::ScreeningGg3, Metric::AccTumorOnly] {
            for (name, value) in metric.compute(&reference, &submission) {
                prop_assert!(value.is_nan() || (0.0..=1.0).contains(&value), "{name} = {value}");
            }
        }
    }
}

// ── 3–5. Bootstrap ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn distribution_has_one_value_per_iteration(
        (reference, submission) in arb_pair(),
        n_bootstraps in 1usize..60,
        seed in any::<u64>(),
        policy in arb_policy(),
    ) {
        let reference = to_table(&reference);
        let runs = [to_table(&submission), reference.clone()];
        let config = BootstrapConfig::new(n_bootstraps, seed);
        let dist = run_bootstrap(&[Metric::Acc, Metric::Count], &reference, &runs, policy, &config).unwrap();

        prop_assert_eq!(dist.iterations(), n_bootstraps);
        for (_, values) in dist.iter() {
            prop_assert_eq!(values.len(), n_bootstraps);
        }
        for &n in dist.get("N").unwrap() {
            prop_assert_eq!(n, reference.len() as f64);
        }
    }

    #[test]
    fn interval_is_ordered(
        (reference, submission) in arb_pair(),
        seed in any::<u64>(),
    ) {
        let reference = to_table(&reference);
        let runs = [to_table(&submission)];
        let summary = gradelab_core::bootstrap_metric(
            Metric::Acc,
            &reference,
            &runs,
            &BootstrapConfig::new(40, seed),
        )
        .unwrap();

        let low = summary.number("acc_cilow").unwrap();
        let high = summary.number("acc_cihigh").unwrap();
        let med = summary.number("acc_bxp_med").unwrap();
        prop_assert!(low <= high);
        prop_assert!(low <= med && med <= high);
        prop_assert!(summary.number("acc_bxp_q1").unwrap() <= summary.number("acc_bxp_q3").unwrap());
    }

    #[test]
    fn same_seed_reproduces(
        (reference, submission) in arb_pair(),
        seed in any::<u64>(),
        policy in arb_policy(),
    ) {
        let reference = to_table(&reference);
        let runs = [to_table(&submission), to_table(&submission)];
        let config = BootstrapConfig::new(25, seed);
        let metrics = Metric::default_bootstrapped();

        let a = run_bootstrap(&metrics, &reference, &runs, policy, &config).unwrap();
        let b = run_bootstrap(&metrics, &reference, &runs, policy, &config).unwrap();
        for ((name, x), (_, y)) in a.iter().zip(b.iter()) {
            let x: Vec<u64> = x.iter().map(|v| v.to_bits()).collect();
            let y: Vec<u64> = y.iter().map(|v| v.to_bits()).collect();
            prop_assert_eq!(x, y, "{}", name);
        }
    }
}
