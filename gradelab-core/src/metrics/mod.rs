//! Metric functions: pure maps from aligned (reference, submission) grades to named scalars.
//!
//! Every metric takes two row-aligned grade slices and works positionally, so
//! it is equally valid on the full dataset and on a bootstrap resample with
//! repeated cases. The metric set is closed: [`Metric`] is the registry.
//!
//! Zero-denominator policy: every ratio goes through [`ratio`], which yields
//! `NaN` instead of dividing by zero. `NaN` values flow into bootstrap
//! distributions and mark the affected summary fields as undefined.

pub mod confusion;
pub mod kappa;
pub mod screening;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Grade;

pub use confusion::{BinaryConfusion, GradeConfusion};
pub use kappa::{weighted_kappa, KappaWeights};
pub use screening::{Screening, ScreeningRatios};

/// `num / den`, or `NaN` when `den` is zero.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

// ─── Metric result ──────────────────────────────────────────────────

/// Ordered metric name → value mapping produced by one metric invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricResult {
    values: Vec<(&'static str, f64)>,
}

impl MetricResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a value. Names are expected to be unique; see [`MetricResult::merge`].
    pub fn push(&mut self, name: &'static str, value: f64) {
        self.values.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|&(n, _)| n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().copied()
    }

    /// True when both results carry the same names in the same order.
    pub fn same_names(&self, other: &MetricResult) -> bool {
        self.values.len() == other.values.len()
            && self.names().zip(other.names()).all(|(a, b)| a == b)
    }

    /// Append all values of `other`. Fails on the first name already present.
    pub fn merge(&mut self, other: MetricResult) -> Result<(), DuplicateName> {
        if let Some(name) = other.names().find(|n| self.get(n).is_some()) {
            return Err(DuplicateName { name });
        }
        self.values.extend(other.values);
        Ok(())
    }
}

impl IntoIterator for MetricResult {
    type Item = (&'static str, f64);
    type IntoIter = std::vec::IntoIter<(&'static str, f64)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Two metric functions produced the same output name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("metric name '{name}' produced by more than one metric function")]
pub struct DuplicateName {
    pub name: &'static str,
}

// ─── Registry ───────────────────────────────────────────────────────

/// The closed set of metric functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// `N` and `N_tumor` case counts.
    Count,
    /// Quadratic-weighted kappa.
    Qwk,
    /// Linear-weighted kappa.
    Lwk,
    /// Exact-match accuracy.
    Acc,
    /// Exact-match accuracy on reference tumor cases (`acc_gg_tumor`).
    AccTumorOnly,
    ScreeningTumor,
    ScreeningGg2,
    ScreeningGg3,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Count,
        Metric::Qwk,
        Metric::Lwk,
        Metric::Acc,
        Metric::AccTumorOnly,
        Metric::ScreeningTumor,
        Metric::ScreeningGg2,
        Metric::ScreeningGg3,
    ];

    /// Metrics computed once on the full data, averaged across runs.
    pub fn default_metrics() -> Vec<Metric> {
        Self::ALL.to_vec()
    }

    /// Metrics that get bootstrapped confidence intervals.
    pub fn default_bootstrapped() -> Vec<Metric> {
        Self::ALL
            .iter()
            .copied()
            .filter(|m| *m != Metric::Count)
            .collect()
    }

    /// Registry name (as used in configuration files).
    pub fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Qwk => "qwk",
            Self::Lwk => "lwk",
            Self::Acc => "acc",
            Self::AccTumorOnly => "acc_tumor_only",
            Self::ScreeningTumor => "screening_tumor",
            Self::ScreeningGg2 => "screening_gg2",
            Self::ScreeningGg3 => "screening_gg3",
        }
    }

    /// Names of the values this metric produces, in output order.
    pub fn output_names(self) -> &'static [&'static str] {
        match self {
            Self::Count => &["N", "N_tumor"],
            Self::Qwk => &["qwk"],
            Self::Lwk => &["lwk"],
            Self::Acc => &["acc"],
            Self::AccTumorOnly => &["acc_gg_tumor"],
            Self::ScreeningTumor => &screening::TUMOR.names,
            Self::ScreeningGg2 => &screening::GG2.names,
            Self::ScreeningGg3 => &screening::GG3.names,
        }
    }

    /// Evaluate on row-aligned grades.
    pub fn compute(self, reference: &[Grade], submission: &[Grade]) -> MetricResult {
        debug_assert_eq!(reference.len(), submission.len());
        match self {
            Self::Count => count(reference),
            Self::Qwk => single(
                "qwk",
                weighted_kappa(reference, submission, KappaWeights::Quadratic),
            ),
            Self::Lwk => single(
                "lwk",
                weighted_kappa(reference, submission, KappaWeights::Linear),
            ),
            Self::Acc => single("acc", accuracy(reference, submission)),
            Self::AccTumorOnly => single("acc_gg_tumor", accuracy_tumor_only(reference, submission)),
            Self::ScreeningTumor => screening::TUMOR.compute(reference, submission),
            Self::ScreeningGg2 => screening::GG2.compute(reference, submission),
            Self::ScreeningGg3 => screening::GG3.compute(reference, submission),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown metric name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric '{0}' (expected one of: count, qwk, lwk, acc, acc_tumor_only, screening_tumor, screening_gg2, screening_gg3)")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

// ─── Individual metric functions ────────────────────────────────────

fn single(name: &'static str, value: f64) -> MetricResult {
    let mut result = MetricResult::with_capacity(1);
    result.push(name, value);
    result
}

fn count(reference: &[Grade]) -> MetricResult {
    let mut result = MetricResult::with_capacity(2);
    result.push("N", reference.len() as f64);
    result.push(
        "N_tumor",
        reference.iter().filter(|g| g.is_tumor()).count() as f64,
    );
    result
}

/// Fraction of exactly matching grades. `NaN` on empty input.
pub fn accuracy(reference: &[Grade], submission: &[Grade]) -> f64 {
    let hits = reference
        .iter()
        .zip(submission)
        .filter(|(r, s)| r == s)
        .count();
    ratio(hits as f64, reference.len() as f64)
}

/// Accuracy restricted to cases whose reference grade is a tumor grade.
pub fn accuracy_tumor_only(reference: &[Grade], submission: &[Grade]) -> f64 {
    let (hits, total) = reference
        .iter()
        .zip(submission)
        .filter(|(r, _)| r.is_tumor())
        .fold((0usize, 0usize), |(hits, total), (r, s)| {
            (hits + usize::from(r == s), total + 1)
        });
    ratio(hits as f64, total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(values: &[u8]) -> Vec<Grade> {
        values.iter().map(|&v| Grade::new(v).unwrap()).collect()
    }

    #[test]
    fn registry_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>().unwrap(), metric);
        }
        assert!("kappa".parse::<Metric>().is_err());
    }

    #[test]
    fn output_names_match_compute() {
        let reference = g(&[0, 1, 2, 3, 4, 5]);
        let submission = g(&[0, 2, 2, 3, 5, 5]);
        for metric in Metric::ALL {
            let names: Vec<&str> = metric.compute(&reference, &submission).names().collect();
            assert_eq!(names, metric.output_names().to_vec(), "{metric}");
        }
    }

    #[test]
    fn output_names_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for metric in Metric::ALL {
            for name in metric.output_names() {
                assert!(seen.insert(*name), "duplicate output name {name}");
            }
        }
    }

    #[test]
    fn identical_labels_are_perfect() {
        let labels = g(&[0, 1, 2, 3, 4, 5, 0, 3]);
        for metric in [Metric::Qwk, Metric::Lwk, Metric::Acc, Metric::AccTumorOnly] {
            for (name, value) in metric.compute(&labels, &labels) {
                assert_eq!(value, 1.0, "{name}");
            }
        }
        for metric in [
            Metric::ScreeningTumor,
            Metric::ScreeningGg2,
            Metric::ScreeningGg3,
        ] {
            let result = metric.compute(&labels, &labels);
            let sens = result.names().find(|n| n.starts_with("sensitivity")).unwrap();
            let spec = result.names().find(|n| n.starts_with("specificity")).unwrap();
            assert_eq!(result.get(sens), Some(1.0));
            assert_eq!(result.get(spec), Some(1.0));
        }
    }

    #[test]
    fn counts_tumor_cases() {
        let result = Metric::Count.compute(&g(&[0, 1, 2]), &g(&[0, 1, 2]));
        assert_eq!(result.get("N"), Some(3.0));
        assert_eq!(result.get("N_tumor"), Some(2.0));
    }

    #[test]
    fn accuracy_with_one_miss() {
        assert_eq!(accuracy(&g(&[0, 0, 1, 2]), &g(&[0, 1, 1, 2])), 0.75);
        assert_eq!(
            accuracy_tumor_only(&g(&[0, 0, 1, 2]), &g(&[0, 1, 1, 2])),
            1.0
        );
    }

    #[test]
    fn tumor_accuracy_without_tumors_is_nan() {
        assert!(accuracy_tumor_only(&g(&[0, 0]), &g(&[1, 0])).is_nan());
    }

    #[test]
    fn merge_rejects_collisions() {
        let mut a = Metric::Acc.compute(&g(&[0]), &g(&[0]));
        let b = Metric::Acc.compute(&g(&[1]), &g(&[1]));
        assert_eq!(a.merge(b), Err(DuplicateName { name: "acc" }));
        let c = Metric::Qwk.compute(&g(&[1, 2]), &g(&[1, 2]));
        assert!(a.merge(c).is_ok());
        assert_eq!(a.names().collect::<Vec<_>>(), vec!["acc", "qwk"]);
    }
}
