//! Summary statistics: collapse a bootstrap distribution into flat fields.
//!
//! For every metric `m` the summary holds, in order:
//! - `m_mean`, `m_cilow` (2.5th percentile), `m_cihigh` (97.5th percentile)
//! - `m_bxp_{mean,iqr,cilo,cihi,whishi,whislo,fliers,q1,med,q3}` boxplot fields
//!
//! Fliers are joined with `;` so the summary fits a flat table row. A metric
//! whose distribution contains `NaN` gets `NaN` in every numeric field.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::sampling::Distribution;

/// Lower and upper percentile of the reported confidence interval.
pub const CI_LOW_PERCENTILE: f64 = 2.5;
pub const CI_HIGH_PERCENTILE: f64 = 97.5;

/// Whisker reach as a multiple of the interquartile range.
pub const WHISKER_REACH: f64 = 1.5;

// ─── Field values ────────────────────────────────────────────────────

/// One summary field: numeric, or the joined flier list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Number(f64),
    Text(String),
}

impl SummaryValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for SummaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered derived-field name → value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryResult {
    fields: Vec<(String, SummaryValue)>,
}

impl SummaryResult {
    pub fn get(&self, field: &str) -> Option<&SummaryValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Numeric field value; `None` for missing or text fields.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(SummaryValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SummaryValue)> + '_ {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn push(&mut self, name: String, value: SummaryValue) {
        self.fields.push((name, value));
    }

    fn push_number(&mut self, metric: &str, suffix: &str, value: f64) {
        self.push(format!("{metric}_{suffix}"), SummaryValue::Number(value));
    }
}

impl IntoIterator for SummaryResult {
    type Item = (String, SummaryValue);
    type IntoIter = std::vec::IntoIter<(String, SummaryValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Serialize for SummaryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ─── Boxplot statistics ──────────────────────────────────────────────

/// Five-number summary plus notch interval and outliers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxplotStats {
    pub mean: f64,
    pub iqr: f64,
    /// Lower notch bound: med − 1.57·iqr/√n.
    pub cilo: f64,
    /// Upper notch bound: med + 1.57·iqr/√n.
    pub cihi: f64,
    pub whishi: f64,
    pub whislo: f64,
    /// Values outside the whiskers: low ones first, each group in input order.
    pub fliers: Vec<f64>,
    pub q1: f64,
    pub med: f64,
    pub q3: f64,
}

impl BoxplotStats {
    /// Compute from values in distribution order. Any `NaN` (or empty input)
    /// yields [`BoxplotStats::undefined`].
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() || values.iter().any(|v| v.is_nan()) {
            return Self::undefined();
        }

        let sorted = sorted_copy(values);
        let q1 = percentile_sorted(&sorted, 25.0);
        let med = percentile_sorted(&sorted, 50.0);
        let q3 = percentile_sorted(&sorted, 75.0);
        let iqr = q3 - q1;

        let notch = 1.57 * iqr / (values.len() as f64).sqrt();

        let hi_reach = q3 + WHISKER_REACH * iqr;
        let whishi = values
            .iter()
            .copied()
            .filter(|&v| v <= hi_reach)
            .fold(f64::NEG_INFINITY, f64::max);
        let whishi = if whishi == f64::NEG_INFINITY || whishi < q3 {
            q3
        } else {
            whishi
        };

        let lo_reach = q1 - WHISKER_REACH * iqr;
        let whislo = values
            .iter()
            .copied()
            .filter(|&v| v >= lo_reach)
            .fold(f64::INFINITY, f64::min);
        let whislo = if whislo == f64::INFINITY || whislo > q1 {
            q1
        } else {
            whislo
        };

        let fliers = values
            .iter()
            .copied()
            .filter(|&v| v < whislo)
            .chain(values.iter().copied().filter(|&v| v > whishi))
            .collect();

        Self {
            mean: mean(values),
            iqr,
            cilo: med - notch,
            cihi: med + notch,
            whishi,
            whislo,
            fliers,
            q1,
            med,
            q3,
        }
    }

    /// All numeric fields `NaN`, no fliers.
    pub fn undefined() -> Self {
        Self {
            mean: f64::NAN,
            iqr: f64::NAN,
            cilo: f64::NAN,
            cihi: f64::NAN,
            whishi: f64::NAN,
            whislo: f64::NAN,
            fliers: Vec::new(),
            q1: f64::NAN,
            med: f64::NAN,
            q3: f64::NAN,
        }
    }

    /// Fliers joined with `;`, each written with at least one decimal.
    pub fn fliers_joined(&self) -> String {
        self.fliers
            .iter()
            .map(|v| format!("{v:?}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

// ─── Summaries ───────────────────────────────────────────────────────

/// Summarize every metric of a distribution, in distribution order.
pub fn summarize(distribution: &Distribution) -> SummaryResult {
    let mut summary = SummaryResult::default();
    for (metric, values) in distribution.iter() {
        let undefined = values.iter().filter(|v| v.is_nan()).count();
        if undefined > 0 {
            tracing::warn!(
                metric,
                undefined,
                iterations = values.len(),
                "undefined values in bootstrap distribution; summary fields are NaN"
            );
        }
        summarize_series(&mut summary, metric, values);
    }
    summary
}

fn summarize_series(summary: &mut SummaryResult, metric: &str, values: &[f64]) {
    let (ci_low, ci_high) = if values.iter().any(|v| v.is_nan()) {
        (f64::NAN, f64::NAN)
    } else {
        let sorted = sorted_copy(values);
        (
            percentile_sorted(&sorted, CI_LOW_PERCENTILE),
            percentile_sorted(&sorted, CI_HIGH_PERCENTILE),
        )
    };

    summary.push_number(metric, "mean", mean(values));
    summary.push_number(metric, "cilow", ci_low);
    summary.push_number(metric, "cihigh", ci_high);

    let bxp = BoxplotStats::from_values(values);
    summary.push_number(metric, "bxp_mean", bxp.mean);
    summary.push_number(metric, "bxp_iqr", bxp.iqr);
    summary.push_number(metric, "bxp_cilo", bxp.cilo);
    summary.push_number(metric, "bxp_cihi", bxp.cihi);
    summary.push_number(metric, "bxp_whishi", bxp.whishi);
    summary.push_number(metric, "bxp_whislo", bxp.whislo);
    summary.push(
        format!("{metric}_bxp_fliers"),
        SummaryValue::Text(bxp.fliers_joined()),
    );
    summary.push_number(metric, "bxp_q1", bxp.q1);
    summary.push_number(metric, "bxp_med", bxp.med);
    summary.push_number(metric, "bxp_q3", bxp.q3);
}

// ─── Primitives ──────────────────────────────────────────────────────

/// Arithmetic mean; `NaN` on empty input or if any value is `NaN`.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile of unsorted values using linear interpolation.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    percentile_sorted(&sorted_copy(values), p)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Percentile of a sorted slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
