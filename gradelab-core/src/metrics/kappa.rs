//! Weighted Cohen's kappa over the fixed grade domain.
//!
//! κ = 1 − Σ w·O / Σ w·E, with O the observed 6×6 confusion matrix and
//! E[i][j] = rowsum_i · colsum_j / N the matrix expected under independent
//! raters. Labels absent from both raters still occupy a row/column, so the
//! statistic is comparable across resamples that miss some grades.

use serde::{Deserialize, Serialize};

use super::confusion::GradeConfusion;
use super::ratio;
use crate::domain::Grade;

/// Disagreement weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KappaWeights {
    /// w = |i − j|
    Linear,
    /// w = (i − j)²
    Quadratic,
}

impl KappaWeights {
    fn weight(self, i: usize, j: usize) -> f64 {
        let d = i.abs_diff(j) as f64;
        match self {
            Self::Linear => d,
            Self::Quadratic => d * d,
        }
    }
}

/// Weighted kappa between row-aligned grade sequences.
///
/// Returns `NaN` when the expected weighted disagreement is zero (both raters
/// use one and the same label throughout, or the input is empty).
pub fn weighted_kappa(reference: &[Grade], submission: &[Grade], weights: KappaWeights) -> f64 {
    let cm = GradeConfusion::from_pairs(reference, submission);
    let n = cm.total() as f64;
    let rows = cm.row_sums();
    let cols = cm.col_sums();

    let mut observed = 0.0;
    let mut expected = 0.0;
    for (i, row) in cm.rows().iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let w = weights.weight(i, j);
            observed += w * count as f64;
            if n > 0.0 {
                expected += w * (rows[i] as f64 * cols[j] as f64) / n;
            }
        }
    }

    1.0 - ratio(observed, expected)
}
