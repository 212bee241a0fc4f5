//! Screening metrics: binary classification quality after thresholding grades.
//!
//! Three screening questions are asked of every submission:
//! - tumor vs. benign (grade > 0)
//! - grade group ≥ 2 (grade > 1)
//! - grade group ≥ 3 (grade > 2)
//!
//! Each yields seven ratios from the 2×2 confusion matrix. A zero denominator
//! yields `NaN` (see [`super::ratio`]).

use super::confusion::BinaryConfusion;
use super::{ratio, MetricResult};
use crate::domain::Grade;

/// One screening question: threshold plus the output names for its ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screening {
    pub threshold: u8,
    /// Output names in order: acc, f1, sensitivity, specificity, precision, npv, fnr.
    pub names: [&'static str; 7],
}

pub static TUMOR: Screening = Screening {
    threshold: 0,
    names: [
        "acc_tumor",
        "f1_tumor",
        "sensitivity_tumor",
        "specificity_tumor",
        "precision_tumor",
        "npv_tumor",
        "fnr_tumor",
    ],
};

pub static GG2: Screening = Screening {
    threshold: 1,
    names: [
        "acc_gg2",
        "f1_gg2",
        "sensitivity_gg2",
        "specificity_gg2",
        "precision_gg2",
        "npv_gg2",
        "fnr_gg2",
    ],
};

pub static GG3: Screening = Screening {
    threshold: 2,
    names: [
        "acc_gg3",
        "f1_gg3",
        "sensitivity_gg3",
        "specificity_gg3",
        "precision_gg3",
        "npv_gg3",
        "fnr_gg3",
    ],
};

/// Ratios derived from a 2×2 confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreeningRatios {
    pub accuracy: f64,
    pub f1: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
    pub npv: f64,
    pub fnr: f64,
}

impl ScreeningRatios {
    pub fn from_confusion(cm: &BinaryConfusion) -> Self {
        let tn = cm.tn as f64;
        let fp = cm.fp as f64;
        let fn_ = cm.fn_ as f64;
        let tp = cm.tp as f64;
        Self {
            accuracy: ratio(tp + tn, tp + tn + fp + fn_),
            f1: ratio(2.0 * tp, 2.0 * tp + fp + fn_),
            sensitivity: ratio(tp, tp + fn_),
            specificity: ratio(tn, tn + fp),
            precision: ratio(tp, tp + fp),
            npv: ratio(tn, tn + fn_),
            fnr: ratio(fn_, fn_ + tp),
        }
    }

    fn values(&self) -> [f64; 7] {
        [
            self.accuracy,
            self.f1,
            self.sensitivity,
            self.specificity,
            self.precision,
            self.npv,
            self.fnr,
        ]
    }
}

impl Screening {
    pub fn confusion(&self, reference: &[Grade], submission: &[Grade]) -> BinaryConfusion {
        BinaryConfusion::at_threshold(reference, submission, self.threshold)
    }

    pub fn compute(&self, reference: &[Grade], submission: &[Grade]) -> MetricResult {
        let ratios = ScreeningRatios::from_confusion(&self.confusion(reference, submission));
        let mut result = MetricResult::with_capacity(self.names.len());
        for (name, value) in self.names.iter().copied().zip(ratios.values()) {
            result.push(name, value);
        }
        result
    }
}
