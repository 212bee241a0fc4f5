//! Confusion matrices over the grade domain.

use crate::domain::Grade;

/// 6×6 confusion matrix: rows are reference grades, columns submission grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GradeConfusion {
    counts: [[u64; Grade::COUNT]; Grade::COUNT],
}

impl GradeConfusion {
    /// Count row-aligned (reference, submission) pairs.
    pub fn from_pairs(reference: &[Grade], submission: &[Grade]) -> Self {
        debug_assert_eq!(reference.len(), submission.len());
        let mut counts = [[0u64; Grade::COUNT]; Grade::COUNT];
        for (r, s) in reference.iter().zip(submission) {
            counts[r.index()][s.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, reference: Grade, submission: Grade) -> u64 {
        self.counts[reference.index()][submission.index()]
    }

    pub fn rows(&self) -> &[[u64; Grade::COUNT]; Grade::COUNT] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Reference-label marginals.
    pub fn row_sums(&self) -> [u64; Grade::COUNT] {
        let mut sums = [0u64; Grade::COUNT];
        for (i, row) in self.counts.iter().enumerate() {
            sums[i] = row.iter().sum();
        }
        sums
    }

    /// Submission-label marginals.
    pub fn col_sums(&self) -> [u64; Grade::COUNT] {
        let mut sums = [0u64; Grade::COUNT];
        for row in &self.counts {
            for (j, &c) in row.iter().enumerate() {
                sums[j] += c;
            }
        }
        sums
    }
}

/// 2×2 confusion counts after binarizing both sides at a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryConfusion {
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tp: u64,
}

impl BinaryConfusion {
    /// Positive means grade strictly greater than `threshold`.
    pub fn at_threshold(reference: &[Grade], submission: &[Grade], threshold: u8) -> Self {
        debug_assert_eq!(reference.len(), submission.len());
        let mut cm = Self::default();
        for (r, s) in reference.iter().zip(submission) {
            match (r.exceeds(threshold), s.exceeds(threshold)) {
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
                (true, true) => cm.tp += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_ + self.tp
    }
}
