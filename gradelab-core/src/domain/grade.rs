//! ISUP grade newtype.
//!
//! Grades live in the fixed ordinal domain 0..=5, where 0 means benign and
//! 1..=5 are increasingly severe tumor grades. The domain is closed so kappa
//! confusion matrices always have the same 6×6 shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors constructing a grade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("isup_grade {value} is outside the label domain 0..=5")]
    OutOfRange { value: i64 },
}

/// An ISUP grade in 0..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Grade(u8);

impl Grade {
    /// Number of labels in the domain.
    pub const COUNT: usize = 6;

    /// Highest valid grade.
    pub const MAX: u8 = 5;

    /// Every grade in ascending order.
    pub const ALL: [Grade; Grade::COUNT] = [
        Grade(0),
        Grade(1),
        Grade(2),
        Grade(3),
        Grade(4),
        Grade(5),
    ];

    pub fn new(value: u8) -> Result<Self, GradeError> {
        if value > Self::MAX {
            return Err(GradeError::OutOfRange {
                value: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Row/column index into a 6×6 confusion matrix.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// True for any tumor grade (> 0).
    pub fn is_tumor(self) -> bool {
        self.0 > 0
    }

    /// Binarize at a threshold: positive when strictly above it.
    pub fn exceeds(self, threshold: u8) -> bool {
        self.0 > threshold
    }
}

impl TryFrom<i64> for Grade {
    type Error = GradeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(v) if v <= Self::MAX => Ok(Self(v)),
            _ => Err(GradeError::OutOfRange { value }),
        }
    }
}

impl TryFrom<u8> for Grade {
    type Error = GradeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
