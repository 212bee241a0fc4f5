//! Case-aligned grade tables.
//!
//! A `GradeTable` is the in-memory form of a reference standard or of one
//! submission run: rows sorted by `image_id`, no duplicate identifiers. Once
//! built it is immutable; resampling never copies identifiers, it works on
//! row positions into the grade column.

use std::collections::HashMap;

use thiserror::Error;

use super::grade::Grade;

/// Errors building a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("duplicate case identifier '{image_id}'")]
    DuplicateCase { image_id: String },
}

/// One evaluation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub image_id: String,
    pub isup_grade: Grade,
}

impl Case {
    pub fn new(image_id: impl Into<String>, isup_grade: Grade) -> Self {
        Self {
            image_id: image_id.into(),
            isup_grade,
        }
    }
}

/// Grades keyed by case identifier, sorted by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeTable {
    image_ids: Vec<String>,
    grades: Vec<Grade>,
}

impl GradeTable {
    /// Build a table from cases in any order. Rows are sorted by `image_id`;
    /// a repeated identifier is rejected.
    pub fn from_cases<I>(cases: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Case>,
    {
        let mut cases: Vec<Case> = cases.into_iter().collect();
        cases.sort_by(|a, b| a.image_id.cmp(&b.image_id));

        if let Some(pair) = cases.windows(2).find(|w| w[0].image_id == w[1].image_id) {
            return Err(TableError::DuplicateCase {
                image_id: pair[0].image_id.clone(),
            });
        }

        let (image_ids, grades) = cases
            .into_iter()
            .map(|c| (c.image_id, c.isup_grade))
            .unzip();
        Ok(Self { image_ids, grades })
    }

    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn image_ids(&self) -> &[String] {
        &self.image_ids
    }

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.image_ids
            .binary_search_by(|id| id.as_str().cmp(image_id))
            .is_ok()
    }

    /// Iterate rows as `(image_id, grade)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Grade)> + '_ {
        self.image_ids
            .iter()
            .map(String::as_str)
            .zip(self.grades.iter().copied())
    }

    /// Identifier → row position lookup.
    pub fn index_by_id(&self) -> HashMap<&str, usize> {
        self.image_ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.as_str(), row))
            .collect()
    }

    /// Grades at the given row positions, repeats included.
    pub fn select(&self, rows: &[usize]) -> Vec<Grade> {
        rows.iter().map(|&r| self.grades[r]).collect()
    }
}
