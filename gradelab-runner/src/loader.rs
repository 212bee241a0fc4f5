//! Reference and submission CSV loading.
//!
//! Both files carry `image_id` and `isup_grade` columns; a reference may also
//! carry `Usage`. Extra columns are ignored. Loaded tables are sorted by
//! `image_id`, and a loaded submission holds exactly the reference's cases in
//! the reference's order, so metric functions can zip grades directly.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use gradelab_core::{Case, Grade, GradeError, GradeTable, TableError};
use serde::Deserialize;
use thiserror::Error;

use crate::discovery::RunPath;

/// Input-integrity errors. Any of these rejects the whole team.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file does not exist: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: row {row}: {source}", path.display())]
    InvalidGrade {
        path: PathBuf,
        row: usize,
        #[source]
        source: GradeError,
    },

    #[error("{}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("{}: no 'Usage' column to filter on (wanted '{usage}')", path.display())]
    MissingUsageColumn { path: PathBuf, usage: String },

    #[error("{}: no prediction for {missing} reference case(s), first '{first}'", path.display())]
    MissingCases {
        path: PathBuf,
        missing: usize,
        first: String,
    },

    #[error("{}: case identifiers do not line up with the reference", path.display())]
    Misaligned { path: PathBuf },

    #[error("no runs to load")]
    NoRuns,
}

/// A submission run aligned with its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRun {
    pub run: String,
    pub path: PathBuf,
    pub table: GradeTable,
}

#[derive(Debug, Deserialize)]
struct GradeRow {
    image_id: String,
    isup_grade: i64,
    #[serde(rename = "Usage", default)]
    usage: Option<String>,
}

// ─── Reading ─────────────────────────────────────────────────────────

struct RawFile {
    rows: Vec<GradeRow>,
    has_usage: bool,
}

fn read_rows(path: &Path) -> Result<RawFile, LoadError> {
    if !path.is_file() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let has_usage = reader.headers().map_err(csv_err)?.iter().any(|h| h == "Usage");
    let rows = reader
        .deserialize()
        .collect::<Result<Vec<GradeRow>, _>>()
        .map_err(csv_err)?;
    Ok(RawFile { rows, has_usage })
}

fn to_table<'a, I>(path: &Path, rows: I) -> Result<GradeTable, LoadError>
where
    I: IntoIterator<Item = (usize, &'a GradeRow)>,
{
    let cases = rows
        .into_iter()
        .map(|(row, r)| {
            Grade::try_from(r.isup_grade)
                .map(|grade| Case::new(r.image_id.clone(), grade))
                .map_err(|source| LoadError::InvalidGrade {
                    path: path.to_path_buf(),
                    row: row + 1,
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    GradeTable::from_cases(cases).map_err(|source| LoadError::Table {
        path: path.to_path_buf(),
        source,
    })
}

// ─── Public API ──────────────────────────────────────────────────────

/// Load a reference file, keeping rows that match `usage` and, when non-empty,
/// the `image_ids` allow-list.
pub fn load_reference(
    path: &Path,
    usage: Option<&str>,
    image_ids: Option<&[String]>,
) -> Result<GradeTable, LoadError> {
    let raw = read_rows(path)?;

    if let Some(usage) = usage {
        if !raw.has_usage {
            return Err(LoadError::MissingUsageColumn {
                path: path.to_path_buf(),
                usage: usage.to_string(),
            });
        }
    }
    let allowed: Option<HashSet<&str>> = image_ids
        .filter(|ids| !ids.is_empty())
        .map(|ids| ids.iter().map(String::as_str).collect());

    let kept = raw.rows.iter().enumerate().filter(|(_, r)| {
        usage.map_or(true, |u| r.usage.as_deref() == Some(u))
            && allowed
                .as_ref()
                .map_or(true, |ids| ids.contains(r.image_id.as_str()))
    });
    let table = to_table(path, kept)?;

    tracing::debug!(
        path = %path.display(),
        rows = raw.rows.len(),
        cases = table.len(),
        "loaded reference"
    );
    Ok(table)
}

/// Load one submission run aligned with `reference`.
///
/// Every reference case must be predicted. Predictions for other cases are
/// dropped before grades are validated.
pub fn load_submission(path: &Path, reference: &GradeTable) -> Result<GradeTable, LoadError> {
    let raw = read_rows(path)?;

    let submitted: HashSet<&str> = raw.rows.iter().map(|r| r.image_id.as_str()).collect();
    let mut missing = reference
        .image_ids()
        .iter()
        .filter(|id| !submitted.contains(id.as_str()));
    if let Some(first) = missing.next() {
        return Err(LoadError::MissingCases {
            path: path.to_path_buf(),
            missing: 1 + missing.count(),
            first: first.clone(),
        });
    }

    let kept = raw
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| reference.contains(&r.image_id));
    let table = to_table(path, kept)?;

    if table.image_ids() != reference.image_ids() {
        return Err(LoadError::Misaligned {
            path: path.to_path_buf(),
        });
    }
    Ok(table)
}

/// Load all runs of a team. Fails on the first missing or invalid run.
pub fn load_runs(runs: &[RunPath], reference: &GradeTable) -> Result<Vec<LoadedRun>, LoadError> {
    if runs.is_empty() {
        return Err(LoadError::NoRuns);
    }
    if let Some(absent) = runs.iter().find(|r| !r.path.is_file()) {
        return Err(LoadError::MissingFile {
            path: absent.path.clone(),
        });
    }

    runs.iter()
        .map(|r| {
            Ok(LoadedRun {
                run: r.run.clone(),
                path: r.path.clone(),
                table: load_submission(&r.path, reference)?,
            })
        })
        .collect()
}
