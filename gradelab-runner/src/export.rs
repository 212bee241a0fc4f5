//! Result export: CSV table, JSON document, confusion matrices.
//!
//! - **CSV** `team_metrics_{n}n.csv`: one row per team and cohort row,
//!   `team_name` and `dataset` first, metric columns in first-seen order,
//!   empty cells where a row lacks a column or a value is undefined
//! - **JSON** `team_metrics_{n}n.json`: the same rows plus run metadata and
//!   per-team failures; undefined values are written as `null`
//! - **Confusion CSV** `confusion_{dataset}_{team}_{run}.csv`: 6×6 counts,
//!   reference grades down, submission grades across

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gradelab_core::metrics::GradeConfusion;
use gradelab_core::{Execution, Grade, Metric, SummaryValue};
use serde::Serialize;

use crate::config::EvaluationConfig;
use crate::evaluation::{EvaluationReport, ResultRow};

// ─── Table ───────────────────────────────────────────────────────────

/// Rows flattened to a shared column set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable<'a> {
    columns: Vec<&'a str>,
    rows: Vec<&'a ResultRow>,
}

impl<'a> ResultTable<'a> {
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ResultRow>,
    {
        let rows: Vec<&ResultRow> = rows.into_iter().collect();
        let mut columns: Vec<&str> = Vec::new();
        for row in &rows {
            for column in row.columns() {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }
        Self { columns, rows }
    }

    /// Header: `team_name`, `dataset`, then metric columns.
    pub fn header(&self) -> Vec<&str> {
        let mut header = vec!["team_name", "dataset"];
        header.extend(self.columns.iter().copied());
        header
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(self.header())?;
        for row in &self.rows {
            let mut record = vec![row.team_name.clone(), row.dataset.clone()];
            record.extend(
                self.columns
                    .iter()
                    .map(|c| row.get(c).map(csv_cell).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }
        let data = wtr.into_inner().context("failed to flush CSV writer")?;
        String::from_utf8(data).context("CSV output is not valid UTF-8")
    }
}

/// Undefined numbers become empty cells so spreadsheet tools read them as missing.
fn csv_cell(value: &SummaryValue) -> String {
    match value {
        SummaryValue::Number(v) if !v.is_finite() => String::new(),
        other => other.to_string(),
    }
}

// ─── JSON ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    dataset: &'a str,
    team: &'a str,
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct ResultsDocument<'a> {
    generated_at: DateTime<Utc>,
    n_bootstraps: usize,
    seed: u64,
    execution: Execution,
    metrics: &'a [Metric],
    bootstrapped_metrics: &'a [Metric],
    rows: Vec<&'a ResultRow>,
    failures: Vec<FailureRecord<'a>>,
}

/// Serialize the report and its run settings to pretty JSON.
pub fn export_json(report: &EvaluationReport, config: &EvaluationConfig) -> Result<String> {
    let document = ResultsDocument {
        generated_at: Utc::now(),
        n_bootstraps: config.n_bootstraps,
        seed: config.seed,
        execution: config.execution,
        metrics: &config.metrics,
        bootstrapped_metrics: &config.bootstrapped_metrics,
        rows: report.rows().collect(),
        failures: report
            .failures()
            .map(|(dataset, f)| FailureRecord {
                dataset,
                team: &f.team,
                error: &f.error,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&document).context("failed to serialize results to JSON")
}

// ─── Confusion matrices ──────────────────────────────────────────────

pub fn export_confusion_csv(matrix: &GradeConfusion) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["reference".to_string()];
    header.extend(Grade::ALL.iter().map(ToString::to_string));
    wtr.write_record(&header)?;

    for (grade, counts) in Grade::ALL.iter().zip(matrix.rows()) {
        let mut record = vec![grade.to_string()];
        record.extend(counts.iter().map(u64::to_string));
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Files ───────────────────────────────────────────────────────────

/// Paths written by [`write_outputs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
    pub confusion: Vec<PathBuf>,
}

/// `team_metrics_{n}n` for `n` bootstrap iterations.
pub fn output_stem(n_bootstraps: usize) -> String {
    format!("team_metrics_{n_bootstraps}n")
}

/// Write the CSV table, the JSON document and any confusion matrices into
/// `output_dir`, creating it if needed.
pub fn write_outputs(
    report: &EvaluationReport,
    config: &EvaluationConfig,
    output_dir: &Path,
) -> Result<OutputPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let stem = output_stem(config.n_bootstraps);

    let csv_path = output_dir.join(format!("{stem}.csv"));
    let table = ResultTable::from_rows(report.rows());
    write_file(&csv_path, &table.to_csv()?)?;

    let json_path = output_dir.join(format!("{stem}.json"));
    write_file(&json_path, &export_json(report, config)?)?;

    let mut confusion = Vec::new();
    for export in report.datasets.iter().flat_map(|d| &d.confusion) {
        let path = output_dir.join(format!(
            "confusion_{}_{}_{}.csv",
            export.dataset, export.team, export.run
        ));
        write_file(&path, &export_confusion_csv(&export.matrix)?)?;
        confusion.push(path);
    }

    tracing::info!(
        csv = %csv_path.display(),
        json = %json_path.display(),
        rows = table.len(),
        confusion_matrices = confusion.len(),
        "output written"
    );
    Ok(OutputPaths {
        csv: csv_path,
        json: json_path,
        confusion,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
