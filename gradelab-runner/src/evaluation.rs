//! Cross-team evaluation pipeline.
//!
//! For each configured dataset:
//! 1. discover team runs (restricted to the team registry when present)
//! 2. load the reference
//! 3. evaluate every team on a private rayon pool: per-run averaged metrics on
//!    the full data, then bootstrapped summaries over cases
//! 4. collect each successful team's first run and bootstrap the two cohort
//!    rows, `average_cases` and `average_cases_algorithms`
//! 5. optionally build a confusion matrix per team from its first run
//!
//! A team that fails to load or evaluate is recorded in the dataset report and
//! does not stop the others.

use std::path::{Path, PathBuf};

use gradelab_core::metrics::GradeConfusion;
use gradelab_core::{
    average_performance_over_cases, average_performance_over_cases_and_subjects,
    bootstrap_metrics, compute_metric_for_runs, AggregateError, GradeTable, MetricResult,
    SamplingError, SummaryResult, SummaryValue,
};
use rayon::prelude::*;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::config::{DatasetConfig, EvaluationConfig};
use crate::discovery::{retrieve_team_submissions_for_dataset, DiscoveryError, RunPath};
use crate::loader::{load_reference, load_runs, LoadError, LoadedRun};

/// Team name of the single-rater cohort row.
pub const AVERAGE_CASES: &str = "average_cases";
/// Team name of the resampled-raters cohort row.
pub const AVERAGE_CASES_ALGORITHMS: &str = "average_cases_algorithms";

// ─── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("dataset '{dataset}': failed to load reference: {source}")]
    Reference {
        dataset: String,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error("column '{column}' produced twice in one result row")]
    DuplicateColumn { column: String },

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

// ─── Result rows ─────────────────────────────────────────────────────

/// One output row: `team_name`, `dataset`, then metric columns in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub team_name: String,
    pub dataset: String,
    fields: Vec<(String, SummaryValue)>,
}

impl ResultRow {
    pub fn new(team_name: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            dataset: dataset.into(),
            fields: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        column: impl Into<String>,
        value: SummaryValue,
    ) -> Result<(), EvaluationError> {
        let column = column.into();
        if column == "team_name" || column == "dataset" || self.get(&column).is_some() {
            return Err(EvaluationError::DuplicateColumn { column });
        }
        self.fields.push((column, value));
        Ok(())
    }

    pub fn push_metrics(&mut self, result: &MetricResult) -> Result<(), EvaluationError> {
        for (name, value) in result.iter() {
            self.push(name, SummaryValue::Number(value))?;
        }
        Ok(())
    }

    pub fn push_summary(&mut self, summary: SummaryResult) -> Result<(), EvaluationError> {
        for (name, value) in summary {
            self.push(name, value)?;
        }
        Ok(())
    }

    pub fn get(&self, column: &str) -> Option<&SummaryValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(SummaryValue::as_f64)
    }

    /// Metric columns in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        map.serialize_entry("team_name", &self.team_name)?;
        map.serialize_entry("dataset", &self.dataset)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ─── Reports ─────────────────────────────────────────────────────────

/// A team's row plus the run used for cohort statistics.
#[derive(Debug, Clone)]
pub struct TeamEvaluation {
    pub team: String,
    pub row: ResultRow,
    pub runs: Vec<LoadedRun>,
    /// Index into `runs` of the first run.
    pub first_run: usize,
}

impl TeamEvaluation {
    pub fn first(&self) -> &LoadedRun {
        &self.runs[self.first_run]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamFailure {
    pub team: String,
    pub error: String,
}

/// 6×6 confusion matrix of one team's first run against the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionExport {
    pub dataset: String,
    pub team: String,
    pub run: String,
    pub matrix: GradeConfusion,
}

#[derive(Debug, Clone, Default)]
pub struct DatasetReport {
    pub dataset: String,
    pub rows: Vec<ResultRow>,
    pub failures: Vec<TeamFailure>,
    pub confusion: Vec<ConfusionExport>,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    pub datasets: Vec<DatasetReport>,
}

impl EvaluationReport {
    /// Every row across datasets, in evaluation order.
    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> + '_ {
        self.datasets.iter().flat_map(|d| d.rows.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &TeamFailure)> + '_ {
        self.datasets
            .iter()
            .flat_map(|d| d.failures.iter().map(move |f| (d.dataset.as_str(), f)))
    }
}

/// Callbacks for long evaluations.
pub trait EvaluationProgress: Sync {
    /// Called before the teams of a dataset are evaluated.
    fn on_dataset_start(&self, dataset: &str, teams: usize);

    /// Called from worker threads as each team finishes.
    fn on_team_complete(&self, dataset: &str, team: &str, succeeded: bool);

    /// Called after the cohort rows of a dataset are done.
    fn on_dataset_complete(&self, dataset: &str, succeeded: usize, failed: usize);
}

/// Where submissions and references live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Root of `{team}/{dataset}/{run}/{submission}.csv`.
    pub submissions: PathBuf,
    /// Directory holding reference files.
    pub references: PathBuf,
}

impl Workspace {
    /// `{base}/algorithms` and `{base}/reference`.
    pub fn from_base_dir(base: &Path) -> Self {
        Self {
            submissions: base.join("algorithms"),
            references: base.join("reference"),
        }
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Evaluate one team: load its runs, average the unconditional metrics over
/// runs, and bootstrap the rest.
pub fn evaluate_team(
    team: &str,
    dataset: &str,
    runs: &[RunPath],
    reference: &GradeTable,
    config: &EvaluationConfig,
) -> Result<TeamEvaluation, EvaluationError> {
    let runs = load_runs(runs, reference)?;
    let mut row = ResultRow::new(team, dataset);

    for &metric in &config.metrics {
        let result =
            compute_metric_for_runs(metric, reference.grades(), runs.iter().map(|r| r.table.grades()))?;
        row.push_metrics(&result)?;
    }

    if !config.bootstrapped_metrics.is_empty() {
        let tables: Vec<&GradeTable> = runs.iter().map(|r| &r.table).collect();
        let summary = bootstrap_metrics(
            &config.bootstrapped_metrics,
            reference,
            &tables,
            &config.bootstrap_config(),
        )?;
        row.push_summary(summary)?;
    }

    let first_run = first_run_index(&runs);
    tracing::debug!(team, dataset, runs = runs.len(), first = %runs[first_run].run, "team evaluated");

    Ok(TeamEvaluation {
        team: team.to_string(),
        row,
        runs,
        first_run,
    })
}

/// Index of the run whose id contains `run1` or `rep1`, else 0.
pub fn first_run_index(runs: &[LoadedRun]) -> usize {
    runs.iter()
        .position(|r| r.run.contains("run1") || r.run.contains("rep1"))
        .unwrap_or(0)
}

/// Evaluate every discovered team of one dataset, then the cohort rows.
pub fn evaluate_dataset(
    name: &str,
    dataset: &DatasetConfig,
    config: &EvaluationConfig,
    workspace: &Workspace,
    pool: &rayon::ThreadPool,
    progress: Option<&dyn EvaluationProgress>,
) -> Result<DatasetReport, EvaluationError> {
    tracing::info!(dataset = name, "computing metrics");

    let mut teams = retrieve_team_submissions_for_dataset(
        &workspace.submissions,
        &dataset.dir,
        &config.submission_file,
    )?;
    teams.retain(|team, _| {
        let keep = config.selects_team(team);
        if !keep {
            tracing::debug!(team = team.as_str(), "not in team registry, skipped");
        }
        keep
    });

    let reference_path = workspace.references.join(&dataset.reference);
    let reference = load_reference(
        &reference_path,
        dataset.usage.as_deref(),
        dataset.image_id_filter(),
    )
    .map_err(|source| EvaluationError::Reference {
        dataset: name.to_string(),
        source,
    })?;
    tracing::info!(dataset = name, cases = reference.len(), teams = teams.len(), "reference loaded");

    if let Some(p) = progress {
        p.on_dataset_start(name, teams.len());
    }

    let outcomes: Vec<(String, Result<TeamEvaluation, EvaluationError>)> = pool.install(|| {
        teams
            .par_iter()
            .map(|(team, runs)| {
                let outcome = evaluate_team(team, name, runs, &reference, config);
                if let Some(p) = progress {
                    p.on_team_complete(name, team, outcome.is_ok());
                }
                (team.clone(), outcome)
            })
            .collect()
    });

    let mut report = DatasetReport {
        dataset: name.to_string(),
        ..DatasetReport::default()
    };
    let mut evaluated = Vec::with_capacity(outcomes.len());
    for (team, outcome) in outcomes {
        match outcome {
            Ok(evaluation) => evaluated.push(evaluation),
            Err(e) => {
                tracing::warn!(dataset = name, team = team.as_str(), error = %e, "team evaluation failed");
                report.failures.push(TeamFailure {
                    team,
                    error: e.to_string(),
                });
            }
        }
    }

    report.rows.extend(evaluated.iter().map(|e| e.row.clone()));

    if evaluated.is_empty() {
        tracing::warn!(dataset = name, "no team evaluated successfully, skipping cohort rows");
    } else if !config.bootstrapped_metrics.is_empty() {
        tracing::info!(
            dataset = name,
            teams = evaluated.len(),
            "computing average performance of the cohort over teams and cases"
        );
        let first_runs: Vec<&GradeTable> = evaluated.iter().map(|e| &e.first().table).collect();
        let bootstrap = config.bootstrap_config();

        let mut cases = ResultRow::new(AVERAGE_CASES, name);
        cases.push_summary(average_performance_over_cases(
            &config.bootstrapped_metrics,
            &reference,
            &first_runs,
            &bootstrap,
        )?)?;
        report.rows.push(cases);

        let mut algorithms = ResultRow::new(AVERAGE_CASES_ALGORITHMS, name);
        algorithms.push_summary(average_performance_over_cases_and_subjects(
            &config.bootstrapped_metrics,
            &reference,
            &first_runs,
            &bootstrap,
        )?)?;
        report.rows.push(algorithms);
    }

    if dataset.generate_confusion_matrix {
        report.confusion = evaluated
            .iter()
            .map(|e| {
                let first = e.first();
                ConfusionExport {
                    dataset: name.to_string(),
                    team: e.team.clone(),
                    run: first.run.clone(),
                    matrix: GradeConfusion::from_pairs(reference.grades(), first.table.grades()),
                }
            })
            .collect();
    }

    if let Some(p) = progress {
        p.on_dataset_complete(name, evaluated.len(), report.failures.len());
    }
    tracing::info!(
        dataset = name,
        succeeded = evaluated.len(),
        failed = report.failures.len(),
        "dataset complete"
    );
    Ok(report)
}

/// Evaluate every configured dataset, in name order, on a pool of
/// `config.pool_size` workers.
pub fn evaluate_all(
    config: &EvaluationConfig,
    workspace: &Workspace,
    progress: Option<&dyn EvaluationProgress>,
) -> Result<EvaluationReport, EvaluationError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.pool_size)
        .thread_name(|i| format!("gradelab-pool-{i}"))
        .build()?;

    let mut report = EvaluationReport::default();
    for (name, dataset) in &config.datasets {
        report
            .datasets
            .push(evaluate_dataset(name, dataset, config, workspace, &pool, progress)?);
    }

    tracing::info!(
        rows = report.rows().count(),
        failures = report.failures().count(),
        "completed all datasets"
    );
    Ok(report)
}
