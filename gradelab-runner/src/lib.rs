//! GradeLab Runner: submission discovery, loading, cross-team evaluation, export.
//!
//! This crate builds on `gradelab-core` to provide:
//! - TOML evaluation configuration (datasets, team registry, metric lists)
//! - Discovery of `{team}/{dataset}/{run}/{submission}.csv` trees
//! - Reference and submission loading with input-integrity checks
//! - Per-team evaluation on a private rayon pool, plus cohort rows
//! - CSV, JSON and confusion-matrix export

pub mod config;
pub mod discovery;
pub mod evaluation;
pub mod export;
pub mod loader;

pub use config::{ConfigError, DatasetConfig, EvaluationConfig, TeamConfig};
pub use discovery::{
    retrieve_team_submissions, retrieve_team_submissions_for_dataset, DiscoveryError, RunPath,
    TeamDatasetRuns, TeamRuns,
};
pub use evaluation::{
    evaluate_all, evaluate_dataset, evaluate_team, first_run_index, ConfusionExport,
    DatasetReport, EvaluationError, EvaluationProgress, EvaluationReport, ResultRow,
    TeamEvaluation, TeamFailure, Workspace, AVERAGE_CASES, AVERAGE_CASES_ALGORITHMS,
};
pub use export::{
    export_confusion_csv, export_json, output_stem, write_outputs, OutputPaths, ResultTable,
};
pub use loader::{load_reference, load_runs, load_submission, LoadError, LoadedRun};
