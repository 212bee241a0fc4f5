//! GradeLab Core: grade tables, agreement metrics, bootstrap resampling, summaries.
//!
//! This crate contains the statistical heart of the evaluation:
//! - Domain types (grades, cases, aligned grade tables)
//! - Closed registry of agreement/screening metrics over aligned grade sequences
//! - Per-run aggregation (metric averaged across repeated runs)
//! - Bootstrap engine with three rater policies sharing one seeded loop
//! - Summary statistics (mean, percentile CI, boxplot five-number summary)
//!
//! Nothing here touches the filesystem; loading and export live in `gradelab-runner`.

pub mod aggregate;
pub mod domain;
pub mod metrics;
pub mod rng;
pub mod sampling;
pub mod summary;

pub use aggregate::{compute_metric_for_runs, AggregateError};
pub use domain::{Case, Grade, GradeError, GradeTable, TableError};
pub use metrics::{Metric, MetricResult};
pub use sampling::{
    average_performance_over_cases, average_performance_over_cases_and_subjects,
    bootstrap_metric, bootstrap_metrics, BootstrapConfig, Distribution, Execution, RaterPolicy,
    SamplingError,
};
pub use summary::{summarize, BoxplotStats, SummaryResult, SummaryValue};
