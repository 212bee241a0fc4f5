//! Bootstrap engine: seeded case resampling under three rater policies.
//!
//! Every policy runs the same loop: draw `len(reference)` case rows with
//! replacement, draw the backing submission(s), evaluate the metric
//! functions on the row-aligned resample, append to a [`Distribution`], and
//! finally summarize. Policies differ only in the rater draw:
//!
//! | entry point                                     | raters per iteration            |
//! |-------------------------------------------------|---------------------------------|
//! | [`bootstrap_metric`] / [`bootstrap_metrics`]    | all runs, averaged              |
//! | [`average_performance_over_cases`]              | one submission, drawn uniformly |
//! | [`average_performance_over_cases_and_subjects`] | k draws with replacement, averaged |
//!
//! Reproducibility: with [`Execution::Sequential`] one `StdRng` is seeded once
//! before the loop and drawn from in a fixed order (cases, then raters).
//! [`Execution::Parallel`] derives one generator per iteration instead (see
//! [`crate::rng::SeedStream`]); it is reproducible too, but yields a
//! different stream than sequential execution for the same seed.

pub mod distribution;
pub mod engine;
pub mod policy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::metrics::DuplicateName;

pub use distribution::Distribution;
pub use engine::{
    average_performance_over_cases, average_performance_over_cases_and_subjects,
    bootstrap_metric, bootstrap_metrics, run_bootstrap,
};
pub use policy::{draw_sample, BootstrapSample, RaterPolicy};

// ─── Configuration ───────────────────────────────────────────────────

/// How bootstrap iterations are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// One generator, iterations in order.
    #[default]
    Sequential,
    /// One derived generator per iteration, iterations on the rayon pool.
    Parallel,
}

/// Configuration for one bootstrap call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Number of resampling iterations (default 5000).
    pub n_bootstraps: usize,
    /// RNG seed for reproducibility (default 42).
    pub seed: u64,
    #[serde(default)]
    pub execution: Execution,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_bootstraps: 5000,
            seed: 42,
            execution: Execution::Sequential,
        }
    }
}

impl BootstrapConfig {
    pub fn new(n_bootstraps: usize, seed: u64) -> Self {
        Self {
            n_bootstraps,
            seed,
            execution: Execution::Sequential,
        }
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from the bootstrap engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SamplingError {
    #[error("reference has no cases to resample")]
    EmptyReference,
    #[error("no submissions to resample")]
    NoSubmissions,
    #[error("no metric functions given")]
    NoMetrics,
    #[error("n_bootstraps must be positive")]
    ZeroIterations,
    #[error("submission {submission} has no row for reference case '{image_id}'")]
    MissingCase { submission: usize, image_id: String },
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    DuplicateName(#[from] DuplicateName),
    #[error("iteration {iteration} produced metrics {found:?}, expected {expected:?}")]
    InconsistentMetrics {
        iteration: usize,
        expected: Vec<&'static str>,
        found: Vec<&'static str>,
    },
}
