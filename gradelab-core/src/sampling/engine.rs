//! The resampling loop shared by all rater policies.

use std::borrow::Borrow;

use rayon::prelude::*;

use super::distribution::Distribution;
use super::policy::{draw_sample, BootstrapSample, RaterPolicy};
use super::{BootstrapConfig, Execution, SamplingError};
use crate::aggregate::compute_metric_for_runs;
use crate::domain::{Grade, GradeTable};
use crate::metrics::{Metric, MetricResult};
use crate::rng::{seeded, SeedStream};
use crate::summary::{summarize, SummaryResult};

// ─── Entry points ────────────────────────────────────────────────────

/// Bootstrap one metric over a fixed set of runs (all runs every iteration).
pub fn bootstrap_metric<S: Borrow<GradeTable>>(
    metric: Metric,
    reference: &GradeTable,
    submissions: &[S],
    config: &BootstrapConfig,
) -> Result<SummaryResult, SamplingError> {
    bootstrap_metrics(&[metric], reference, submissions, config)
}

/// Bootstrap several metrics over a fixed set of runs, sharing each resample.
pub fn bootstrap_metrics<S: Borrow<GradeTable>>(
    metrics: &[Metric],
    reference: &GradeTable,
    submissions: &[S],
    config: &BootstrapConfig,
) -> Result<SummaryResult, SamplingError> {
    let distribution = run_bootstrap(metrics, reference, submissions, RaterPolicy::FixedSet, config)?;
    Ok(summarize(&distribution))
}

/// Resample cases and pick one submission per iteration to act as "the" rater.
///
/// Estimates the performance of a typical single rater drawn from the cohort.
pub fn average_performance_over_cases<S: Borrow<GradeTable>>(
    metrics: &[Metric],
    reference: &GradeTable,
    submissions: &[S],
    config: &BootstrapConfig,
) -> Result<SummaryResult, SamplingError> {
    let distribution = run_bootstrap(
        metrics,
        reference,
        submissions,
        RaterPolicy::SingleRandom,
        config,
    )?;
    Ok(summarize(&distribution))
}

/// Resample cases and the cohort of submissions (with replacement), averaging
/// the metric across the resampled cohort.
pub fn average_performance_over_cases_and_subjects<S: Borrow<GradeTable>>(
    metrics: &[Metric],
    reference: &GradeTable,
    submissions: &[S],
    config: &BootstrapConfig,
) -> Result<SummaryResult, SamplingError> {
    let distribution = run_bootstrap(
        metrics,
        reference,
        submissions,
        RaterPolicy::ResampledMultiset,
        config,
    )?;
    Ok(summarize(&distribution))
}

/// Run the resampling loop and return the raw distribution.
///
/// Submissions may be in any row order; each is re-indexed by case
/// identifier once, before the loop. Every reference case must be present.
pub fn run_bootstrap<S: Borrow<GradeTable>>(
    metrics: &[Metric],
    reference: &GradeTable,
    submissions: &[S],
    policy: RaterPolicy,
    config: &BootstrapConfig,
) -> Result<Distribution, SamplingError> {
    if metrics.is_empty() {
        return Err(SamplingError::NoMetrics);
    }
    if config.n_bootstraps == 0 {
        return Err(SamplingError::ZeroIterations);
    }

    let prepared = Prepared::new(reference, submissions)?;
    let n_cases = reference.len();
    let n_raters = prepared.raters.len();

    tracing::debug!(
        ?policy,
        ?metrics,
        n_cases,
        n_raters,
        n_bootstraps = config.n_bootstraps,
        seed = config.seed,
        execution = ?config.execution,
        "starting bootstrap"
    );

    let mut distribution = Distribution::with_capacity(config.n_bootstraps);

    match config.execution {
        Execution::Sequential => {
            let mut rng = seeded(config.seed);
            for _ in 0..config.n_bootstraps {
                let sample = draw_sample(n_cases, n_raters, policy, &mut rng);
                distribution.push(prepared.evaluate(metrics, policy, &sample)?)?;
            }
        }
        Execution::Parallel => {
            let stream = SeedStream::new(config.seed);
            let results = (0..config.n_bootstraps)
                .into_par_iter()
                .map(|iteration| {
                    let mut rng = stream.rng_for(iteration as u64);
                    let sample = draw_sample(n_cases, n_raters, policy, &mut rng);
                    prepared.evaluate(metrics, policy, &sample)
                })
                .collect::<Result<Vec<_>, _>>()?;
            for result in results {
                distribution.push(result)?;
            }
        }
    }

    Ok(distribution)
}

// ─── Internals ───────────────────────────────────────────────────────

/// A submission re-indexed onto reference row order.
struct AlignedRater<'a> {
    grades: &'a [Grade],
    /// `rows[i]` is the submission row holding reference case `i`.
    rows: Vec<usize>,
}

impl AlignedRater<'_> {
    fn resample(&self, case_rows: &[usize]) -> Vec<Grade> {
        case_rows
            .iter()
            .map(|&case| self.grades[self.rows[case]])
            .collect()
    }
}

struct Prepared<'a> {
    reference: &'a GradeTable,
    raters: Vec<AlignedRater<'a>>,
}

impl<'a> Prepared<'a> {
    fn new<S: Borrow<GradeTable>>(
        reference: &'a GradeTable,
        submissions: &'a [S],
    ) -> Result<Self, SamplingError> {
        if reference.is_empty() {
            return Err(SamplingError::EmptyReference);
        }
        if submissions.is_empty() {
            return Err(SamplingError::NoSubmissions);
        }

        let mut raters = Vec::with_capacity(submissions.len());
        for (k, submission) in submissions.iter().enumerate() {
            let submission: &'a GradeTable = submission.borrow();
            let index = submission.index_by_id();
            let rows = reference
                .image_ids()
                .iter()
                .map(|id| {
                    index
                        .get(id.as_str())
                        .copied()
                        .ok_or_else(|| SamplingError::MissingCase {
                            submission: k,
                            image_id: id.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            raters.push(AlignedRater {
                grades: submission.grades(),
                rows,
            });
        }

        Ok(Self { reference, raters })
    }

    /// Evaluate every metric on one resample and merge the results.
    fn evaluate(
        &self,
        metrics: &[Metric],
        policy: RaterPolicy,
        sample: &BootstrapSample,
    ) -> Result<MetricResult, SamplingError> {
        let reference = self.reference.select(&sample.case_rows);
        let runs: Vec<Vec<Grade>> = sample
            .raters
            .iter()
            .map(|&k| self.raters[k].resample(&sample.case_rows))
            .collect();

        let mut merged = MetricResult::new();
        for &metric in metrics {
            let result = if policy.averages_raters() {
                compute_metric_for_runs(metric, &reference, runs.iter().map(Vec::as_slice))?
            } else {
                metric.compute(&reference, &runs[0])
            };
            merged.merge(result)?;
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Case;

    fn table(rows: &[(&str, u8)]) -> GradeTable {
        GradeTable::from_cases(
            rows.iter()
                .map(|&(id, g)| Case::new(id, Grade::new(g).unwrap())),
        )
        .unwrap()
    }

    #[test]
    fn validates_inputs() {
        let reference = table(&[("a", 0), ("b", 1)]);
        let empty: Vec<GradeTable> = Vec::new();
        let config = BootstrapConfig::new(10, 1);

        assert_eq!(
            run_bootstrap(&[Metric::Acc], &reference, &empty, RaterPolicy::FixedSet, &config),
            Err(SamplingError::NoSubmissions)
        );
        assert_eq!(
            run_bootstrap(&[], &reference, &[reference.clone()], RaterPolicy::FixedSet, &config),
            Err(SamplingError::NoMetrics)
        );
        assert_eq!(
            run_bootstrap(
                &[Metric::Acc],
                &reference,
                &[reference.clone()],
                RaterPolicy::FixedSet,
                &BootstrapConfig::new(0, 1)
            ),
            Err(SamplingError::ZeroIterations)
        );
        assert_eq!(
            run_bootstrap(
                &[Metric::Acc],
                &GradeTable::default(),
                &[reference.clone()],
                RaterPolicy::FixedSet,
                &config
            ),
            Err(SamplingError::EmptyReference)
        );
    }

    #[test]
    fn missing_case_is_reported() {
        let reference = table(&[("a", 0), ("b", 1)]);
        let partial = table(&[("a", 0)]);
        let err = run_bootstrap(
            &[Metric::Acc],
            &reference,
            &[partial],
            RaterPolicy::SingleRandom,
            &BootstrapConfig::new(5, 1),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SamplingError::MissingCase {
                submission: 0,
                image_id: "b".into()
            }
        );
    }

    #[test]
    fn duplicate_metric_functions_collide() {
        let reference = table(&[("a", 0), ("b", 1)]);
        let err = run_bootstrap(
            &[Metric::Acc, Metric::Acc],
            &reference,
            &[reference.clone()],
            RaterPolicy::FixedSet,
            &BootstrapConfig::new(3, 1),
        )
        .unwrap_err();
        assert!(matches!(err, SamplingError::DuplicateName(_)));
    }

    #[test]
    fn resample_follows_case_identity_not_row_order() {
        // Submission rows are keyed by id; "extra" is ignored.
        let reference = table(&[("a", 0), ("b", 5)]);
        let submission = table(&[("b", 5), ("extra", 3), ("a", 0)]);
        let prepared = Prepared::new(&reference, std::slice::from_ref(&submission)).unwrap();
        let sample = BootstrapSample {
            case_rows: vec![1, 1, 0],
            raters: vec![0],
        };
        let grades: Vec<u8> = prepared.raters[0]
            .resample(&sample.case_rows)
            .iter()
            .map(|g| g.value())
            .collect();
        assert_eq!(grades, vec![5, 5, 0]);
        let result = prepared
            .evaluate(&[Metric::Acc], RaterPolicy::FixedSet, &sample)
            .unwrap();
        assert_eq!(result.get("acc"), Some(1.0));
    }
}
