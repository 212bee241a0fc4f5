//! Per-run aggregation: one metric averaged across a team's repeated runs.

use thiserror::Error;

use crate::domain::Grade;
use crate::metrics::{Metric, MetricResult};

/// Errors from aggregating a metric across runs. Both indicate a caller bug,
/// not a data problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("no runs to average for metric '{metric}'")]
    NoRuns { metric: &'static str },
    #[error("metric '{metric}' returned {found:?} for run {run}, expected {expected:?}")]
    InconsistentKeys {
        metric: &'static str,
        run: usize,
        expected: Vec<&'static str>,
        found: Vec<&'static str>,
    },
}

/// Compute `metric` on every run and average each output across runs.
///
/// All runs must be row-aligned with `reference`. Output names keep the order
/// of the first run's result.
pub fn compute_metric_for_runs<'a, I>(
    metric: Metric,
    reference: &[Grade],
    runs: I,
) -> Result<MetricResult, AggregateError>
where
    I: IntoIterator<Item = &'a [Grade]>,
{
    let results: Vec<MetricResult> = runs
        .into_iter()
        .map(|run| metric.compute(reference, run))
        .collect();
    mean_of_results(metric.name(), &results)
}

/// Element-wise mean of per-run results that share one name set.
pub(crate) fn mean_of_results(
    metric: &'static str,
    results: &[MetricResult],
) -> Result<MetricResult, AggregateError> {
    let first = results.first().ok_or(AggregateError::NoRuns { metric })?;

    if let Some((run, bad)) = results
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, r)| !r.same_names(first))
    {
        return Err(AggregateError::InconsistentKeys {
            metric,
            run,
            expected: first.names().collect(),
            found: bad.names().collect(),
        });
    }

    let mut sums = vec![0.0; first.len()];
    for result in results {
        for (sum, (_, value)) in sums.iter_mut().zip(result.iter()) {
            *sum += value;
        }
    }

    let n = results.len() as f64;
    let mut mean = MetricResult::with_capacity(first.len());
    for (name, sum) in first.names().zip(sums) {
        mean.push(name, sum / n);
    }
    Ok(mean)
}
