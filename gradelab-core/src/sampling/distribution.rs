//! Per-metric value distributions collected across bootstrap iterations.

use super::SamplingError;
use crate::metrics::MetricResult;

/// Metric name → per-iteration values.
///
/// The name set is learned from the first pushed result; every later result
/// must carry the same names in the same order.
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    series: Vec<(&'static str, Vec<f64>)>,
    iterations: usize,
    capacity_hint: usize,
}

impl Distribution {
    /// Empty distribution with room for `iterations` values per metric.
    pub fn with_capacity(iterations: usize) -> Self {
        Self {
            capacity_hint: iterations,
            ..Self::default()
        }
    }

    /// Append one iteration's result.
    pub fn push(&mut self, result: MetricResult) -> Result<(), SamplingError> {
        if self.iterations == 0 {
            self.series = result
                .into_iter()
                .map(|(name, value)| {
                    let mut values = Vec::with_capacity(self.capacity_hint.max(1));
                    values.push(value);
                    (name, values)
                })
                .collect();
            self.iterations = 1;
            return Ok(());
        }

        let matches = result.len() == self.series.len()
            && result
                .names()
                .zip(self.series.iter())
                .all(|(name, (expected, _))| name == *expected);
        if !matches {
            return Err(SamplingError::InconsistentMetrics {
                iteration: self.iterations,
                expected: self.names().collect(),
                found: result.names().collect(),
            });
        }

        for ((_, values), (_, value)) in self.series.iter_mut().zip(result) {
            values.push(value);
        }
        self.iterations += 1;
        Ok(())
    }

    /// Number of iterations recorded.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn is_empty(&self) -> bool {
        self.iterations == 0
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.series.iter().map(|&(name, _)| name)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[f64])> + '_ {
        self.series
            .iter()
            .map(|(name, values)| (*name, values.as_slice()))
    }
}

impl PartialEq for Distribution {
    fn eq(&self, other: &Self) -> bool {
        self.iterations == other.iterations && self.series == other.series
    }
}
