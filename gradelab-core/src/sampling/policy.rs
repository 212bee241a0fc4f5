//! Rater policies and the per-iteration draw.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Which submission(s) back a resample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaterPolicy {
    /// Every submission, metric averaged across them.
    FixedSet,
    /// One submission drawn uniformly, metric applied directly.
    SingleRandom,
    /// As many draws as there are submissions, with replacement, averaged.
    ResampledMultiset,
}

impl RaterPolicy {
    /// Whether metric values are averaged across the drawn raters.
    pub fn averages_raters(self) -> bool {
        !matches!(self, Self::SingleRandom)
    }

    fn draw_raters<R: Rng>(self, n_raters: usize, rng: &mut R) -> Vec<usize> {
        match self {
            Self::FixedSet => (0..n_raters).collect(),
            // No draw for a lone submission: the stream then matches FixedSet.
            Self::SingleRandom if n_raters == 1 => vec![0],
            Self::SingleRandom => vec![rng.gen_range(0..n_raters)],
            Self::ResampledMultiset => (0..n_raters).map(|_| rng.gen_range(0..n_raters)).collect(),
        }
    }
}

/// One iteration's draw: reference rows (with repeats) and rater indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSample {
    pub case_rows: Vec<usize>,
    pub raters: Vec<usize>,
}

/// Draw one bootstrap sample: `n_cases` rows with replacement, then raters.
///
/// Both counts must be positive; the engine validates this before the loop.
pub fn draw_sample<R: Rng>(
    n_cases: usize,
    n_raters: usize,
    policy: RaterPolicy,
    rng: &mut R,
) -> BootstrapSample {
    let case_rows = (0..n_cases).map(|_| rng.gen_range(0..n_cases)).collect();
    let raters = policy.draw_raters(n_raters, rng);
    BootstrapSample { case_rows, raters }
}
