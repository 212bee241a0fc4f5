//! Evaluation configuration: datasets, team registry, metric lists, bootstrap settings.
//!
//! Loaded from TOML. Every field has a default, so a minimal file only needs
//! its `[datasets.<name>]` tables:
//!
//! ```toml
//! n_bootstraps = 2000
//!
//! [datasets.tuning]
//! reference = "tuning.csv"
//! dir = "tuning"
//! usage = "Private"
//! generate_confusion_matrix = true
//!
//! [teams.team_a]
//! friendly_name = "Team A"
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use gradelab_core::{BootstrapConfig, Execution, Metric};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating an [`EvaluationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("n_bootstraps must be positive")]
    ZeroBootstraps,

    #[error("pool_size must be positive")]
    ZeroPoolSize,

    #[error("no datasets configured")]
    NoDatasets,

    #[error("metric '{metric}' listed more than once in {list}")]
    DuplicateMetric { list: &'static str, metric: Metric },

    #[error("dataset '{dataset}': {field} must not be empty")]
    EmptyField {
        dataset: String,
        field: &'static str,
    },
}

/// One evaluation dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Reference file name, relative to the reference directory.
    pub reference: String,
    /// Dataset directory name under each team directory.
    pub dir: String,
    /// Keep only reference rows whose `Usage` column equals this value.
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Keep only these reference cases. Empty or absent means all.
    #[serde(default)]
    pub image_ids: Option<Vec<String>>,
    /// Export a confusion matrix of each team's first run.
    #[serde(default)]
    pub generate_confusion_matrix: bool,
}

impl DatasetConfig {
    pub fn new(reference: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            dir: dir.into(),
            usage: None,
            friendly_name: None,
            image_ids: None,
            generate_confusion_matrix: false,
        }
    }

    /// The allow-list, if it restricts anything.
    pub fn image_id_filter(&self) -> Option<&[String]> {
        self.image_ids.as_deref().filter(|ids| !ids.is_empty())
    }
}

/// A registered team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default)]
    pub friendly_name: Option<String>,
}

/// Top-level evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub n_bootstraps: usize,
    pub seed: u64,
    /// Worker threads for cross-team evaluation.
    pub pool_size: usize,
    /// Submission file stem: runs are read from `{run}/{submission_file}.csv`.
    pub submission_file: String,
    pub execution: Execution,
    /// Computed on the full data and averaged over runs.
    pub metrics: Vec<Metric>,
    /// Bootstrapped over cases for each team and for the cohort rows.
    pub bootstrapped_metrics: Vec<Metric>,
    pub datasets: BTreeMap<String, DatasetConfig>,
    /// Optional registry. When non-empty, only these teams are evaluated.
    pub teams: BTreeMap<String, TeamConfig>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let bootstrap = BootstrapConfig::default();
        Self {
            n_bootstraps: bootstrap.n_bootstraps,
            seed: bootstrap.seed,
            pool_size: 16,
            submission_file: "submission".into(),
            execution: bootstrap.execution,
            metrics: Metric::default_metrics(),
            bootstrapped_metrics: Metric::default_bootstrapped(),
            datasets: BTreeMap::new(),
            teams: BTreeMap::new(),
        }
    }
}

impl EvaluationConfig {
    /// Read, parse and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_bootstraps == 0 {
            return Err(ConfigError::ZeroBootstraps);
        }
        if self.pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if self.datasets.is_empty() {
            return Err(ConfigError::NoDatasets);
        }
        check_unique("metrics", &self.metrics)?;
        check_unique("bootstrapped_metrics", &self.bootstrapped_metrics)?;

        for (name, dataset) in &self.datasets {
            for (field, value) in [("reference", &dataset.reference), ("dir", &dataset.dir)] {
                if value.trim().is_empty() {
                    return Err(ConfigError::EmptyField {
                        dataset: name.clone(),
                        field,
                    });
                }
            }
        }
        Ok(())
    }

    /// Engine settings for one bootstrap call.
    pub fn bootstrap_config(&self) -> BootstrapConfig {
        BootstrapConfig::new(self.n_bootstraps, self.seed).with_execution(self.execution)
    }

    /// Whether `team` passes the registry filter.
    pub fn selects_team(&self, team: &str) -> bool {
        self.teams.is_empty() || self.teams.contains_key(team)
    }

    /// Display name for a team: its registered friendly name, else the identifier.
    pub fn team_label<'a>(&'a self, team: &'a str) -> &'a str {
        self.teams
            .get(team)
            .and_then(|t| t.friendly_name.as_deref())
            .unwrap_or(team)
    }

    /// Display name for a dataset: its friendly name, else the key.
    pub fn dataset_label<'a>(&'a self, name: &'a str) -> &'a str {
        self.datasets
            .get(name)
            .and_then(|d| d.friendly_name.as_deref())
            .unwrap_or(name)
    }
}

fn check_unique(list: &'static str, metrics: &[Metric]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for &metric in metrics {
        if !seen.insert(metric) {
            return Err(ConfigError::DuplicateMetric { list, metric });
        }
    }
    Ok(())
}
