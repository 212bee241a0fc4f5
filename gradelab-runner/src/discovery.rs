//! Submission discovery on disk.
//!
//! Layout: `{root}/{team}/{dataset}/{run}/{submission}.csv`. Directory names
//! starting with `.` are skipped. Teams, datasets and runs are returned in
//! name order, so discovery is deterministic across platforms.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Errors from walking the submission tree.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("submission root {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("failed to read directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One submitted run: its directory name and the CSV path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RunPath {
    pub run: String,
    pub path: PathBuf,
}

/// Team → runs for one dataset.
pub type TeamRuns = BTreeMap<String, Vec<RunPath>>;

/// Team → dataset directory → runs.
pub type TeamDatasetRuns = BTreeMap<String, BTreeMap<String, Vec<RunPath>>>;

/// Find every team's runs for one dataset directory.
///
/// Teams without any `{run}/{submission_file}.csv` under `{team}/{dataset_dir}`
/// are left out.
pub fn retrieve_team_submissions_for_dataset(
    root: &Path,
    dataset_dir: &str,
    submission_file: &str,
) -> Result<TeamRuns, DiscoveryError> {
    ensure_dir(root)?;
    tracing::info!(
        root = %root.display(),
        dataset = dataset_dir,
        submission_file,
        "searching submission files"
    );

    let mut teams = TeamRuns::new();
    for (team, team_path) in subdirectories(root)? {
        let dataset_path = team_path.join(dataset_dir);
        if !dataset_path.is_dir() {
            continue;
        }
        let runs = runs_in(&dataset_path, submission_file)?;
        if !runs.is_empty() {
            teams.insert(team, runs);
        }
    }

    let n_files: usize = teams.values().map(Vec::len).sum();
    tracing::info!(
        files = n_files,
        teams = ?teams.keys().collect::<Vec<_>>(),
        "found submission files"
    );
    Ok(teams)
}

/// Find every team's runs for every dataset directory.
pub fn retrieve_team_submissions(
    root: &Path,
    submission_file: &str,
) -> Result<TeamDatasetRuns, DiscoveryError> {
    ensure_dir(root)?;
    tracing::info!(root = %root.display(), submission_file, "searching submission files");

    let mut submissions = TeamDatasetRuns::new();
    for (team, team_path) in subdirectories(root)? {
        let mut datasets = BTreeMap::new();
        for (dataset, dataset_path) in subdirectories(&team_path)? {
            let runs = runs_in(&dataset_path, submission_file)?;
            if !runs.is_empty() {
                datasets.insert(dataset, runs);
            }
        }
        if !datasets.is_empty() {
            submissions.insert(team, datasets);
        }
    }

    let n_files: usize = submissions
        .values()
        .flat_map(BTreeMap::values)
        .map(Vec::len)
        .sum();
    tracing::info!(
        files = n_files,
        teams = ?submissions.keys().collect::<Vec<_>>(),
        "found submissions"
    );
    Ok(submissions)
}

fn ensure_dir(path: &Path) -> Result<(), DiscoveryError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DiscoveryError::NotADirectory {
            path: path.to_path_buf(),
        })
    }
}

fn runs_in(dataset_path: &Path, submission_file: &str) -> Result<Vec<RunPath>, DiscoveryError> {
    let file_name = format!("{submission_file}.csv");
    Ok(subdirectories(dataset_path)?
        .into_iter()
        .filter_map(|(run, run_path)| {
            let path = run_path.join(&file_name);
            path.is_file().then_some(RunPath { run, path })
        })
        .collect())
}

/// Visible subdirectories with UTF-8 names, sorted by name.
fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
    let io_err = |source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            tracing::warn!(path = %path.display(), "skipping non UTF-8 directory name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        found.push((name, path));
    }
    found.sort();
    Ok(found)
}
