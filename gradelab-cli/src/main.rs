//! GradeLab CLI: evaluate and discover commands.
//!
//! Commands:
//! - `evaluate`: compute metrics and bootstrap intervals for every team of
//!   every configured dataset, then write CSV, JSON and confusion matrices
//! - `discover`: list the teams, datasets and runs found under a base dir
//!
//! Logging goes to stderr through `tracing`; `RUST_LOG` refines the default
//! `gradelab=info` filter and `--verbose` raises it to `debug`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gradelab_core::Execution;
use gradelab_runner::{
    evaluate_all, retrieve_team_submissions, write_outputs, EvaluationConfig, EvaluationProgress,
    Workspace,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gradelab",
    about = "GradeLab CLI: bootstrap confidence intervals for grading submissions"
)]
struct Cli {
    /// Debug-level logging.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every team of every configured dataset.
    Evaluate {
        /// Path to the TOML evaluation config.
        #[arg(long)]
        config: PathBuf,

        /// Base dir holding `algorithms/` and `reference/`.
        #[arg(long)]
        base_dir: PathBuf,

        /// Output directory for result files.
        #[arg(long, default_value = "results")]
        output: PathBuf,

        /// Override the number of bootstrap iterations.
        #[arg(long)]
        n_bootstraps: Option<usize>,

        /// Override the RNG seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of team workers.
        #[arg(long)]
        pool_size: Option<usize>,

        /// Run bootstrap iterations in parallel (reproducible, different stream).
        #[arg(long, default_value_t = false)]
        parallel_bootstrap: bool,
    },
    /// List discovered teams, datasets and runs.
    Discover {
        /// Path to the TOML evaluation config.
        #[arg(long)]
        config: PathBuf,

        /// Base dir holding `algorithms/`.
        #[arg(long)]
        base_dir: PathBuf,
    },
}

struct EvaluateArgs {
    config: PathBuf,
    base_dir: PathBuf,
    output: PathBuf,
    n_bootstraps: Option<usize>,
    seed: Option<u64>,
    pool_size: Option<usize>,
    parallel_bootstrap: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Evaluate {
            config,
            base_dir,
            output,
            n_bootstraps,
            seed,
            pool_size,
            parallel_bootstrap,
        } => run_evaluate(EvaluateArgs {
            config,
            base_dir,
            output,
            n_bootstraps,
            seed,
            pool_size,
            parallel_bootstrap,
        }),
        Commands::Discover { config, base_dir } => run_discover(&config, &base_dir),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let directive = if verbose { "gradelab=debug" } else { "gradelab=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();
    Ok(())
}

fn load_config(path: &Path) -> Result<EvaluationConfig> {
    EvaluationConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

// ─── evaluate ───────────────────────────────────────────────────────

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(n) = args.n_bootstraps {
        config.n_bootstraps = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(pool_size) = args.pool_size {
        config.pool_size = pool_size;
    }
    if args.parallel_bootstrap {
        config.execution = Execution::Parallel;
    }
    config.validate().context("invalid settings after overrides")?;

    tracing::info!(
        datasets = config.datasets.len(),
        n_bootstraps = config.n_bootstraps,
        seed = config.seed,
        pool_size = config.pool_size,
        execution = ?config.execution,
        "computing metrics for all teams across all datasets"
    );

    let workspace = Workspace::from_base_dir(&args.base_dir);
    let progress = BarProgress::new()?;
    let report = evaluate_all(&config, &workspace, Some(&progress))?;
    let paths = write_outputs(&report, &config, &args.output)?;

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        eprintln!("{} team evaluation(s) failed:", failures.len());
        for (dataset, failure) in &failures {
            eprintln!(
                "  [{}] {}: {}",
                config.dataset_label(dataset),
                config.team_label(&failure.team),
                failure.error
            );
        }
    }

    println!("Rows written: {}", report.rows().count());
    println!("Results CSV:  {}", paths.csv.display());
    println!("Results JSON: {}", paths.json.display());
    for path in &paths.confusion {
        println!("Confusion:    {}", path.display());
    }
    Ok(())
}

/// Progress bar over the teams of the dataset being evaluated.
struct BarProgress {
    style: ProgressStyle,
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    fn new() -> Result<Self> {
        let style = ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")
            .context("invalid progress template")?;
        Ok(Self {
            style,
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        if let Ok(mut slot) = self.bar.lock() {
            f(&mut slot);
        }
    }
}

impl EvaluationProgress for BarProgress {
    fn on_dataset_start(&self, dataset: &str, teams: usize) {
        let bar = ProgressBar::new(teams as u64)
            .with_style(self.style.clone())
            .with_message(dataset.to_string());
        self.with_bar(|slot| *slot = Some(bar));
    }

    fn on_team_complete(&self, _dataset: &str, _team: &str, _succeeded: bool) {
        self.with_bar(|slot| {
            if let Some(bar) = slot {
                bar.inc(1);
            }
        });
    }

    fn on_dataset_complete(&self, _dataset: &str, _succeeded: usize, _failed: usize) {
        self.with_bar(|slot| {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        });
    }
}

// ─── discover ───────────────────────────────────────────────────────

fn run_discover(config_path: &Path, base_dir: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let workspace = Workspace::from_base_dir(base_dir);
    let submissions = retrieve_team_submissions(&workspace.submissions, &config.submission_file)
        .with_context(|| {
            format!(
                "failed to discover submissions under {}",
                workspace.submissions.display()
            )
        })?;

    if submissions.is_empty() {
        println!("No submissions found under {}", workspace.submissions.display());
        return Ok(());
    }

    for (team, datasets) in &submissions {
        let registered = if config.selects_team(team) { "" } else { " (not registered)" };
        println!("{}{registered}", config.team_label(team));
        for (dir, runs) in datasets {
            let configured: Vec<&str> = config
                .datasets
                .iter()
                .filter(|(_, d)| &d.dir == dir)
                .map(|(name, _)| config.dataset_label(name))
                .collect();
            let label = if configured.is_empty() {
                format!("{dir} (not configured)")
            } else {
                format!("{dir} -> {}", configured.join(", "))
            };
            let run_ids: Vec<&str> = runs.iter().map(|r| r.run.as_str()).collect();
            println!("  {label}: {}", run_ids.join(", "));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn evaluate_parses_overrides() {
        let cli = Cli::try_parse_from([
            "gradelab",
            "evaluate",
            "--config",
            "eval.toml",
            "--base-dir",
            "panda",
            "--n-bootstraps",
            "100",
            "--parallel-bootstrap",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Evaluate {
                n_bootstraps,
                output,
                parallel_bootstrap,
                seed,
                ..
            } => {
                assert_eq!(n_bootstraps, Some(100));
                assert_eq!(output, PathBuf::from("results"));
                assert!(parallel_bootstrap);
                assert_eq!(seed, None);
            }
            Commands::Discover { .. } => panic!("expected evaluate"),
        }
    }
}
