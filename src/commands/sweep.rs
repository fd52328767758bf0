// src/commands/sweep.rs

//! Sweep command - run an experiment list against the ledger

use anyhow::{Context, Result};
use mpi_compat::{ledger, load_experiments, Ledger, Sweep, SystemConfig};
use std::path::Path;

/// Run every listed experiment that has no recorded result
pub fn cmd_sweep(experiments_path: &Path, jobs: usize, dry_run: bool, config: &SystemConfig) -> Result<()> {
    let experiments = load_experiments(experiments_path)
        .with_context(|| format!("Failed to load experiments from {}", experiments_path.display()))?;

    if dry_run {
        let ledger = Ledger::load(&config.output_file)
            .with_context(|| format!("Failed to load results from {}", config.output_file.display()))?;
        let pending = ledger::prune(&experiments, ledger.records());

        println!(
            "{} of {} experiments have no recorded result:",
            pending.len(),
            experiments.len()
        );
        for experiment in &pending {
            println!("  {}", experiment);
        }
        return Ok(());
    }

    println!(
        "Sweeping {} experiments from {} ({} worker(s))",
        experiments.len(),
        experiments_path.display(),
        jobs.max(1)
    );
    let summary = Sweep::new(config)
        .with_jobs(jobs)
        .run(&experiments)
        .context("Sweep failed")?;

    println!("{}", summary);
    println!("Results in {}", config.output_file.display());
    if summary.errored > 0 {
        anyhow::bail!("{} experiment(s) could not be completed", summary.errored);
    }
    Ok(())
}
