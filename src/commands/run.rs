// src/commands/run.rs

//! Run command - one experiment end to end

use anyhow::{Context, Result};
use mpi_compat::{pipeline, Experiment, ImplementationId, JobOutcome, Ledger, SystemConfig};
use tracing::info;

/// Command-line description of a single experiment
#[derive(Debug)]
pub struct RunRequest {
    pub implementation: String,
    pub host_version: String,
    pub host_source: String,
    pub container_version: Option<String>,
    pub container_source: Option<String>,
    pub force: bool,
}

impl RunRequest {
    fn experiment(&self) -> Result<Experiment> {
        let implementation: ImplementationId = self
            .implementation
            .parse()
            .with_context(|| format!("Unknown implementation: {}", self.implementation))?;

        let experiment = Experiment::new(
            implementation,
            &self.host_version,
            &self.host_source,
            self.container_version.as_deref().unwrap_or(&self.host_version),
            self.container_source.as_deref().unwrap_or(&self.host_source),
        )?;
        Ok(experiment)
    }
}

/// Run one experiment and append its verdict to the ledger
pub fn cmd_run(request: &RunRequest, config: &SystemConfig) -> Result<()> {
    let experiment = request.experiment()?;

    let mut ledger = Ledger::load(&config.output_file)
        .with_context(|| format!("Failed to load results from {}", config.output_file.display()))?;

    let (host, container) = experiment.key();
    if !request.force && ledger.contains(host, container) {
        println!(
            "{} already has a recorded result in {} (use --force to run again)",
            experiment,
            ledger.path().display()
        );
        return Ok(());
    }

    println!("Running {}", experiment);
    info!("Test mode: {}", config.test_mode);

    let report = pipeline::run_and_record(&experiment, config, &mut ledger)
        .with_context(|| format!("Experiment failed: {}", experiment))?;

    match &report.outcome {
        JobOutcome::Success(job) if !job.note.is_empty() => {
            println!("[PASS] {} ({})", experiment, job.note)
        }
        JobOutcome::Success(_) => println!("[PASS] {}", experiment),
        JobOutcome::SoftFail { reason, .. } => println!("[FAIL] {}: job {}", experiment, reason),
    }
    println!("Result recorded in {}", ledger.path().display());
    Ok(())
}
