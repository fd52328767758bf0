// src/pipeline.rs

//! One experiment end to end
//!
//! Host: acquire, unpack, build. Container: template the recipe, build the
//! image. Then run the cross-version job and adjudicate it. Each side owns
//! its own [`BuildContext`], so both scratch trees are removed when this
//! function returns, on every path.

use crate::archive;
use crate::build::{self, BuildContext};
use crate::config::SystemConfig;
use crate::container;
use crate::error::Result;
use crate::exec::{self, JobOutcome};
use crate::experiment::Experiment;
use crate::fetch;
use crate::ledger::{Ledger, ResultRecord};
use crate::recipe;
use tracing::{info, warn};

/// What one experiment produced
#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub experiment: Experiment,
    pub outcome: JobOutcome,
    pub record: ResultRecord,
}

impl ExperimentReport {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

/// Build the host side and install it into a fresh scratch tree
pub fn prepare_host(experiment: &Experiment, config: &SystemConfig) -> Result<BuildContext> {
    let mut host = BuildContext::new(
        experiment.implementation,
        &experiment.host_version,
        &experiment.host_source,
        config.scratch_root.as_deref(),
    )?;

    fetch::acquire(&mut host, config)?;
    archive::unpack(&mut host, config)?;
    build::build(&mut host, config)?;
    Ok(host)
}

/// Template the recipe and build the container image
pub fn prepare_container(experiment: &Experiment, config: &SystemConfig) -> Result<BuildContext> {
    let mut container = BuildContext::new(
        experiment.implementation,
        &experiment.container_version,
        &experiment.container_source,
        config.scratch_root.as_deref(),
    )?;

    recipe::prepare_recipe(&mut container, config)?;
    container::build_image(&mut container, config)?;
    Ok(container)
}

/// Run one experiment and adjudicate it, without touching the ledger
///
/// A job that fails, hangs or prints a usage banner yields `Ok` with a FAIL
/// outcome. `Err` means the experiment could not be carried out.
pub fn run_experiment(experiment: &Experiment, config: &SystemConfig) -> Result<ExperimentReport> {
    experiment.validate()?;
    info!("Starting experiment: {}", experiment);

    let host = prepare_host(experiment, config)?;
    let job = prepare_container(experiment, config)
        .and_then(|container| exec::run_job(&host, &container, config));

    // Vendor installs register themselves outside the scratch tree
    if let Err(e) = build::uninstall(&host, config) {
        warn!("Uninstall of host {} {} failed: {}", host.implementation, host.version, e);
    }

    let outcome = job?;
    let record = ResultRecord::for_experiment(experiment, outcome.verdict());
    info!("Experiment {}: {}", experiment, record.verdict);

    Ok(ExperimentReport {
        experiment: experiment.clone(),
        outcome,
        record,
    })
}

/// Run one experiment and append its verdict to the ledger
pub fn run_and_record(
    experiment: &Experiment,
    config: &SystemConfig,
    ledger: &mut Ledger,
) -> Result<ExperimentReport> {
    let report = run_experiment(experiment, config)?;
    ledger.append(report.record.clone())?;
    Ok(report)
}
