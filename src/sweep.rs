// src/sweep.rs

//! Sweep driver: run a list of experiments against one ledger
//!
//! The ledger is loaded once and the list pruned against it, so repeating a
//! sweep only runs pairs without a recorded result. Experiments are
//! independent and may run on several workers; each owns its scratch trees
//! and the ledger is the only shared state.

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::experiment::Experiment;
use crate::ledger::{self, Ledger};
use crate::pipeline;
use rayon::prelude::*;
use std::fmt;
use std::sync::Mutex;
use tracing::{error, info};

/// Totals for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub passed: usize,
    pub failed: usize,
    /// Experiments that could not be carried out
    pub errored: usize,
    /// Experiments skipped because the ledger already holds their result
    pub skipped: usize,
}

impl SweepSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored + self.skipped
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errored, {} skipped",
            self.passed, self.failed, self.errored, self.skipped
        )
    }
}

enum Tally {
    Passed,
    Failed,
    Errored,
}

/// A configured sweep
pub struct Sweep<'a> {
    config: &'a SystemConfig,
    jobs: usize,
}

impl<'a> Sweep<'a> {
    pub fn new(config: &'a SystemConfig) -> Self {
        Self { config, jobs: 1 }
    }

    /// Number of experiments to run at once (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run every experiment without a recorded result, appending each verdict
    ///
    /// A failure to load the ledger aborts the sweep. A failure inside one
    /// experiment is logged and counted, and the sweep moves on.
    pub fn run(&self, experiments: &[Experiment]) -> Result<SweepSummary> {
        let ledger = Ledger::load(&self.config.output_file)?;
        let pending = ledger::prune(experiments, ledger.records());

        let mut summary = SweepSummary {
            skipped: experiments.len() - pending.len(),
            ..SweepSummary::default()
        };
        if summary.skipped > 0 {
            info!("Skipping {} experiments already in {}", summary.skipped, ledger.path().display());
        }
        info!("Running {} experiments with {} worker(s)", pending.len(), self.jobs);

        let ledger = Mutex::new(ledger);
        let tallies: Vec<Tally> = if self.jobs == 1 {
            pending.iter().map(|e| self.run_one(e, &ledger)).collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.jobs)
                .build()
                .map_err(|e| Error::IoError(format!("Failed to start worker pool: {}", e)))?;
            pool.install(|| pending.par_iter().map(|e| self.run_one(e, &ledger)).collect())
        };

        for tally in tallies {
            match tally {
                Tally::Passed => summary.passed += 1,
                Tally::Failed => summary.failed += 1,
                Tally::Errored => summary.errored += 1,
            }
        }

        info!("Sweep finished: {}", summary);
        Ok(summary)
    }

    fn run_one(&self, experiment: &Experiment, ledger: &Mutex<Ledger>) -> Tally {
        let report = match pipeline::run_experiment(experiment, self.config) {
            Ok(report) => report,
            Err(e) => {
                error!("Experiment {} could not be completed: {}", experiment, e);
                return Tally::Errored;
            }
        };

        let appended = match ledger.lock() {
            Ok(mut ledger) => ledger.append(report.record.clone()),
            Err(_) => Err(Error::IoError("ledger lock poisoned".to_string())),
        };
        if let Err(e) = appended {
            error!("Failed to record result for {}: {}", experiment, e);
            return Tally::Errored;
        }

        if report.passed() { Tally::Passed } else { Tally::Failed }
    }
}
