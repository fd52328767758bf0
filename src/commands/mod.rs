// src/commands/mod.rs
//! Command handlers for the mpi-compat CLI

mod results;
mod run;
mod sweep;
mod uninstall;

pub use results::cmd_results;
pub use run::{cmd_run, RunRequest};
pub use sweep::cmd_sweep;
pub use uninstall::cmd_uninstall;

use crate::cli::PipelineArgs;
use anyhow::{Context, Result};
use mpi_compat::{SystemConfig, TestMode};
use std::path::Path;
use std::time::Duration;

/// Load the configuration file and apply command-line overrides
pub fn load_config(path: Option<&Path>, overrides: &PipelineArgs) -> Result<SystemConfig> {
    let mut config = SystemConfig::load_or_default(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load default configuration".to_string(),
    })?;

    if let Some(output) = &overrides.output {
        config = config.with_output_file(output);
    }
    if let Some(dir) = &overrides.template_dir {
        config = config.with_template_dir(dir);
    }
    if let Some(dir) = &overrides.scratch_dir {
        config = config.with_scratch_root(dir);
    }
    if overrides.benchmark {
        config = config.with_test_mode(TestMode::Benchmark);
    }
    if let Some(iface) = &overrides.net_iface {
        config = config.with_network_interface(iface);
    }
    if let Some(secs) = overrides.timeout {
        config = config.with_job_timeout(Duration::from_secs(secs));
    }
    if let Some(ranks) = overrides.ranks {
        config = config.with_ranks(ranks);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
