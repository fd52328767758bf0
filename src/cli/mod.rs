// src/cli/mod.rs
//! CLI definitions for mpi-compat
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! - `run` - Run one host/container experiment
//! - `sweep` - Run every experiment in a list file that has no recorded result
//! - `results` - Print the result ledger
//! - `uninstall` - Remove a vendor (Intel MPI) host install

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mpi-compat")]
#[command(version)]
#[command(about = "Cross-version MPI compatibility testing between host and container", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ~/.config/mpi-compat/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings that override the configuration file for one invocation
#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Result ledger file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory with container recipe templates
    #[arg(long)]
    pub template_dir: Option<PathBuf>,

    /// Parent directory for scratch build trees
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Run the NetPIPE benchmark instead of the functional test
    #[arg(long)]
    pub benchmark: bool,

    /// Network interface for the vendor fabric configuration
    #[arg(long)]
    pub net_iface: Option<String>,

    /// Job deadline in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Number of MPI ranks
    #[arg(long)]
    pub ranks: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one experiment and record its result
    ///
    /// Builds the host version from source, builds a container image with
    /// the container version, runs the host launcher against the image and
    /// appends PASS or FAIL to the ledger.
    Run {
        /// MPI implementation: openmpi, mpich, intel
        implementation: String,

        /// Host MPI version
        host_version: String,

        /// Host source (file:///path/to/archive or URL)
        host_source: String,

        /// Container MPI version (default: same as host)
        #[arg(long)]
        container_version: Option<String>,

        /// Container source (default: same as host)
        #[arg(long)]
        container_source: Option<String>,

        /// Run even if the ledger already holds this pair
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run all experiments from a list file that have no recorded result
    Sweep {
        /// TOML file of [[experiment]] tables
        experiments: PathBuf,

        /// Number of experiments to run at once
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Only show which experiments would run
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print recorded results
    Results {
        /// Result ledger file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only show failures
        #[arg(long)]
        failed: bool,
    },

    /// Uninstall an Intel MPI host install using its bundled installer
    Uninstall {
        /// Extracted Intel MPI distribution (contains install.sh)
        #[arg(long)]
        source_dir: PathBuf,

        /// Install prefix to remove
        #[arg(long)]
        install_dir: PathBuf,

        /// Directory with the installer configuration templates
        #[arg(long)]
        template_dir: Option<PathBuf>,
    },
}
