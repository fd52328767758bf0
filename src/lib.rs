// src/lib.rs

//! MPI host/container compatibility testing
//!
//! Builds one MPI version on the host, builds a container image embedding a
//! (possibly different) version of the same implementation, runs the host
//! launcher against the image and records PASS or FAIL.
//!
//! # Pipeline
//!
//! - Acquisition ([`fetch`]): local file or remote URL to an archive
//! - Unpack ([`archive`]): extract and find the single source tree
//! - Build ([`build`]): configure/make/install, or the vendor silent installer
//! - Recipe templating ([`recipe`]): per-implementation container recipe
//! - Container build ([`container`]): recipe to image
//! - Execution ([`exec`]): bounded-time job and adjudication
//! - Result ledger ([`ledger`]): append-only results, pruning for reruns
//!
//! [`pipeline`] strings the stages together for one experiment and [`sweep`]
//! runs many of them against one ledger.

pub mod archive;
pub mod build;
pub mod config;
pub mod container;
mod error;
pub mod exec;
pub mod experiment;
pub mod fetch;
pub mod ledger;
pub mod pipeline;
pub mod process;
pub mod recipe;
pub mod sweep;
pub mod tools;

pub use build::{strategy_for, BuildContext, BuildStrategy, IntelInstaller};
pub use config::{SystemConfig, TestMode};
pub use error::{Error, Result};
pub use exec::{JobOutcome, JobReport, OutputParser, SoftFailReason};
pub use experiment::{load_experiments, Experiment, ImplementationId};
pub use ledger::{prune, Ledger, ResultRecord, Verdict};
pub use pipeline::{run_and_record, run_experiment, ExperimentReport};
pub use recipe::TagSet;
pub use sweep::{Sweep, SweepSummary};
pub use tools::Tool;
