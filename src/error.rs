// src/error.rs

//! Error types for the experiment pipeline
//!
//! A soft experiment failure (job exited non-zero, ran past its deadline, or
//! printed a usage banner) is *not* an error. It is reported through
//! [`crate::exec::JobOutcome`]. Everything in this enum means the pipeline
//! itself could not complete an experiment.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while executing a single experiment
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was empty or malformed
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// An external binary could not be located
    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    /// An external binary ran but returned a non-zero status
    #[error("{command} failed with exit code {code:?}\nstdout: {stdout}\nstderr: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// An external binary with a deadline did not finish in time
    #[error("{command} timed out after {seconds} seconds\nstdout: {stdout}\nstderr: {stderr}")]
    CommandTimedOut {
        command: String,
        seconds: u64,
        stdout: String,
        stderr: String,
    },

    /// A scratch directory did not hold exactly one entry after download or extraction
    #[error("Expected exactly one entry in {}, found {found}", dir.display())]
    UnexpectedEntries { dir: PathBuf, found: usize },

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported source scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Unsupported MPI implementation: {0}")]
    UnsupportedImplementation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The result ledger contains a malformed line
    #[error("Invalid ledger entry at {}:{line}: {reason}", path.display())]
    LedgerParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a precondition failure on a named field
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
