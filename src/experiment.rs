// src/experiment.rs

//! Experiments: one {host version, container version} pair for one MPI
//! implementation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Supported MPI implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImplementationId {
    OpenMpi,
    Mpich,
    /// Intel MPI, installed through the vendor's silent installer
    Intel,
}

impl ImplementationId {
    pub const ALL: [ImplementationId; 3] = [Self::OpenMpi, Self::Mpich, Self::Intel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenMpi => "openmpi",
            Self::Mpich => "mpich",
            Self::Intel => "intel",
        }
    }
}

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImplementationId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openmpi" | "ompi" => Ok(Self::OpenMpi),
            "mpich" => Ok(Self::Mpich),
            "intel" | "impi" => Ok(Self::Intel),
            _ => Err(Error::UnsupportedImplementation(s.to_string())),
        }
    }
}

/// A single host/container compatibility experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub implementation: ImplementationId,
    pub host_version: String,
    pub host_source: String,
    pub container_version: String,
    pub container_source: String,
}

impl Experiment {
    /// Create an experiment, rejecting empty fields
    pub fn new(
        implementation: ImplementationId,
        host_version: impl Into<String>,
        host_source: impl Into<String>,
        container_version: impl Into<String>,
        container_source: impl Into<String>,
    ) -> Result<Self> {
        let experiment = Self {
            implementation,
            host_version: host_version.into(),
            host_source: host_source.into(),
            container_version: container_version.into(),
            container_source: container_source.into(),
        };
        experiment.validate()?;
        Ok(experiment)
    }

    /// Check that every field is usable
    ///
    /// Versions end up as ledger fields, so they may not contain tabs or newlines.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("host_version", &self.host_version),
            ("host_source", &self.host_source),
            ("container_version", &self.container_version),
            ("container_source", &self.container_source),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::invalid(field, "must not be empty"));
            }
            if value.contains(['\t', '\n', '\r']) {
                return Err(Error::invalid(field, "must not contain tabs or newlines"));
            }
        }
        Ok(())
    }

    /// Deduplication identity: the (host version, container version) pair
    pub fn key(&self) -> (&str, &str) {
        (&self.host_version, &self.container_version)
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} host {} / container {}",
            self.implementation, self.host_version, self.container_version
        )
    }
}

#[derive(Debug, Deserialize)]
struct ExperimentList {
    #[serde(default)]
    experiment: Vec<Experiment>,
}

/// Load a list of experiments from a TOML file of `[[experiment]]` tables
pub fn load_experiments(path: &Path) -> Result<Vec<Experiment>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read {}: {}", path.display(), e)))?;
    let list: ExperimentList = toml::from_str(&content)
        .map_err(|e| Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e)))?;
    for experiment in &list.experiment {
        experiment.validate()?;
    }
    Ok(list.experiment)
}
