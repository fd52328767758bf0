// src/config.rs

//! System configuration
//!
//! Populated once at startup (defaults, then an optional TOML file, then
//! command-line overrides) and passed by reference into every pipeline
//! stage. The only thing that changes afterwards is the tool path cache.

use crate::error::{Error, Result};
use crate::tools::{self, Tool, ToolCache};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default deadline for one MPI job
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Container builds get this many job deadlines
const CONTAINER_BUILD_TIMEOUT_FACTOR: u64 = 10;

/// Which program runs inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Simple hello-world style MPI test
    #[default]
    Functional,
    /// Point-to-point benchmark with bandwidth and latency extraction
    Benchmark,
}

impl TestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Benchmark => "benchmark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "functional" => Some(Self::Functional),
            "benchmark" | "netpipe" => Some(Self::Benchmark),
            _ => None,
        }
    }

    pub fn is_benchmark(&self) -> bool {
        matches!(self, Self::Benchmark)
    }
}

impl std::fmt::Display for TestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Directory holding container recipe templates and test sources
    pub template_dir: PathBuf,
    /// Result ledger file
    pub output_file: PathBuf,
    /// Parent directory for per-experiment scratch trees (system temp dir if unset)
    pub scratch_root: Option<PathBuf>,
    /// Functional test or benchmark
    pub test_mode: TestMode,
    /// Network interface handed to the vendor fabric configuration
    pub network_interface: String,
    /// Template name prefix (`<distro>_<impl>.def`)
    pub distro: String,
    /// Deadline for one MPI job, in seconds
    pub job_timeout_secs: u64,
    /// Deadline for one container image build, in seconds
    pub container_build_timeout_secs: Option<u64>,
    /// Number of MPI ranks to launch
    pub ranks: u32,
    /// Explicit tool paths, keyed by tool name (`download`, `archive`, ...)
    pub tools: BTreeMap<String, PathBuf>,
    #[serde(skip)]
    resolved: ToolCache,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("/usr/share/mpi-compat/templates"),
            output_file: PathBuf::from("results.txt"),
            scratch_root: None,
            test_mode: TestMode::Functional,
            network_interface: "eth0".to_string(),
            distro: "ubuntu".to_string(),
            job_timeout_secs: DEFAULT_JOB_TIMEOUT.as_secs(),
            container_build_timeout_secs: None,
            ranks: 2,
            tools: BTreeMap::new(),
            resolved: ToolCache::default(),
        }
    }
}

impl SystemConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mpi-compat").join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit file, else the default file if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::load(&default),
            _ => Ok(Self::default()),
        }
    }

    /// Check invariants that the rest of the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        for key in self.tools.keys() {
            if Tool::parse(key).is_none() {
                return Err(Error::ConfigError(format!("Unknown tool: {}", key)));
            }
        }
        if self.job_timeout_secs == 0 {
            return Err(Error::ConfigError(
                "job_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.ranks == 0 {
            return Err(Error::ConfigError("ranks must be greater than zero".to_string()));
        }
        if self.distro.is_empty() {
            return Err(Error::ConfigError("distro must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = path.into();
        self
    }

    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    pub fn with_test_mode(mut self, mode: TestMode) -> Self {
        self.test_mode = mode;
        self
    }

    pub fn with_network_interface(mut self, iface: impl Into<String>) -> Self {
        self.network_interface = iface.into();
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_ranks(mut self, ranks: u32) -> Self {
        self.ranks = ranks;
        self
    }

    /// Pin a tool to an explicit path
    pub fn with_tool(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(tool.key().to_string(), path.into());
        self
    }

    /// Deadline for one MPI job
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    /// Deadline for one container image build
    pub fn container_build_timeout(&self) -> Duration {
        let secs = self
            .container_build_timeout_secs
            .unwrap_or_else(|| self.job_timeout_secs.saturating_mul(CONTAINER_BUILD_TIMEOUT_FACTOR));
        Duration::from_secs(secs)
    }

    /// Resolve a tool path, caching `PATH` lookups
    pub fn tool(&self, tool: Tool) -> Result<PathBuf> {
        let explicit = self.tools.get(tool.key()).map(PathBuf::as_path);
        tools::resolve(tool, explicit, &self.resolved)
    }

    /// Template file path under the template directory
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.template_dir.join(name)
    }
}
