// src/tools.rs

//! External tools the pipeline shells out to
//!
//! Every tool can be pinned to an explicit path in the configuration. Tools
//! that are not pinned are looked up on `PATH` the first time they are needed
//! and the result is cached. Two threads resolving the same tool at once both
//! get the same answer, so the cache only needs to be safe, not exclusive.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// An external binary with a fixed invocation contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    /// Fetches a remote archive into a directory (`wget -q -P <dir> <url>`)
    Download,
    /// Extracts archives (`tar <flags> <archive> -C <dir>`)
    Archive,
    /// Build automation (`make`, `make install`)
    Make,
    /// Privilege elevation for the container build
    Sudo,
    /// Container runtime (`singularity build`, `singularity exec`)
    Container,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Download,
        Tool::Archive,
        Tool::Make,
        Tool::Sudo,
        Tool::Container,
    ];

    /// Key used for this tool in the `[tools]` configuration table
    pub fn key(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Archive => "archive",
            Self::Make => "make",
            Self::Sudo => "sudo",
            Self::Container => "container",
        }
    }

    /// Binary name searched on `PATH` when no explicit path is configured
    pub fn default_binary(&self) -> &'static str {
        match self {
            Self::Download => "wget",
            Self::Archive => "tar",
            Self::Make => "make",
            Self::Sudo => "sudo",
            Self::Container => "singularity",
        }
    }

    /// Parse a configuration key
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == s)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Lazily filled map of resolved tool paths
#[derive(Debug, Default)]
pub struct ToolCache {
    paths: RwLock<HashMap<Tool, PathBuf>>,
}

impl ToolCache {
    pub fn get(&self, tool: Tool) -> Option<PathBuf> {
        let paths = self.paths.read().unwrap_or_else(|e| e.into_inner());
        paths.get(&tool).cloned()
    }

    pub fn insert(&self, tool: Tool, path: PathBuf) {
        let mut paths = self.paths.write().unwrap_or_else(|e| e.into_inner());
        paths.insert(tool, path);
    }

    pub fn len(&self) -> usize {
        self.paths.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for ToolCache {
    fn clone(&self) -> Self {
        let paths = self.paths.read().unwrap_or_else(|e| e.into_inner());
        Self {
            paths: RwLock::new(paths.clone()),
        }
    }
}

/// Resolve a tool from an explicit path, the cache, or `PATH`, in that order
pub fn resolve(tool: Tool, explicit: Option<&Path>, cache: &ToolCache) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::ToolNotFound(format!(
                "{} (configured as {})",
                tool.default_binary(),
                path.display()
            )));
        }
        return Ok(path.to_path_buf());
    }

    if let Some(path) = cache.get(tool) {
        return Ok(path);
    }

    let path = which::which(tool.default_binary())
        .map_err(|_| Error::ToolNotFound(tool.default_binary().to_string()))?;
    debug!("Resolved {} tool to {}", tool, path.display());
    cache.insert(tool, path.clone());
    Ok(path)
}
