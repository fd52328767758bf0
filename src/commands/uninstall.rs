// src/commands/uninstall.rs

//! Uninstall command - remove an Intel MPI host install

use anyhow::{Context, Result};
use mpi_compat::{IntelInstaller, SystemConfig};
use std::path::Path;

pub fn cmd_uninstall(source_dir: &Path, install_dir: &Path, config: &SystemConfig) -> Result<()> {
    if !source_dir.is_dir() {
        anyhow::bail!("Source directory does not exist: {}", source_dir.display());
    }

    println!("Uninstalling Intel MPI from {}", install_dir.display());
    IntelInstaller
        .uninstall_at(source_dir, install_dir, config)
        .with_context(|| format!("Failed to uninstall {}", install_dir.display()))?;

    println!("[OK] Uninstalled {}", install_dir.display());
    Ok(())
}
