// src/archive.rs

//! Unpack: extract a source archive and locate its single top-level tree

use crate::build::BuildContext;
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::fetch::{list_entries, single_new_entry};
use crate::process;
use crate::tools::Tool;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Archive formats the pipeline knows how to extract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.bz2`
    Bzip2,
    /// `.tar.gz` / `.tgz`
    Gzip,
    /// Uncompressed `.tar`
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from the archive's final extension
    ///
    /// ```
    /// use mpi_compat::archive::ArchiveFormat;
    ///
    /// assert_eq!(ArchiveFormat::detect("openmpi-4.0.1.tar.bz2").unwrap(), ArchiveFormat::Bzip2);
    /// assert_eq!(ArchiveFormat::detect("mpich-3.3.tar.gz").unwrap(), ArchiveFormat::Gzip);
    /// assert_eq!(ArchiveFormat::detect("src.tar").unwrap(), ArchiveFormat::Tar);
    /// assert!(ArchiveFormat::detect("src.zip").is_err());
    /// ```
    pub fn detect(name: &str) -> Result<Self> {
        match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some("bz2") => Ok(Self::Bzip2),
            Some("gz") | Some("tgz") => Ok(Self::Gzip),
            Some("tar") => Ok(Self::Tar),
            _ => Err(Error::UnsupportedFormat(name.to_string())),
        }
    }

    /// Extraction flags for `tar`
    pub fn tar_flags(&self) -> &'static str {
        match self {
            Self::Bzip2 => "-xjf",
            Self::Gzip => "-xzf",
            Self::Tar => "-xf",
        }
    }
}

/// Extract an archive into `dest` with the configured archive tool
pub fn extract_archive(config: &SystemConfig, archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::invalid("archive path", archive.display().to_string()))?;
    let format = ArchiveFormat::detect(name)?;
    let tar = config.tool(Tool::Archive)?;

    process::run(
        Command::new(&tar)
            .arg(format.tar_flags())
            .arg(archive)
            .arg("-C")
            .arg(dest),
    )?;
    Ok(())
}

/// Extract the context's archive, delete it, and record the source tree root
pub fn unpack(ctx: &mut BuildContext, config: &SystemConfig) -> Result<PathBuf> {
    if ctx.source_dir.is_some() {
        return Err(Error::invalid(
            "build context",
            "source already extracted; use a fresh context",
        ));
    }
    let archive = ctx
        .archive_path
        .clone()
        .ok_or_else(|| Error::invalid("build context", "no archive acquired"))?;

    // Detect before touching the disk so unsupported formats fail cleanly
    let name = ctx.archive_name.clone().unwrap_or_default();
    ArchiveFormat::detect(&name)?;

    let dest = ctx.build_dir.clone();
    let mut before = list_entries(&dest)?;

    extract_archive(config, &archive, &dest)?;

    fs::remove_file(&archive)?;
    if let Some(archive_name) = archive.file_name() {
        before.remove(archive_name);
    }
    debug!("Removed archive {}", archive.display());

    let source_dir = single_new_entry(&dest, &before)?;
    info!("Extracted source tree {}", source_dir.display());

    ctx.archive_path = None;
    ctx.source_dir = Some(source_dir.clone());
    Ok(source_dir)
}
