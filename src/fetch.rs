// src/fetch.rs

//! Acquisition: resolve a source locator to an archive in the scratch tree
//!
//! Locators are either `file://<path>` (copied) or an `http(s)://`/`ftp://`
//! URL (downloaded with the configured download tool). The download tool
//! picks the file name itself, so the only way to find the artifact is to
//! require that exactly one new entry appears in the target directory.

use crate::build::BuildContext;
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::process;
use crate::tools::Tool;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};
use url::Url;

/// Prefix marking a local-file source locator
pub const FILE_SCHEME_PREFIX: &str = "file://";

const REMOTE_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// A classified source locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    LocalFile(PathBuf),
    Remote(Url),
}

impl SourceLocator {
    /// Classify a locator string by its scheme prefix
    pub fn parse(locator: &str) -> Result<Self> {
        if locator.trim().is_empty() {
            return Err(Error::invalid("source locator", "must not be empty"));
        }

        if let Some(path) = locator.strip_prefix(FILE_SCHEME_PREFIX) {
            if path.is_empty() {
                return Err(Error::invalid("source locator", "file:// without a path"));
            }
            return Ok(Self::LocalFile(PathBuf::from(path)));
        }

        let url = Url::parse(locator).map_err(|_| Error::UnsupportedScheme(locator.to_string()))?;
        if !REMOTE_SCHEMES.contains(&url.scheme()) {
            return Err(Error::UnsupportedScheme(locator.to_string()));
        }
        Ok(Self::Remote(url))
    }

    /// Archive file name implied by the locator (last path segment)
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::LocalFile(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            Self::Remote(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

/// Archive name for a locator, stripping the local-file prefix when present
pub fn archive_name(locator: &str) -> Result<String> {
    SourceLocator::parse(locator)?
        .file_name()
        .ok_or_else(|| Error::invalid("source locator", format!("no file name in {}", locator)))
}

/// Fetch the context's source into its build directory
///
/// Records the archive name and path on the context. A context only ever
/// acquires one archive.
pub fn acquire(ctx: &mut BuildContext, config: &SystemConfig) -> Result<PathBuf> {
    if ctx.archive_path.is_some() {
        return Err(Error::invalid(
            "build context",
            "source already acquired; use a fresh context",
        ));
    }

    let locator = SourceLocator::parse(&ctx.source_locator)?;
    let dest = ctx.build_dir.clone();

    let archive = match &locator {
        SourceLocator::LocalFile(path) => copy_local(path, &dest)?,
        SourceLocator::Remote(url) => download(config, url, &dest)?,
    };

    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::IoError(format!("Invalid archive path: {}", archive.display())))?;

    info!("Fetched {} into {}", name, dest.display());
    ctx.archive_name = Some(name);
    ctx.archive_path = Some(archive.clone());
    Ok(archive)
}

fn copy_local(source: &Path, dest: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(source)
        .map_err(|e| Error::NotFound(format!("{}: {}", source.display(), e)))?;
    if !metadata.is_file() {
        return Err(Error::invalid(
            "source locator",
            format!("{} is not a regular file", source.display()),
        ));
    }

    let name = source
        .file_name()
        .ok_or_else(|| Error::invalid("source locator", "path has no file name"))?;
    let target = dest.join(name);
    fs::copy(source, &target)?;
    debug!("Copied {} to {}", source.display(), target.display());
    Ok(target)
}

fn download(config: &SystemConfig, url: &Url, dest: &Path) -> Result<PathBuf> {
    let wget = config.tool(Tool::Download)?;
    let before = list_entries(dest)?;

    info!("Downloading {}", url);
    process::run(
        Command::new(&wget)
            .arg("-q")
            .arg("-P")
            .arg(dest)
            .arg(url.as_str()),
    )?;

    single_new_entry(dest, &before)
}

/// Names of all entries currently in a directory
pub(crate) fn list_entries(dir: &Path) -> Result<BTreeSet<OsString>> {
    let mut entries = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        entries.insert(entry?.file_name());
    }
    Ok(entries)
}

/// The single entry that appeared in `dir` since `before` was taken
pub(crate) fn single_new_entry(dir: &Path, before: &BTreeSet<OsString>) -> Result<PathBuf> {
    let after = list_entries(dir)?;
    let new: Vec<&OsString> = after.difference(before).collect();
    match new.as_slice() {
        [only] => Ok(dir.join(only)),
        _ => Err(Error::UnexpectedEntries {
            dir: dir.to_path_buf(),
            found: new.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::ImplementationId;

    #[test]
    fn test_parse_local_file() {
        let locator = SourceLocator::parse("file:///srv/mpi/openmpi-4.0.1.tar.bz2").unwrap();
        assert_eq!(
            locator,
            SourceLocator::LocalFile(PathBuf::from("/srv/mpi/openmpi-4.0.1.tar.bz2"))
        );
        assert_eq!(locator.file_name().as_deref(), Some("openmpi-4.0.1.tar.bz2"));
    }

    #[test]
    fn test_parse_remote() {
        let locator =
            SourceLocator::parse("https://www.mpich.org/static/downloads/3.3/mpich-3.3.tar.gz")
                .unwrap();
        assert!(matches!(locator, SourceLocator::Remote(_)));
        assert_eq!(locator.file_name().as_deref(), Some("mpich-3.3.tar.gz"));
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        assert!(matches!(
            SourceLocator::parse("git://github.com/open-mpi/ompi"),
            Err(Error::UnsupportedScheme(_))
        ));
        assert!(matches!(
            SourceLocator::parse("openmpi-4.0.1.tar.bz2"),
            Err(Error::UnsupportedScheme(_))
        ));
        assert!(SourceLocator::parse("").is_err());
    }

    #[test]
    fn test_archive_name_strips_file_prefix() {
        assert_eq!(
            archive_name("file:///opt/src/l_mpi_2019.4.243.tgz").unwrap(),
            "l_mpi_2019.4.243.tgz"
        );
    }

    #[test]
    fn test_acquire_local_file() {
        let src = tempfile::tempdir().unwrap();
        let archive = src.path().join("mpich-3.3.tar.gz");
        fs::write(&archive, b"not really gzip").unwrap();

        let config = SystemConfig::default();
        let locator = format!("{}{}", FILE_SCHEME_PREFIX, archive.display());
        let mut ctx = BuildContext::new(ImplementationId::Mpich, "3.3", &locator, None).unwrap();

        let path = acquire(&mut ctx, &config).unwrap();
        assert!(path.exists());
        assert_eq!(ctx.archive_name.as_deref(), Some("mpich-3.3.tar.gz"));

        // A context is good for one acquisition only
        assert!(acquire(&mut ctx, &config).is_err());
    }

    #[test]
    fn test_acquire_rejects_directory() {
        let src = tempfile::tempdir().unwrap();
        let config = SystemConfig::default();
        let locator = format!("{}{}", FILE_SCHEME_PREFIX, src.path().display());
        let mut ctx = BuildContext::new(ImplementationId::Mpich, "3.3", &locator, None).unwrap();
        assert!(matches!(
            acquire(&mut ctx, &config),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_single_new_entry_counts() {
        let dir = tempfile::tempdir().unwrap();
        let before = list_entries(dir.path()).unwrap();

        assert!(matches!(
            single_new_entry(dir.path(), &before),
            Err(Error::UnexpectedEntries { found: 0, .. })
        ));

        fs::write(dir.path().join("a.tar.gz"), b"").unwrap();
        assert_eq!(
            single_new_entry(dir.path(), &before).unwrap(),
            dir.path().join("a.tar.gz")
        );

        fs::write(dir.path().join("b.tar.gz"), b"").unwrap();
        assert!(matches!(
            single_new_entry(dir.path(), &before),
            Err(Error::UnexpectedEntries { found: 2, .. })
        ));
    }
}
