// src/build/context.rs

//! Per-build scratch state

use crate::error::{Error, Result};
use crate::experiment::ImplementationId;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// State for one host or container build
///
/// Owns a scratch tree (`build/` and `install/`) that is deleted when the
/// context is dropped, whichever way the experiment ends. A context covers a
/// single extraction and install; building another version needs a new one.
#[derive(Debug)]
pub struct BuildContext {
    pub implementation: ImplementationId,
    pub version: String,
    /// Source locator as given (`file://...` or a URL)
    pub source_locator: String,
    /// Archive file name once acquired
    pub archive_name: Option<String>,
    /// Downloaded archive, cleared again after extraction
    pub archive_path: Option<PathBuf>,
    /// Root of the extracted source tree
    pub source_dir: Option<PathBuf>,
    /// Scratch directory for downloads, extraction and container recipes
    pub build_dir: PathBuf,
    /// Install prefix for host builds
    pub install_dir: PathBuf,
    /// Saved vendor uninstall configuration, if the vendor installer ran
    pub uninstall_config: Option<PathBuf>,
    /// Finished container recipe
    pub recipe_path: Option<PathBuf>,
    /// Built container image
    pub image_path: Option<PathBuf>,
    /// Test binary path inside the image
    pub container_test_path: Option<PathBuf>,
    scratch: TempDir,
}

impl BuildContext {
    /// Create a context with a fresh scratch tree under `scratch_root`
    /// (the system temp directory when `None`)
    pub fn new(
        implementation: ImplementationId,
        version: &str,
        source_locator: &str,
        scratch_root: Option<&Path>,
    ) -> Result<Self> {
        if version.trim().is_empty() {
            return Err(Error::invalid("version", "must not be empty"));
        }
        if source_locator.trim().is_empty() {
            return Err(Error::invalid("source locator", "must not be empty"));
        }

        let prefix = format!("mpi-compat-{}-{}-", implementation, version);
        let scratch = match scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix(&prefix).tempdir_in(root)
            }
            None => tempfile::Builder::new().prefix(&prefix).tempdir(),
        }
        .map_err(|e| Error::IoError(format!("Failed to create scratch directory: {}", e)))?;

        let build_dir = scratch.path().join("build");
        let install_dir = scratch.path().join("install");
        fs::create_dir_all(&build_dir)?;
        fs::create_dir_all(&install_dir)?;

        Ok(Self {
            implementation,
            version: version.to_string(),
            source_locator: source_locator.to_string(),
            archive_name: None,
            archive_path: None,
            source_dir: None,
            build_dir,
            install_dir,
            uninstall_config: None,
            recipe_path: None,
            image_path: None,
            container_test_path: None,
            scratch,
        })
    }

    /// Root of the scratch tree
    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }

    /// Extracted source tree, or an error if extraction has not happened
    pub fn require_source_dir(&self) -> Result<&Path> {
        self.source_dir
            .as_deref()
            .ok_or_else(|| Error::invalid("build context", "source has not been extracted"))
    }

    /// Built image, or an error if the container build has not happened
    pub fn require_image(&self) -> Result<&Path> {
        self.image_path
            .as_deref()
            .ok_or_else(|| Error::invalid("build context", "container image has not been built"))
    }
}
