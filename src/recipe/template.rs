// src/recipe/template.rs

//! Literal placeholder substitution for container recipes
//!
//! Not a template language: each tag is an opaque token replaced verbatim.
//! Substitution is a single left-to-right pass, so a value is never scanned
//! again for tags, and a tag that does not occur in the text is a no-op.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// MPI version
pub const TAG_VERSION: &str = "@MPI_VERSION@";
/// Source URL
pub const TAG_URL: &str = "@MPI_URL@";
/// Archive file name
pub const TAG_TARBALL: &str = "@MPI_TARBALL@";
/// `tar` extraction flags matching the archive
pub const TAG_TAR_ARGS: &str = "@TAR_ARGS@";
/// Network interface for fabric configuration
pub const TAG_NET_IFACE: &str = "@NET_IFACE@";
/// In-container binary directory of the vendor install
pub const TAG_INSTALL_DIR: &str = "@IMPI_DIR@";
/// Vendor silent-install configuration file name
pub const TAG_INSTALL_CONFIG: &str = "@IMPI_INSTALL_CONFIG@";
/// Vendor silent-uninstall configuration file name
pub const TAG_UNINSTALL_CONFIG: &str = "@IMPI_UNINSTALL_CONFIG@";
/// Install prefix inside vendor silent-installer configuration files
pub const TAG_INSTALL_PATH: &str = "@INSTALL_PATH@";

/// Ordered mapping from placeholder tag to replacement value
///
/// When two tags match at the same position the one inserted first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: Vec<(String, String)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a tag's value, keeping its original position
    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(Error::invalid("template tag", "must not be empty"));
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((tag, value)),
        }
        Ok(())
    }

    /// Builder form of [`TagSet::insert`]
    pub fn with(mut self, tag: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.insert(tag, value)?;
        Ok(self)
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Replace every tag occurrence in one pass over `text`
    pub fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        loop {
            // min_by_key keeps the first of equal positions, i.e. insertion order
            let next = self
                .entries
                .iter()
                .filter_map(|(tag, value)| rest.find(tag.as_str()).map(|pos| (pos, tag, value)))
                .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, tag, value)) => {
                    out.push_str(&rest[..pos]);
                    out.push_str(value);
                    rest = &rest[pos + tag.len()..];
                }
                None => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }

    /// Rewrite a file in place
    pub fn apply_to_file(&self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;
        fs::write(path, self.apply(&content)).map_err(|e| {
            Error::IoError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}
