// src/build/autotools.rs

//! Generic configure/make/install implementations (Open MPI, MPICH)

use super::{BuildContext, BuildStrategy};
use crate::archive::ArchiveFormat;
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::experiment::ImplementationId;
use crate::fetch::{self, SourceLocator};
use crate::recipe::template::{TAG_TAR_ARGS, TAG_TARBALL, TAG_URL, TAG_VERSION};
use crate::recipe::TagSet;

/// An implementation built with the standard autotools flow
#[derive(Debug)]
pub struct Autotools {
    id: ImplementationId,
    template_stem: &'static str,
}

impl Autotools {
    pub const fn new(id: ImplementationId, template_stem: &'static str) -> Self {
        Self { id, template_stem }
    }
}

impl BuildStrategy for Autotools {
    fn id(&self) -> ImplementationId {
        self.id
    }

    fn template_stem(&self) -> &'static str {
        self.template_stem
    }

    fn install_without_makefile(&self, ctx: &mut BuildContext, _config: &SystemConfig) -> Result<()> {
        let source_dir = ctx.require_source_dir()?;
        Err(Error::NotFound(format!(
            "Makefile in {} after configure",
            source_dir.display()
        )))
    }

    /// Version, URL and archive name, plus the extraction flags the recipe
    /// needs to unpack the same archive inside the container build
    fn recipe_tags(&self, ctx: &mut BuildContext, _config: &SystemConfig) -> Result<TagSet> {
        // The recipe downloads the archive itself during the container build
        if let SourceLocator::LocalFile(_) = SourceLocator::parse(&ctx.source_locator)? {
            return Err(Error::UnsupportedScheme(format!(
                "{} (container sources for {} must be remote URLs)",
                ctx.source_locator, self.id
            )));
        }

        let tarball = fetch::archive_name(&ctx.source_locator)?;
        let format = ArchiveFormat::detect(&tarball)?;

        let mut tags = TagSet::new();
        tags.insert(TAG_VERSION, ctx.version.as_str())?;
        tags.insert(TAG_URL, ctx.source_locator.as_str())?;
        tags.insert(TAG_TARBALL, tarball)?;
        tags.insert(TAG_TAR_ARGS, format.tar_flags())?;
        Ok(tags)
    }
}
