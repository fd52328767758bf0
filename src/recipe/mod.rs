// src/recipe/mod.rs

//! Container recipe templating
//!
//! Each (implementation, test mode) pair maps to exactly one template file
//! under the template directory:
//!
//! | implementation | functional          | benchmark                   |
//! |----------------|---------------------|-----------------------------|
//! | openmpi        | `ubuntu_ompi.def`   | `ubuntu_ompi_netpipe.def`   |
//! | mpich          | `ubuntu_mpich.def`  | `ubuntu_mpich_netpipe.def`  |
//! | intel          | `ubuntu_intel.def`  | `ubuntu_intel_netpipe.def`  |
//!
//! (`ubuntu` is the configurable distro prefix.) The template and the
//! functional test source are copied next to each other in the container
//! build directory, then the implementation's [`TagSet`] is applied to the
//! copied recipe.

pub mod template;

pub use template::TagSet;

use crate::build::{self, BuildContext};
use crate::config::{SystemConfig, TestMode};
use crate::error::{Error, Result};
use crate::experiment::ImplementationId;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Functional MPI test compiled inside the container
pub const TEST_SOURCE: &str = "mpitest.c";

/// Template file name for an implementation and test mode
pub fn template_name(implementation: ImplementationId, mode: TestMode, distro: &str) -> Result<String> {
    let stem = build::strategy_for(implementation)?.template_stem();
    Ok(match mode {
        TestMode::Functional => format!("{}_{}.def", distro, stem),
        TestMode::Benchmark => format!("{}_{}_netpipe.def", distro, stem),
    })
}

/// Produce a ready-to-build recipe in the context's build directory
pub fn prepare_recipe(ctx: &mut BuildContext, config: &SystemConfig) -> Result<PathBuf> {
    let strategy = build::strategy_for(ctx.implementation)?;
    let name = template_name(ctx.implementation, config.test_mode, &config.distro)?;

    let template = config.template_path(&name);
    if !template.is_file() {
        return Err(Error::NotFound(format!("recipe template {}", template.display())));
    }
    let test_source = config.template_path(TEST_SOURCE);
    if !test_source.is_file() {
        return Err(Error::NotFound(format!("test source {}", test_source.display())));
    }

    let recipe = ctx.build_dir.join(&name);
    fs::copy(&template, &recipe)?;
    fs::copy(&test_source, ctx.build_dir.join(TEST_SOURCE))?;

    let tags = strategy.recipe_tags(ctx, config)?;
    tags.apply_to_file(&recipe)?;

    info!("Prepared recipe {} ({} tags)", recipe.display(), tags.len());
    ctx.recipe_path = Some(recipe.clone());
    Ok(recipe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_names_are_distinct() {
        let mut names = std::collections::HashSet::new();
        for id in ImplementationId::ALL {
            for mode in [TestMode::Functional, TestMode::Benchmark] {
                assert!(names.insert(template_name(id, mode, "ubuntu").unwrap()));
            }
        }
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_template_name_format() {
        assert_eq!(
            template_name(ImplementationId::OpenMpi, TestMode::Functional, "ubuntu").unwrap(),
            "ubuntu_ompi.def"
        );
        assert_eq!(
            template_name(ImplementationId::Mpich, TestMode::Benchmark, "centos").unwrap(),
            "centos_mpich_netpipe.def"
        );
    }

    #[test]
    fn test_prepare_recipe_missing_template() {
        let config = SystemConfig::default().with_template_dir("/nonexistent");
        let mut ctx = BuildContext::new(
            ImplementationId::OpenMpi,
            "4.0.1",
            "https://example.org/openmpi-4.0.1.tar.bz2",
            None,
        )
        .unwrap();
        assert!(matches!(
            prepare_recipe(&mut ctx, &config),
            Err(Error::NotFound(_))
        ));
    }
}
