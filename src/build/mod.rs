// src/build/mod.rs

//! Build: configure, compile and install an MPI source tree
//!
//! Every implementation goes through the same state machine:
//!
//! 1. **Configure** - run `./configure --prefix=<install>` if the script exists.
//!    A missing script is not an error, it just means another build path.
//! 2. **Make** - if a `Makefile` now exists, run `make` then `make install`.
//! 3. **Fallback** - otherwise hand over to the implementation's strategy.
//!    Autotools implementations fail here; Intel MPI runs its silent installer.
//!
//! Implementation differences live behind [`BuildStrategy`], looked up by
//! [`strategy_for`].

mod autotools;
mod context;
mod intel;

pub use autotools::Autotools;
pub use context::BuildContext;
pub use intel::{IntelInstaller, INTEL_CONTAINER_PREFIX, INTEL_NESTED_PREFIX};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::experiment::ImplementationId;
use crate::process;
use crate::recipe::TagSet;
use crate::tools::Tool;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Implementation-specific parts of the build and recipe pipeline
pub trait BuildStrategy: Send + Sync {
    /// Implementation this strategy handles
    fn id(&self) -> ImplementationId;

    /// Short name used in template file names (`<distro>_<stem>.def`)
    fn template_stem(&self) -> &'static str;

    /// Directory holding `mpirun` for an install prefix
    fn bin_dir(&self, prefix: &Path) -> PathBuf {
        prefix.join("bin")
    }

    /// Directories holding the MPI shared libraries for an install prefix
    fn lib_dirs(&self, prefix: &Path) -> Vec<PathBuf> {
        vec![prefix.join("lib")]
    }

    /// Extra arguments the launcher needs before the rank count
    fn launcher_args(&self) -> Vec<String> {
        Vec::new()
    }

    /// Install path taken when no `Makefile` exists after configure
    fn install_without_makefile(&self, ctx: &mut BuildContext, config: &SystemConfig) -> Result<()>;

    /// Undo a host install. Only the vendor installer has anything to undo.
    fn uninstall(&self, _ctx: &BuildContext, _config: &SystemConfig) -> Result<()> {
        Ok(())
    }

    /// Substitution set for this implementation's container recipe
    ///
    /// May stage extra files into the context's build directory.
    fn recipe_tags(&self, ctx: &mut BuildContext, config: &SystemConfig) -> Result<TagSet>;
}

static OPENMPI: Autotools = Autotools::new(ImplementationId::OpenMpi, "ompi");
static MPICH: Autotools = Autotools::new(ImplementationId::Mpich, "mpich");
static INTEL: IntelInstaller = IntelInstaller;

static REGISTRY: [&(dyn BuildStrategy); 3] = [&OPENMPI, &MPICH, &INTEL];

/// Look up the strategy for an implementation
pub fn strategy_for(id: ImplementationId) -> Result<&'static dyn BuildStrategy> {
    REGISTRY
        .iter()
        .copied()
        .find(|s| s.id() == id)
        .ok_or_else(|| Error::UnsupportedImplementation(id.to_string()))
}

/// Configure, compile and install the context's extracted source tree
pub fn build(ctx: &mut BuildContext, config: &SystemConfig) -> Result<()> {
    let strategy = strategy_for(ctx.implementation)?;
    let source_dir = ctx.require_source_dir()?.to_path_buf();

    let configure = source_dir.join("configure");
    if configure.is_file() {
        info!("Configuring {} {} (prefix {})", ctx.implementation, ctx.version, ctx.install_dir.display());
        let mut prefix_arg = std::ffi::OsString::from("--prefix=");
        prefix_arg.push(&ctx.install_dir);
        process::run(
            Command::new(&configure)
                .arg(prefix_arg)
                .current_dir(&source_dir),
        )?;
    } else {
        info!("No configure script in {}, skipping configure", source_dir.display());
    }

    if source_dir.join("Makefile").is_file() {
        let make = config.tool(Tool::Make)?;

        info!("Compiling {} {}", ctx.implementation, ctx.version);
        process::run(
            Command::new(&make)
                .arg(format!("-j{}", parallel_jobs()))
                .current_dir(&source_dir),
        )?;

        info!("Installing {} {}", ctx.implementation, ctx.version);
        process::run(Command::new(&make).arg("install").current_dir(&source_dir))?;
    } else {
        info!("No Makefile in {}, using {} install path", source_dir.display(), ctx.implementation);
        strategy.install_without_makefile(ctx, config)?;
    }

    info!("Installed {} {} into {}", ctx.implementation, ctx.version, ctx.install_dir.display());
    Ok(())
}

/// Remove a host install made by [`build`]
pub fn uninstall(ctx: &BuildContext, config: &SystemConfig) -> Result<()> {
    strategy_for(ctx.implementation)?.uninstall(ctx, config)
}

/// Directory holding the host launcher for this context's install
pub fn host_bin_dir(ctx: &BuildContext) -> Result<PathBuf> {
    Ok(strategy_for(ctx.implementation)?.bin_dir(&ctx.install_dir))
}

/// Library directories for this context's install
pub fn host_lib_dirs(ctx: &BuildContext) -> Result<Vec<PathBuf>> {
    Ok(strategy_for(ctx.implementation)?.lib_dirs(&ctx.install_dir))
}

fn parallel_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}
