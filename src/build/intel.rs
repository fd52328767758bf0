// src/build/intel.rs

//! Intel MPI: vendor silent installer instead of configure/make
//!
//! The distribution ships an `install.sh` that reads a silent-install
//! configuration file. The shipped templates for the install and uninstall
//! configurations carry an install-path placeholder that is rewritten for
//! each use: the scratch install prefix on the host, a fixed prefix inside
//! the container.

use super::{BuildContext, BuildStrategy};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::experiment::ImplementationId;
use crate::fetch;
use crate::process;
use crate::recipe::template::{
    TAG_INSTALL_CONFIG, TAG_INSTALL_DIR, TAG_INSTALL_PATH, TAG_NET_IFACE, TAG_TARBALL,
    TAG_UNINSTALL_CONFIG, TAG_VERSION,
};
use crate::recipe::TagSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Where the installer puts `bin/`, `lib/` below the install prefix
pub const INTEL_NESTED_PREFIX: &str = "compilers_and_libraries/linux/mpi/intel64";

/// Install prefix reserved for Intel MPI inside container images
pub const INTEL_CONTAINER_PREFIX: &str = "/opt/intel";

const INSTALL_CONFIG_TEMPLATE: &str = "intel_silent_install.cfg";
const UNINSTALL_CONFIG_TEMPLATE: &str = "intel_silent_uninstall.cfg";
const INSTALL_CONFIG: &str = "silent_install.cfg";
const UNINSTALL_CONFIG: &str = "silent_uninstall.cfg";
const INSTALLER_SCRIPT: &str = "install.sh";

/// Staged silent-installer configuration files
#[derive(Debug, Clone)]
pub struct InstallerConfigs {
    pub install: PathBuf,
    pub uninstall: PathBuf,
}

/// Copy both configuration templates into `dest` and point them at `install_path`
pub fn stage_installer_configs(
    config: &SystemConfig,
    dest: &Path,
    install_path: &str,
) -> Result<InstallerConfigs> {
    let tags = TagSet::new().with(TAG_INSTALL_PATH, install_path)?;
    Ok(InstallerConfigs {
        install: stage_one(config, &tags, INSTALL_CONFIG_TEMPLATE, &dest.join(INSTALL_CONFIG))?,
        uninstall: stage_one(config, &tags, UNINSTALL_CONFIG_TEMPLATE, &dest.join(UNINSTALL_CONFIG))?,
    })
}

fn stage_one(config: &SystemConfig, tags: &TagSet, template: &str, target: &Path) -> Result<PathBuf> {
    let source = config.template_path(template);
    if !source.is_file() {
        return Err(Error::NotFound(format!(
            "installer configuration template {}",
            source.display()
        )));
    }
    fs::copy(&source, target)?;
    tags.apply_to_file(target)?;
    debug!("Staged {}", target.display());
    Ok(target.to_path_buf())
}

/// Run the bundled installer against a silent configuration file
pub fn run_installer(source_dir: &Path, config_file: &Path) -> Result<()> {
    let installer = source_dir.join(INSTALLER_SCRIPT);
    if !installer.is_file() {
        return Err(Error::NotFound(format!("vendor installer {}", installer.display())));
    }

    process::run(
        Command::new(&installer)
            .arg("--silent")
            .arg(config_file)
            .current_dir(source_dir),
    )?;
    Ok(())
}

/// Intel MPI build strategy
#[derive(Debug, Default)]
pub struct IntelInstaller;

impl IntelInstaller {
    /// Uninstall an Intel MPI install at `install_dir` using the installer in `source_dir`
    pub fn uninstall_at(&self, source_dir: &Path, install_dir: &Path, config: &SystemConfig) -> Result<()> {
        let configs = stage_installer_configs(config, source_dir, &install_dir.to_string_lossy())?;
        info!("Uninstalling Intel MPI from {}", install_dir.display());
        run_installer(source_dir, &configs.uninstall)
    }
}

impl BuildStrategy for IntelInstaller {
    fn id(&self) -> ImplementationId {
        ImplementationId::Intel
    }

    fn template_stem(&self) -> &'static str {
        "intel"
    }

    fn bin_dir(&self, prefix: &Path) -> PathBuf {
        prefix.join(INTEL_NESTED_PREFIX).join("bin")
    }

    fn lib_dirs(&self, prefix: &Path) -> Vec<PathBuf> {
        let root = prefix.join(INTEL_NESTED_PREFIX);
        vec![
            root.join("lib").join("release"),
            root.join("lib"),
            root.join("libfabric").join("lib"),
        ]
    }

    fn launcher_args(&self) -> Vec<String> {
        // Even a trivial job needs a libfabric provider on hosts without a fast fabric
        vec!["-genv".to_string(), "FI_PROVIDER".to_string(), "sockets".to_string()]
    }

    fn install_without_makefile(&self, ctx: &mut BuildContext, config: &SystemConfig) -> Result<()> {
        let source_dir = ctx.require_source_dir()?.to_path_buf();
        let configs =
            stage_installer_configs(config, &source_dir, &ctx.install_dir.to_string_lossy())?;

        info!("Running Intel MPI silent installer in {}", source_dir.display());
        run_installer(&source_dir, &configs.install)?;

        ctx.uninstall_config = Some(configs.uninstall);
        Ok(())
    }

    fn uninstall(&self, ctx: &BuildContext, _config: &SystemConfig) -> Result<()> {
        let (Some(source_dir), Some(uninstall_config)) =
            (ctx.source_dir.as_deref(), ctx.uninstall_config.as_deref())
        else {
            debug!("Intel MPI installer never ran for {}, nothing to uninstall", ctx.version);
            return Ok(());
        };

        info!("Uninstalling Intel MPI {} from {}", ctx.version, ctx.install_dir.display());
        run_installer(source_dir, uninstall_config)
    }

    /// Stages the installer configurations (and the archive, which the recipe
    /// copies into the image) next to the recipe, then fills the vendor tags
    fn recipe_tags(&self, ctx: &mut BuildContext, config: &SystemConfig) -> Result<TagSet> {
        if config.network_interface.trim().is_empty() {
            return Err(Error::invalid("network_interface", "must not be empty"));
        }

        if ctx.archive_name.is_none() {
            fetch::acquire(ctx, config)?;
        }
        let configs = stage_installer_configs(config, &ctx.build_dir, INTEL_CONTAINER_PREFIX)?;

        let tarball = ctx
            .archive_name
            .clone()
            .ok_or_else(|| Error::NotFound(format!("acquired archive for {}", ctx.source_locator)))?;
        let bin_dir = self.bin_dir(Path::new(INTEL_CONTAINER_PREFIX));

        let mut tags = TagSet::new();
        tags.insert(TAG_VERSION, ctx.version.as_str())?;
        tags.insert(TAG_TARBALL, tarball)?;
        tags.insert(TAG_INSTALL_DIR, bin_dir.to_string_lossy())?;
        tags.insert(TAG_INSTALL_CONFIG, file_name(&configs.install))?;
        tags.insert(TAG_UNINSTALL_CONFIG, file_name(&configs.uninstall))?;
        tags.insert(TAG_NET_IFACE, config.network_interface.as_str())?;
        Ok(tags)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(INSTALL_CONFIG_TEMPLATE),
            "ACCEPT_EULA=accept\nPSET_INSTALL_DIR=@INSTALL_PATH@\nPSET_MODE=install\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(UNINSTALL_CONFIG_TEMPLATE),
            "PSET_INSTALL_DIR=@INSTALL_PATH@\nPSET_MODE=uninstall\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_stage_installer_configs() {
        let templates = template_dir();
        let dest = tempfile::tempdir().unwrap();
        let config = SystemConfig::default().with_template_dir(templates.path());

        let staged = stage_installer_configs(&config, dest.path(), "/scratch/install").unwrap();
        assert_eq!(staged.install, dest.path().join(INSTALL_CONFIG));
        assert_eq!(staged.uninstall, dest.path().join(UNINSTALL_CONFIG));

        let install = fs::read_to_string(&staged.install).unwrap();
        assert!(install.contains("PSET_INSTALL_DIR=/scratch/install\n"));
        assert!(install.contains("PSET_MODE=install"));
        let uninstall = fs::read_to_string(&staged.uninstall).unwrap();
        assert!(uninstall.contains("PSET_MODE=uninstall"));
    }

    #[test]
    fn test_stage_missing_template() {
        let dest = tempfile::tempdir().unwrap();
        let config = SystemConfig::default().with_template_dir("/nonexistent");
        assert!(matches!(
            stage_installer_configs(&config, dest.path(), "/x"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_recipe_tags_for_local_archive() {
        let templates = template_dir();
        let sources = tempfile::tempdir().unwrap();
        let archive = sources.path().join("l_mpi_2019.4.243.tgz");
        fs::write(&archive, b"archive").unwrap();

        let config = SystemConfig::default()
            .with_template_dir(templates.path())
            .with_network_interface("ib0");
        let locator = format!("file://{}", archive.display());
        let mut ctx = BuildContext::new(ImplementationId::Intel, "2019.4", &locator, None).unwrap();

        let tags = IntelInstaller.recipe_tags(&mut ctx, &config).unwrap();
        assert_eq!(tags.get(TAG_VERSION), Some("2019.4"));
        assert_eq!(tags.get(TAG_TARBALL), Some("l_mpi_2019.4.243.tgz"));
        assert_eq!(
            tags.get(TAG_INSTALL_DIR),
            Some("/opt/intel/compilers_and_libraries/linux/mpi/intel64/bin")
        );
        assert_eq!(tags.get(TAG_INSTALL_CONFIG), Some(INSTALL_CONFIG));
        assert_eq!(tags.get(TAG_UNINSTALL_CONFIG), Some(UNINSTALL_CONFIG));
        assert_eq!(tags.get(TAG_NET_IFACE), Some("ib0"));

        // Archive and configs sit next to the recipe for the container build
        assert!(ctx.build_dir.join("l_mpi_2019.4.243.tgz").is_file());
        let staged = fs::read_to_string(ctx.build_dir.join(INSTALL_CONFIG)).unwrap();
        assert!(staged.contains("PSET_INSTALL_DIR=/opt/intel\n"));
    }

    #[test]
    fn test_recipe_tags_use_acquired_archive_name() {
        let templates = template_dir();
        let config = SystemConfig::default()
            .with_template_dir(templates.path())
            .with_network_interface("eth0");
        let mut ctx = BuildContext::new(
            ImplementationId::Intel,
            "2019.4",
            "https://downloads.example.org/mpi/latest.tgz",
            None,
        )
        .unwrap();
        let archive = ctx.build_dir.join("l_mpi_2019.4.243.tgz");
        fs::write(&archive, b"archive").unwrap();
        ctx.archive_name = Some("l_mpi_2019.4.243.tgz".to_string());
        ctx.archive_path = Some(archive);

        let tags = IntelInstaller.recipe_tags(&mut ctx, &config).unwrap();
        assert_eq!(tags.get(TAG_TARBALL), Some("l_mpi_2019.4.243.tgz"));
    }

    #[test]
    fn test_uninstall_without_install_is_noop() {
        let config = SystemConfig::default();
        let ctx = BuildContext::new(ImplementationId::Intel, "2019.4", "file:///x.tgz", None).unwrap();
        assert!(IntelInstaller.uninstall(&ctx, &config).is_ok());
    }

    #[test]
    fn test_launcher_args_name_a_provider() {
        let args = IntelInstaller.launcher_args();
        assert!(args.contains(&"FI_PROVIDER".to_string()));
    }
}
