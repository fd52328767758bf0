// tests/common/mod.rs

//! Shared test utilities for integration tests.
//!
//! A [`TestBed`] is a temp directory holding fake external tools (download,
//! make, sudo, container runtime), a "mirror" that the fake download tool
//! copies from, and a `job.sh` that stands in for the test binary inside the
//! container. Source archives are real tarballs built with the `tar` and
//! `flate2` crates; extraction uses the system `tar`.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use mpi_compat::{SystemConfig, Tool};
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Host launcher shipped in the fixture archives: drops launcher options up
/// to and including `-np N`, then runs the rest of the command line
const FAKE_MPIRUN: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
    case "$1" in
        -np) shift 2; break ;;
        *) shift ;;
    esac
done
exec "$@"
"#;

/// Autotools configure: records the prefix for the fake make
const FAKE_CONFIGURE: &str = r#"#!/bin/sh
prefix="${1#--prefix=}"
echo "PREFIX=$prefix" > Makefile
"#;

/// Vendor installer: reads the silent configuration and logs each run
const FAKE_INSTALLER: &str = r#"#!/bin/sh
[ "$1" = "--silent" ] || { echo "Usage: install.sh --silent <config>"; exit 1; }
. "$2"
root="$PSET_INSTALL_DIR/compilers_and_libraries/linux/mpi/intel64"
here="$(cd "$(dirname "$0")" && pwd)"
if [ "$PSET_MODE" = "install" ]; then
    mkdir -p "$root/bin" "$root/lib/release"
    cp "$here/mpirun.in" "$root/bin/mpirun"
    chmod 755 "$root/bin/mpirun"
else
    rm -rf "$PSET_INSTALL_DIR/compilers_and_libraries"
fi
echo "$PSET_MODE $PSET_INSTALL_DIR" >> "@LOG@"
"#;

const FAKE_MAKE: &str = r#"#!/bin/sh
[ -f Makefile ] || { echo "make: *** No targets specified and no makefile found." >&2; exit 2; }
. ./Makefile
if [ "$1" = "install" ]; then
    mkdir -p "$PREFIX/bin" "$PREFIX/lib"
    cp mpirun.in "$PREFIX/bin/mpirun"
    chmod 755 "$PREFIX/bin/mpirun"
fi
"#;

const FAKE_WGET: &str = r#"#!/bin/sh
dest=.
while [ $# -gt 1 ]; do
    case "$1" in
        -P) dest="$2"; shift 2 ;;
        *) shift ;;
    esac
done
cp "@MIRROR@/${1##*/}" "$dest/" || exit 8
"#;

const FAKE_SUDO: &str = "#!/bin/sh\nexec \"$@\"\n";

const FAKE_SINGULARITY: &str = r#"#!/bin/sh
case "$1" in
    build) touch "$2" ;;
    exec) shift 2; exec /bin/sh "@BED@/job.sh" "$@" ;;
    *) echo "Usage: singularity build|exec" >&2; exit 1 ;;
esac
"#;

/// A job that behaves like a working two-rank hello world
pub const JOB_PASS: &str = "echo 'Hello from rank 0 of 2'\necho 'Hello from rank 1 of 2'\n";

/// A job that never finishes on its own
pub const JOB_HANG: &str = "sleep 30\n";

/// A launcher that rejects its arguments but still exits zero
pub const JOB_USAGE_BANNER: &str = "echo 'Usage: mpirun [OPTION]... [PROGRAM]...'\nexit 0\n";

/// A job that crashes
pub const JOB_CRASH: &str = "echo 'rank 1: segmentation fault' >&2\nexit 139\n";

/// Temp directory with fake tools and fixture sources
pub struct TestBed {
    pub dir: TempDir,
    pub bin: PathBuf,
    pub mirror: PathBuf,
    pub sources: PathBuf,
    pub scratch: PathBuf,
    pub output: PathBuf,
    pub installer_log: PathBuf,
}

impl TestBed {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let bed = Self {
            bin: root.join("bin"),
            mirror: root.join("mirror"),
            sources: root.join("sources"),
            scratch: root.join("scratch"),
            output: root.join("results.txt"),
            installer_log: root.join("installer.log"),
            dir,
        };
        for d in [&bed.bin, &bed.mirror, &bed.sources, &bed.scratch] {
            fs::create_dir_all(d).unwrap();
        }

        let root = root.to_string_lossy();
        write_script(&bed.bin.join("wget"), &FAKE_WGET.replace("@MIRROR@", &bed.mirror.to_string_lossy()));
        write_script(&bed.bin.join("make"), FAKE_MAKE);
        write_script(&bed.bin.join("sudo"), FAKE_SUDO);
        write_script(&bed.bin.join("singularity"), &FAKE_SINGULARITY.replace("@BED@", &root));
        bed.set_job(JOB_PASS);
        bed
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Replace what the "test binary" inside the container does
    pub fn set_job(&self, body: &str) {
        fs::write(self.root().join("job.sh"), body).unwrap();
    }

    /// Config wired to the fake tools, the shipped templates and this bed
    pub fn config(&self) -> SystemConfig {
        SystemConfig::default()
            .with_template_dir(templates_dir())
            .with_output_file(&self.output)
            .with_scratch_root(&self.scratch)
            .with_job_timeout(Duration::from_secs(10))
            .with_tool(Tool::Download, self.bin.join("wget"))
            .with_tool(Tool::Make, self.bin.join("make"))
            .with_tool(Tool::Sudo, self.bin.join("sudo"))
            .with_tool(Tool::Container, self.bin.join("singularity"))
    }

    /// Remote URL served by the fake download tool, backed by a mirror archive
    pub fn autotools_remote(&self, name: &str, version: &str) -> String {
        let file = format!("{}-{}.tar.gz", name, version);
        autotools_archive(&self.mirror.join(&file), &format!("{}-{}", name, version));
        format!("https://download.example.org/{}/{}", name, file)
    }

    /// `file://` locator for a local autotools archive
    pub fn autotools_local(&self, name: &str, version: &str) -> String {
        let path = self.sources.join(format!("{}-{}.tar.gz", name, version));
        autotools_archive(&path, &format!("{}-{}", name, version));
        format!("file://{}", path.display())
    }

    /// `file://` locator for a vendor distribution with a silent installer
    pub fn intel_local(&self, version: &str) -> String {
        let top = format!("l_mpi_{}", version);
        let path = self.sources.join(format!("{}.tgz", top));
        let installer = FAKE_INSTALLER.replace("@LOG@", &self.installer_log.to_string_lossy());
        write_tar_gz(
            &path,
            &[
                (format!("{}/install.sh", top).as_str(), installer.as_str(), 0o755),
                (format!("{}/mpirun.in", top).as_str(), FAKE_MPIRUN, 0o755),
            ],
        );
        format!("file://{}", path.display())
    }

    /// Lines the fake vendor installer logged (`install <dir>`, `uninstall <dir>`)
    pub fn installer_runs(&self) -> Vec<String> {
        fs::read_to_string(&self.installer_log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Entries left under the scratch root
    pub fn scratch_entries(&self) -> usize {
        fs::read_dir(&self.scratch).unwrap().count()
    }
}

/// Templates shipped with the crate
pub fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// Source tree with a configure script and a launcher for the fake make to install
pub fn autotools_archive(path: &Path, top: &str) {
    write_tar_gz(
        path,
        &[
            (format!("{}/configure", top).as_str(), FAKE_CONFIGURE, 0o755),
            (format!("{}/mpirun.in", top).as_str(), FAKE_MPIRUN, 0o755),
            (format!("{}/README", top).as_str(), "fixture\n", 0o644),
        ],
    );
}

/// Write a gzip-compressed tarball of (path, contents, mode) entries
pub fn write_tar_gz(path: &Path, entries: &[(&str, &str, u32)]) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    for (name, contents, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(*mode);
        builder.append_data(&mut header, name, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
