// src/container/mod.rs

//! Container build: turn a finished recipe into an image
//!
//! Runs `sudo singularity build <image> <recipe>` from the build directory so
//! that files staged next to the recipe (test source, vendor archive and
//! configuration files) resolve. Image builds are slow, so they get their own,
//! longer deadline; running past it is a pipeline error.

use crate::build::BuildContext;
use crate::config::{SystemConfig, TestMode};
use crate::error::{Error, Result};
use crate::process::{self, Completion};
use crate::tools::Tool;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Functional test binary inside every image
pub const FUNCTIONAL_TEST_PATH: &str = "/opt/mpitest";

/// NetPIPE MPI benchmark binary inside every benchmark image
pub const BENCHMARK_TEST_PATH: &str = "/opt/NetPIPE-5.1.4/NPmpi";

/// In-image path of the program the job runs
pub fn test_binary_path(mode: TestMode) -> &'static Path {
    match mode {
        TestMode::Functional => Path::new(FUNCTIONAL_TEST_PATH),
        TestMode::Benchmark => Path::new(BENCHMARK_TEST_PATH),
    }
}

/// Image file name for a context
pub fn image_name(ctx: &BuildContext) -> String {
    format!("{}-{}.sif", ctx.implementation, ctx.version)
}

/// Build the context's recipe into an image
pub fn build_image(ctx: &mut BuildContext, config: &SystemConfig) -> Result<PathBuf> {
    let recipe = ctx
        .recipe_path
        .clone()
        .ok_or_else(|| Error::invalid("build context", "no recipe prepared"))?;

    let sudo = config.tool(Tool::Sudo)?;
    let singularity = config.tool(Tool::Container)?;
    let image = ctx.build_dir.join(image_name(ctx));
    let timeout = config.container_build_timeout();

    info!("Building image {} from {}", image.display(), recipe.display());
    let mut cmd = Command::new(&sudo);
    cmd.arg(&singularity)
        .arg("build")
        .arg(&image)
        .arg(&recipe)
        .current_dir(&ctx.build_dir);
    let command = process::describe(&cmd);

    match process::run_with_deadline(&mut cmd, timeout)? {
        Completion::Exited {
            success: true, ..
        } => {}
        Completion::Exited {
            code,
            stdout,
            stderr,
            ..
        } => {
            return Err(Error::CommandFailed {
                command,
                code,
                stdout,
                stderr,
            });
        }
        Completion::TimedOut { stdout, stderr } => {
            return Err(Error::CommandTimedOut {
                command,
                seconds: timeout.as_secs(),
                stdout,
                stderr,
            });
        }
    }

    let test_path = test_binary_path(config.test_mode).to_path_buf();
    info!("Built image {} (test binary {})", image.display(), test_path.display());
    ctx.image_path = Some(image.clone());
    ctx.container_test_path = Some(test_path);
    Ok(image)
}
