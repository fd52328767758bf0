// src/exec/mod.rs

//! Execution and adjudication of the cross-version job
//!
//! The host's freshly built `mpirun` launches the test binary inside the
//! container image:
//!
//! ```text
//! <host-install>/bin/mpirun [impl args] -np <ranks> singularity exec <image> <test>
//! ```
//!
//! with `PATH` and `LD_LIBRARY_PATH` set to prefer the host install. The run
//! ends in one of three ways:
//!
//! - [`JobOutcome::Success`] - zero exit, within the deadline, no usage banner
//! - [`JobOutcome::SoftFail`] - a valid FAIL result for the ledger
//! - `Err(_)` - the pipeline could not run the job at all
//!
//! A usage banner after a zero exit counts as a failure: some launchers print
//! their help text and exit 0 when given arguments they do not understand.

pub mod parser;

pub use parser::{NetPipeParser, NoMetrics, OutputParser};

use crate::build::{self, BuildContext};
use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::ledger::Verdict;
use crate::process::{self, Completion};
use crate::tools::Tool;
use regex::Regex;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{info, warn};

static USAGE_BANNER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*Usage:").unwrap());

/// Why a job counted as a failed experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftFailReason {
    /// The launcher exited non-zero (`None` when killed by a signal)
    NonZeroExit(Option<i32>),
    /// The deadline passed and the job was killed
    DeadlineExceeded(Duration),
    /// The launcher printed a usage banner instead of running the job
    UsageBanner,
}

impl fmt::Display for SoftFailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonZeroExit(Some(code)) => write!(f, "exited with code {}", code),
            Self::NonZeroExit(None) => write!(f, "terminated by a signal"),
            Self::DeadlineExceeded(d) => write!(f, "exceeded the {}s deadline", d.as_secs()),
            Self::UsageBanner => write!(f, "printed a usage banner"),
        }
    }
}

/// Output of a successful job
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub stdout: String,
    pub stderr: String,
    /// Extracted metrics, empty when there are none
    pub note: String,
}

/// Adjudicated result of one job
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(JobReport),
    SoftFail {
        reason: SoftFailReason,
        stdout: String,
        stderr: String,
    },
}

impl JobOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn verdict(&self) -> Verdict {
        if self.passed() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Metrics note, empty for failures and functional tests
    pub fn note(&self) -> &str {
        match self {
            Self::Success(report) => &report.note,
            Self::SoftFail { .. } => "",
        }
    }
}

/// Whether launcher output is a usage/help banner
pub fn is_usage_banner(stdout: &str) -> bool {
    USAGE_BANNER.is_match(stdout)
}

/// Classify a finished or killed job
///
/// Metric extraction is left to the caller; a `Success` here has an empty note.
pub fn classify(completion: Completion, timeout: Duration) -> JobOutcome {
    match completion {
        Completion::TimedOut { stdout, stderr } => JobOutcome::SoftFail {
            reason: SoftFailReason::DeadlineExceeded(timeout),
            stdout,
            stderr,
        },
        Completion::Exited {
            success: false,
            code,
            stdout,
            stderr,
        } => JobOutcome::SoftFail {
            reason: SoftFailReason::NonZeroExit(code),
            stdout,
            stderr,
        },
        Completion::Exited { stdout, stderr, .. } if is_usage_banner(&stdout) => {
            JobOutcome::SoftFail {
                reason: SoftFailReason::UsageBanner,
                stdout,
                stderr,
            }
        }
        Completion::Exited { stdout, stderr, .. } => JobOutcome::Success(JobReport {
            stdout,
            stderr,
            note: String::new(),
        }),
    }
}

fn prepend_paths(dirs: &[PathBuf], var: &str) -> Result<OsString> {
    let mut paths: Vec<PathBuf> = dirs.to_vec();
    if let Some(existing) = env::var_os(var) {
        paths.extend(env::split_paths(&existing));
    }
    env::join_paths(paths)
        .map_err(|e| Error::invalid("install path", format!("cannot be used in {}: {}", var, e)))
}

/// Build the launcher command for a host install and a container image
pub fn launch_command(
    host: &BuildContext,
    container: &BuildContext,
    config: &SystemConfig,
) -> Result<Command> {
    let strategy = build::strategy_for(host.implementation)?;
    let bin_dir = build::host_bin_dir(host)?;
    let mpirun = bin_dir.join("mpirun");
    if !mpirun.is_file() {
        return Err(Error::NotFound(format!("host launcher {}", mpirun.display())));
    }

    let image = container.require_image()?;
    let test_path = container
        .container_test_path
        .as_deref()
        .ok_or_else(|| Error::invalid("build context", "no test binary path for image"))?;
    let singularity = config.tool(Tool::Container)?;

    let path = prepend_paths(&[bin_dir.clone()], "PATH")?;
    let ld_path = prepend_paths(&build::host_lib_dirs(host)?, "LD_LIBRARY_PATH")?;

    let mut cmd = Command::new(&mpirun);
    cmd.args(strategy.launcher_args())
        .arg("-np")
        .arg(config.ranks.to_string())
        .arg(&singularity)
        .arg("exec")
        .arg(image)
        .arg(test_path)
        .env("PATH", path)
        .env("LD_LIBRARY_PATH", ld_path)
        .current_dir(&container.build_dir);
    Ok(cmd)
}

/// Run and adjudicate the job, extracting metrics in benchmark mode
pub fn run_job(host: &BuildContext, container: &BuildContext, config: &SystemConfig) -> Result<JobOutcome> {
    if config.test_mode.is_benchmark() {
        run_job_with_parser(host, container, config, &NetPipeParser)
    } else {
        run_job_with_parser(host, container, config, &NoMetrics)
    }
}

/// Run and adjudicate the job with an explicit output parser
pub fn run_job_with_parser(
    host: &BuildContext,
    container: &BuildContext,
    config: &SystemConfig,
    parser: &dyn OutputParser,
) -> Result<JobOutcome> {
    let mut cmd = launch_command(host, container, config)?;
    let timeout = config.job_timeout();

    info!(
        "Running {} host {} against container {}",
        host.implementation, host.version, container.version
    );
    let completion = process::run_with_deadline(&mut cmd, timeout)?;

    let outcome = match classify(completion, timeout) {
        JobOutcome::Success(mut report) => {
            report.note = parser.parse(&report.stdout).unwrap_or_default();
            JobOutcome::Success(report)
        }
        soft_fail => soft_fail,
    };

    match &outcome {
        JobOutcome::Success(report) if !report.note.is_empty() => {
            info!("Job succeeded: {} ({})", report.note, parser.name())
        }
        JobOutcome::Success(_) => info!("Job succeeded"),
        JobOutcome::SoftFail { reason, .. } => warn!("Job failed: {}", reason),
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: i32, stdout: &str) -> Completion {
        Completion::Exited {
            code: Some(code),
            success: code == 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(120);

    #[test]
    fn test_zero_exit_is_success() {
        let outcome = classify(exited(0, "Hello from rank 0\nHello from rank 1\n"), TIMEOUT);
        assert!(outcome.passed());
        assert_eq!(outcome.verdict(), Verdict::Pass);
        assert_eq!(outcome.note(), "");
    }

    #[test]
    fn test_non_zero_exit_is_soft_fail() {
        let outcome = classify(exited(1, ""), TIMEOUT);
        assert!(matches!(
            outcome,
            JobOutcome::SoftFail {
                reason: SoftFailReason::NonZeroExit(Some(1)),
                ..
            }
        ));
        assert_eq!(outcome.verdict(), Verdict::Fail);
    }

    #[test]
    fn test_usage_banner_after_zero_exit_is_soft_fail() {
        let outcome = classify(exited(0, "Usage: mpirun [OPTION]... [PROGRAM]...\n"), TIMEOUT);
        assert!(matches!(
            outcome,
            JobOutcome::SoftFail {
                reason: SoftFailReason::UsageBanner,
                ..
            }
        ));
    }

    #[test]
    fn test_deadline_is_soft_fail() {
        let outcome = classify(
            Completion::TimedOut {
                stdout: String::new(),
                stderr: String::new(),
            },
            TIMEOUT,
        );
        match outcome {
            JobOutcome::SoftFail { reason, .. } => {
                assert_eq!(reason, SoftFailReason::DeadlineExceeded(TIMEOUT));
                assert_eq!(reason.to_string(), "exceeded the 120s deadline");
            }
            JobOutcome::Success(_) => panic!("timeout must not pass"),
        }
    }

    #[test]
    fn test_usage_banner_detection() {
        assert!(is_usage_banner("Usage: mpiexec [options]"));
        assert!(is_usage_banner("mpiexec: bad option\n  Usage: mpiexec -n <np> <prog>\n"));
        assert!(!is_usage_banner("rank 0: see Usage: notes"));
        assert!(!is_usage_banner("Hello from rank 0"));
    }

    #[test]
    fn test_prepend_paths_puts_install_first() {
        let joined = prepend_paths(&[PathBuf::from("/scratch/install/bin")], "PATH").unwrap();
        let first = env::split_paths(&joined).next().unwrap();
        assert_eq!(first, PathBuf::from("/scratch/install/bin"));
    }
}
