// src/process.rs

//! Running external tools
//!
//! Two flavours: [`run`] blocks until the tool exits and turns a non-zero
//! exit into [`Error::CommandFailed`], [`run_with_deadline`] additionally
//! kills the tool's whole process group when the deadline passes and reports
//! that as [`Completion::TimedOut`] so the caller can decide what a timeout
//! means.

use crate::error::{Error, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::{self, Read};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// How a command run under a deadline ended
#[derive(Debug, Clone)]
pub enum Completion {
    /// The process exited on its own
    Exited {
        code: Option<i32>,
        success: bool,
        stdout: String,
        stderr: String,
    },
    /// The deadline passed and the process group was killed
    TimedOut { stdout: String, stderr: String },
}

/// Render a command for logs and error messages
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn spawn_error(cmd: &Command, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::ToolNotFound(cmd.get_program().to_string_lossy().into_owned())
    } else {
        Error::IoError(format!("Failed to run {}: {}", describe(cmd), e))
    }
}

fn log_output(command: &str, stdout: &str, stderr: &str) {
    for line in stdout.lines() {
        debug!("[{}] {}", command, line);
    }
    for line in stderr.lines() {
        debug!("[{}] stderr: {}", command, line);
    }
}

/// Run a command to completion, failing on a non-zero exit
pub fn run(cmd: &mut Command) -> Result<CommandOutput> {
    let command = describe(cmd);
    debug!("Running: {}", command);

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(cmd, e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(Error::CommandFailed {
            command,
            code: output.status.code(),
            stdout,
            stderr,
        });
    }

    log_output(&command, &stdout, &stderr);
    Ok(CommandOutput { stdout, stderr })
}

/// Run a command in its own process group with a hard deadline
pub fn run_with_deadline(cmd: &mut Command, timeout: Duration) -> Result<Completion> {
    let command = describe(cmd);
    debug!("Running with {}s deadline: {}", timeout.as_secs(), command);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .map_err(|e| spawn_error(cmd, e))?;

    // Drain both pipes concurrently so a chatty child never blocks on a full pipe
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = match child.wait_timeout(timeout) {
        Ok(status) => status,
        Err(e) => {
            kill_group(&mut child);
            return Err(Error::IoError(format!("Failed to wait for {}: {}", command, e)));
        }
    };

    match status {
        Some(status) => {
            // Anything the launcher left behind in its group would hold the pipes open
            signal_group(&child);
            let stdout = collect(stdout_reader);
            let stderr = collect(stderr_reader);
            log_output(&command, &stdout, &stderr);
            Ok(Completion::Exited {
                code: status.code(),
                success: status.success(),
                stdout,
                stderr,
            })
        }
        None => {
            warn!("{} exceeded its {}s deadline, killing", command, timeout.as_secs());
            kill_group(&mut child);
            Ok(Completion::TimedOut {
                stdout: collect(stdout_reader),
                stderr: collect(stderr_reader),
            })
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

fn signal_group(child: &Child) {
    // The child leads its own group, so its pid is the group id
    if let Ok(pid) = i32::try_from(child.id()) {
        let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
    }
}

fn kill_group(child: &mut Child) {
    signal_group(child);
    let _ = child.kill();
    let _ = child.wait();
}
