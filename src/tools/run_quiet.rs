//! run-quiet-on-success: run a command silently unless it fails.
//!
//! stdout and stderr share one anonymous temporary file so their relative
//! order is kept. The file is unlinked at creation, so nothing is left on
//! disk however this process ends.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::process::Stdio;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ShellkitError;
use crate::tool_runner::{ToolOutput, command_for, wait_tracked};
use crate::tool_traits::{ToolArgs, UserCommand, is_dry_run};

/// Exit status used when the command cannot be found, as in POSIX shells.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status used when the command exists but cannot be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

pub const TOOL_NAME: &str = "run-quiet-on-success";

/// Result of running the wrapped command.
#[derive(Debug)]
pub struct QuietRun {
    pub status: i32,
    /// Combined stdout+stderr, positioned at the start
    pub capture: File,
}

/// Run `command` with both output streams captured into one temp file.
pub fn capture(command: &UserCommand) -> Result<QuietRun> {
    let mut capture = tempfile::tempfile().context("failed to create capture file")?;
    let mut cmd = command_for(command);
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::from(capture.try_clone()?))
        .stderr(Stdio::from(capture.try_clone()?));

    let status = match wait_tracked(&mut cmd, command.program()) {
        Ok(status) => ToolOutput::from_status(status, Vec::new(), Vec::new()).status_code(),
        Err(e) => match spawn_failure_status(&e) {
            Some(code) => {
                writeln!(capture, "{}: {}: {}", TOOL_NAME, command.program, describe(&e))?;
                code
            }
            None => return Err(e),
        },
    };

    capture.seek(SeekFrom::Start(0))?;
    Ok(QuietRun { status, capture })
}

/// Shell-style status for commands that never started.
fn spawn_failure_status(err: &anyhow::Error) -> Option<i32> {
    if let Some(ShellkitError::MissingTool(_)) = err.downcast_ref::<ShellkitError>() {
        return Some(EXIT_NOT_FOUND);
    }
    err.chain()
        .find_map(|cause| cause.downcast_ref::<io::Error>())
        .filter(|io_err| io_err.kind() == io::ErrorKind::PermissionDenied)
        .map(|_| EXIT_NOT_EXECUTABLE)
}

fn describe(err: &anyhow::Error) -> &'static str {
    match spawn_failure_status(err) {
        Some(EXIT_NOT_FOUND) => "command not found",
        _ => "permission denied",
    }
}

/// Replay the capture and an error line when the command failed.
pub fn report<O: Write, E: Write>(
    command: &UserCommand,
    run: &mut QuietRun,
    out: &mut O,
    err: &mut E,
) -> io::Result<()> {
    if run.status == 0 {
        return Ok(());
    }
    io::copy(&mut run.capture, out)?;
    out.flush()?;
    writeln!(
        err,
        "{}: '{}' exited with status {}",
        TOOL_NAME, command.program, run.status
    )
}

/// Run run-quiet-on-success; returns the wrapped command's status.
pub fn run(argv: &[String]) -> Result<i32> {
    let command =
        UserCommand::from_argv(argv).ok_or_else(|| ShellkitError::usage("no command given"))?;

    if is_dry_run() {
        println!("[DRY RUN] {}", command.display_command());
        return Ok(0);
    }

    let mut result = capture(&command)?;
    debug!(status = result.status, "wrapped command finished");
    report(
        &command,
        &mut result,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;
    Ok(result.status)
}
