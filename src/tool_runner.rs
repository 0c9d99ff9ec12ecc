//! Delegate execution
//!
//! All external programs go through this module so that every invocation is
//! logged, honours dry-run mode, maps "program not found" to
//! [`ShellkitError::MissingTool`], and registers non-interactive children
//! with the [`ChildRegistry`] for signal teardown.

use crate::error::ShellkitError;
use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::tool_traits::{ToolArgs, is_dry_run};
use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use std::io::ErrorKind;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use tracing::{debug, info};

/// How the delegate's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// stdin closed, stdout/stderr captured into [`ToolOutput`]
    Capture,
    /// All streams inherited; child tracked for signal teardown
    Inherit,
    /// All streams inherited; child owns the terminal and is left alone
    Interactive,
}

/// Output from a delegate execution.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Captured stdout (empty unless `OutputMode::Capture`).
    pub stdout: String,
    /// Captured stderr (empty unless `OutputMode::Capture`).
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Terminating signal, if any.
    pub signal: Option<i32>,
    /// Whether the delegate exited with status 0.
    pub success: bool,
    /// Whether execution was skipped because of dry-run mode.
    pub dry_run: bool,
}

impl ToolOutput {
    pub fn from_status(status: ExitStatus, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            signal: status.signal(),
            success: status.success(),
            dry_run: false,
        }
    }

    fn skipped() -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            dry_run: true,
            ..Self::default()
        }
    }

    /// Exit status a shell would report: the code, or 128 + signal.
    pub fn status_code(&self) -> i32 {
        match (self.exit_code, self.signal) {
            (Some(code), _) => code,
            (None, Some(sig)) => 128 + sig,
            (None, None) => 1,
        }
    }

    /// Return a [`ShellkitError::Delegate`] unless the delegate succeeded.
    pub fn ensure_success(&self, program: &str) -> crate::error::Result<()> {
        if self.success {
            Ok(())
        } else {
            let stderr = self.stderr.trim();
            if !stderr.is_empty() {
                debug!(program, stderr, "delegate stderr");
            }
            Err(ShellkitError::delegate(program, self.status_code()))
        }
    }
}

/// Build a `Command` for typed delegate arguments.
pub fn command_for<T: ToolArgs + ?Sized>(args: &T) -> Command {
    let mut cmd = Command::new(args.program());
    cmd.args(args.to_cli_args());
    for (key, value) in args.get_env_vars() {
        cmd.env(key, value);
    }
    cmd
}

/// Spawn and register a tracked child.
fn spawn_tracked(cmd: &mut Command, program: &str) -> Result<Child> {
    cmd.with_parent_death_signal();
    let child = spawn_mapped(cmd, program)?;
    let registry = ChildRegistry::global();
    ChildRegistry::lock_global(&registry).register(child.id());
    Ok(child)
}

/// Spawn a tracked child as leader of a new process group, so teardown also
/// reaches the processes it starts.
fn spawn_group_tracked(cmd: &mut Command, program: &str) -> Result<Child> {
    cmd.in_new_process_group();
    let child = spawn_mapped(cmd, program)?;
    let registry = ChildRegistry::global();
    ChildRegistry::lock_global(&registry).register_group_leader(child.id());
    Ok(child)
}

fn untrack(pid: u32) {
    let registry = ChildRegistry::global();
    ChildRegistry::lock_global(&registry).unregister(pid);
}

fn spawn_mapped(cmd: &mut Command, program: &str) -> Result<Child> {
    cmd.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound => anyhow::Error::new(ShellkitError::missing_tool(program)),
        _ => anyhow::Error::new(e).context(format!("failed to spawn {}", program)),
    })
}

/// Run a prepared command as a tracked child and wait for it.
///
/// Stdio must already be configured by the caller.
pub fn wait_tracked(cmd: &mut Command, program: &str) -> Result<ExitStatus> {
    let mut child = spawn_tracked(cmd, program)?;
    let pid = child.id();
    let status = child.wait();
    untrack(pid);
    status.with_context(|| format!("failed waiting for {}", program))
}

/// Dry-run skips everything except read-only queries.
fn skipped_in_dry_run<T: ToolArgs + ?Sized>(args: &T, dry_run: bool) -> bool {
    dry_run && !args.read_only()
}

/// Execute a delegate with typed arguments.
pub fn run_tool<T: ToolArgs + ?Sized>(args: &T, mode: OutputMode) -> Result<ToolOutput> {
    let program = args.program().to_string();
    let env_vars = args.get_env_vars();
    info!(
        "run_tool: {} args={:?} env={:?} mode={:?}",
        program,
        args.to_cli_args(),
        env_vars,
        mode
    );

    if skipped_in_dry_run(args, is_dry_run()) {
        println!("[DRY RUN] {}", args.display_command());
        return Ok(ToolOutput::skipped());
    }

    let mut cmd = command_for(args);
    let output = match mode {
        OutputMode::Capture => {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let child = spawn_tracked(&mut cmd, &program)?;
            let pid = child.id();
            let output = child.wait_with_output();
            untrack(pid);
            let output = output.with_context(|| format!("failed waiting for {}", program))?;
            ToolOutput::from_status(output.status, output.stdout, output.stderr)
        }
        OutputMode::Inherit => {
            let status = wait_tracked(&mut cmd, &program)?;
            ToolOutput::from_status(status, Vec::new(), Vec::new())
        }
        OutputMode::Interactive => {
            let status = spawn_mapped(&mut cmd, &program)?
                .wait()
                .with_context(|| format!("failed waiting for {}", program))?;
            ToolOutput::from_status(status, Vec::new(), Vec::new())
        }
    };

    debug!(
        "{} finished: exit_code={:?} signal={:?}",
        program, output.exit_code, output.signal
    );
    Ok(output)
}

/// Run `producer | consumer`, consumer output inherited.
///
/// Each stage leads its own process group so that signal teardown also
/// reaches the workers a stage forks (`xargs -P` running sed). The reported
/// status is the first failing stage, producer first; a producer stopped by
/// SIGPIPE because the consumer quit early does not count as failing.
pub fn run_pipeline<P, C>(producer: &P, consumer: &C) -> Result<ToolOutput>
where
    P: ToolArgs + ?Sized,
    C: ToolArgs + ?Sized,
{
    info!(
        "run_pipeline: {} | {}",
        producer.display_command(),
        consumer.display_command()
    );

    if is_dry_run() {
        println!(
            "[DRY RUN] {} | {}",
            producer.display_command(),
            consumer.display_command()
        );
        return Ok(ToolOutput::skipped());
    }

    let mut upstream = command_for(producer);
    upstream.stdin(Stdio::null()).stdout(Stdio::piped());
    let mut first = spawn_group_tracked(&mut upstream, producer.program())?;
    let first_pid = first.id();

    let pipe = first
        .stdout
        .take()
        .context("producer stdout was not captured")?;
    // The Command keeps its copy of the read end until dropped; it must be
    // gone before waiting or the producer never sees SIGPIPE.
    let second = {
        let mut downstream = command_for(consumer);
        downstream.stdin(Stdio::from(pipe));
        spawn_group_tracked(&mut downstream, consumer.program())
    };

    let mut second = match second {
        Ok(child) => child,
        Err(e) => {
            let _ = first.kill();
            let _ = first.wait();
            untrack(first_pid);
            return Err(e);
        }
    };
    let second_pid = second.id();
    let second_status = second.wait();
    untrack(second_pid);
    let second_status =
        second_status.with_context(|| format!("failed waiting for {}", consumer.program()))?;

    let first_status = first.wait();
    untrack(first_pid);
    let first_status =
        first_status.with_context(|| format!("failed waiting for {}", producer.program()))?;

    let broken_pipe = first_status.signal() == Some(Signal::SIGPIPE as i32);
    let status = if first_status.success() || broken_pipe {
        second_status
    } else {
        first_status
    };
    Ok(ToolOutput::from_status(status, Vec::new(), Vec::new()))
}

/// Replace the current process with the delegate. Only returns on failure.
pub fn exec_tool<T: ToolArgs + ?Sized>(args: &T) -> anyhow::Error {
    info!("exec_tool: {}", args.display_command());
    if is_dry_run() {
        println!("[DRY RUN] exec {}", args.display_command());
        std::process::exit(0);
    }
    let err = command_for(args).exec();
    match err.kind() {
        ErrorKind::NotFound => anyhow::Error::new(ShellkitError::missing_tool(args.program())),
        _ => anyhow::Error::new(err).context(format!("failed to exec {}", args.program())),
    }
}
