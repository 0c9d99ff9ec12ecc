//! ssh-wait: poll a host with a no-op ssh command until it answers.
//!
//! Useful right after a reboot: `ssh-wait box && ssh box`, or
//! `ssh-wait --connect box` to do both.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::error::ShellkitError;
use crate::sanity::require_binary;
use crate::tool_runner::{OutputMode, exec_tool, run_tool};
use crate::tool_traits::ToolArgs;

/// Options after merging flags with environment defaults.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub host: String,
    pub interval: Duration,
    pub connect_timeout: Duration,
    /// None polls forever
    pub max_attempts: Option<u32>,
    pub connect: bool,
}

/// `ssh -o BatchMode=yes -o ConnectTimeout=N HOST true`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshProbeArgs {
    pub host: String,
    pub connect_timeout_secs: u64,
}

impl ToolArgs for SshProbeArgs {
    fn program(&self) -> &str {
        "ssh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            self.host.clone(),
            "true".to_string(),
        ]
    }

    /// Probing changes nothing, so dry-run still waits for real.
    fn read_only(&self) -> bool {
        true
    }
}

/// Interactive `ssh HOST`, used with `--connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSessionArgs {
    pub host: String,
}

impl ToolArgs for SshSessionArgs {
    fn program(&self) -> &str {
        "ssh"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.host.clone()]
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Reachable { attempts: u32 },
    GaveUp { attempts: u32 },
}

/// Call `probe` until it reports success, sleeping between failures.
///
/// `on_failure` is invoked after each failed attempt with the attempt number.
pub fn poll_until<P, S, F>(
    mut probe: P,
    mut sleep: S,
    mut on_failure: F,
    interval: Duration,
    max_attempts: Option<u32>,
) -> Result<WaitOutcome>
where
    P: FnMut() -> Result<bool>,
    S: FnMut(Duration),
    F: FnMut(u32),
{
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        if probe()? {
            return Ok(WaitOutcome::Reachable { attempts });
        }
        on_failure(attempts);
        if max_attempts.is_some_and(|max| attempts >= max) {
            return Ok(WaitOutcome::GaveUp { attempts });
        }
        sleep(interval);
    }
}

/// Run ssh-wait; returns 0 once the host answers.
pub fn run(options: &WaitOptions) -> Result<i32> {
    if options.host.trim().is_empty() {
        return Err(ShellkitError::usage("host must not be empty").into());
    }
    require_binary("ssh")?;

    let probe_args = SshProbeArgs {
        host: options.host.clone(),
        connect_timeout_secs: options.connect_timeout.as_secs().max(1),
    };

    let outcome = poll_until(
        || {
            let output = run_tool(&probe_args, OutputMode::Capture)?;
            debug!(code = output.status_code(), stderr = %output.stderr.trim(), "ssh probe");
            Ok(output.success)
        },
        std::thread::sleep,
        |attempt| {
            if attempt == 1 {
                eprintln!("Waiting for {} to accept ssh connections...", options.host);
            } else {
                eprint!(".");
                let _ = std::io::stderr().flush();
            }
        },
        options.interval,
        options.max_attempts,
    )?;

    match outcome {
        WaitOutcome::Reachable { attempts } => {
            info!(host = %options.host, attempts, "host reachable");
            if attempts > 2 {
                eprintln!();
            }
            eprintln!("{} is up", options.host);
            if options.connect {
                return Err(exec_tool(&SshSessionArgs {
                    host: options.host.clone(),
                }));
            }
            Ok(0)
        }
        WaitOutcome::GaveUp { attempts } => {
            if attempts > 1 {
                eprintln!();
            }
            Err(ShellkitError::general(format!(
                "{} still unreachable after {} attempts",
                options.host, attempts
            ))
            .into())
        }
    }
}
