//! Process entry points shared by the standalone tool binaries and the
//! `shellkit` multiplexer.
//!
//! Handles the parts every tool has in common: parse arguments (usage errors
//! exit 1, not clap's default 2), initialise logging, load environment
//! defaults, install the child-process guard where appropriate, and turn the
//! tool's result into an exit status.

use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{ENV_LOG, Settings};
use crate::error::exit_code_for;
use crate::process_guard::{ProcessGuard, init_signal_handlers};
use crate::tool_traits::enable_dry_run;

/// A tool's command line, runnable on its own or as a `shellkit` subcommand.
pub trait ToolCommand: Parser {
    /// Name used as the prefix of error messages.
    const NAME: &'static str;

    /// Whether delegates should be torn down on SIGINT/SIGTERM/SIGHUP.
    ///
    /// Must stay false for tools that hand the terminal to an interactive
    /// delegate.
    fn guard_children(&self) -> bool {
        false
    }

    /// Run the tool and return the process exit status.
    fn execute(self, settings: &Settings) -> anyhow::Result<i32>;
}

/// Initialize tracing on stderr. `SHELLKIT_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Log level for a `-v` count.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Convert a status to an `ExitCode`; out-of-range values become 1.
pub fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(clamp_status(code))
}

fn clamp_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Print a clap error or help text and pick the exit status.
///
/// Help and version requests succeed; any other parse outcome, including
/// the help shown for a bare invocation, is a usage error.
pub fn usage_exit(err: clap::Error) -> ExitCode {
    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::from(1),
    }
}

/// Run a parsed tool with the shared runtime around it.
pub fn execute_tool<T: ToolCommand>(command: T, settings: &Settings) -> ExitCode {
    if settings.dry_run {
        enable_dry_run();
    }

    let _guard = if command.guard_children() {
        if let Err(e) = init_signal_handlers() {
            warn!("failed to install signal handlers: {}", e);
        }
        Some(ProcessGuard::new())
    } else {
        None
    };

    match command.execute(settings) {
        Ok(code) => {
            debug!(tool = T::NAME, code, "finished");
            to_exit_code(code)
        }
        Err(e) => {
            eprintln!("{}: {:#}", T::NAME, e);
            to_exit_code(exit_code_for(&e))
        }
    }
}

/// `main` for a standalone tool binary.
pub fn run_standalone<T: ToolCommand>() -> ExitCode {
    let command = match T::try_parse() {
        Ok(command) => command,
        Err(e) => return usage_exit(e),
    };
    init_logging(level_for_verbosity(0));
    let settings = Settings::from_env();
    execute_tool(command, &settings)
}
