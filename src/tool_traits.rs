//! Type-safe delegate argument contracts.
//!
//! Every external program a tool shells out to is described by a struct
//! implementing [`ToolArgs`]. The struct owns the mapping from typed fields to
//! the delegate's argv, so argument order and flag spelling live in exactly
//! one place and can be unit tested without spawning anything.
//!
//! This module also holds the process-wide dry-run switch consulted by the
//! runner.

use std::sync::atomic::{AtomicBool, Ordering};

static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Enable dry-run mode: delegates that change state are printed instead of
/// executed.
pub fn enable_dry_run() {
    DRY_RUN.store(true, Ordering::SeqCst);
}

/// Whether dry-run mode is active.
pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::SeqCst)
}

/// Trait for typed delegate arguments.
///
/// # Contract
///
/// - `program()`: executable name or path, resolved through `PATH`.
/// - `to_cli_args()`: argv after the program name, exactly as the delegate
///   expects it.
/// - `get_env_vars()`: extra environment for the delegate.
/// - `read_only()`: true for queries that change nothing. They still run in
///   dry-run mode, since later steps depend on their answers.
///
/// # Example
///
/// ```ignore
/// use shellkit::tools::path_case::MoveArgs;
///
/// let args = MoveArgs { from: "notes.txt".into(), to: "NOTES.TXT".into() };
/// assert_eq!(args.to_cli_args(), ["--", "notes.txt", "NOTES.TXT"]);
/// ```
pub trait ToolArgs {
    /// Program to execute.
    fn program(&self) -> &str;

    /// Convert struct fields to the delegate's argv (program excluded).
    fn to_cli_args(&self) -> Vec<String>;

    /// Extra environment variables for the delegate.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether the delegate only inspects state.
    fn read_only(&self) -> bool {
        false
    }

    /// Shell-like rendering of the full command, for logs and dry-run output.
    fn display_command(&self) -> String {
        std::iter::once(self.program().to_string())
            .chain(self.to_cli_args().iter().map(|arg| quote_for_display(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Quote an argument for human-readable display only; never fed to a shell.
fn quote_for_display(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Arbitrary command supplied by the user (`tmux-run`, `run-quiet-on-success`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl UserCommand {
    /// Split a non-empty argv into program and arguments.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ToolArgs for UserCommand {
    fn program(&self) -> &str {
        &self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        self.args.clone()
    }
}
