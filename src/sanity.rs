//! Delegate availability checks
//!
//! Each tool resolves its delegate up front so a missing program produces a
//! clear "required program not found" message and exit 1 instead of a raw
//! spawn error. `shellkit check` reports the whole matrix.

use crate::error::ShellkitError;
use serde::Serialize;
use std::path::PathBuf;

/// A delegate program and the tool that needs it.
#[derive(Debug, Clone, Copy)]
pub struct Delegate {
    pub tool: &'static str,
    pub binary: &'static str,
    /// false when the tool has alternatives (clipboard backends)
    pub required: bool,
}

/// Every external program any tool may invoke.
pub const DELEGATES: &[Delegate] = &[
    Delegate { tool: "string-replace", binary: "sed", required: true },
    Delegate { tool: "string-replace", binary: "find", required: true },
    Delegate { tool: "string-replace", binary: "xargs", required: true },
    Delegate { tool: "string-replace", binary: "grep", required: true },
    Delegate { tool: "clipboard-read", binary: "pbpaste", required: false },
    Delegate { tool: "clipboard-read", binary: "wl-paste", required: false },
    Delegate { tool: "clipboard-read", binary: "xclip", required: false },
    Delegate { tool: "clipboard-read", binary: "xsel", required: false },
    Delegate { tool: "ssh-wait", binary: "ssh", required: true },
    Delegate { tool: "git-squash", binary: "git", required: true },
    Delegate { tool: "tmux-run", binary: "tmux", required: true },
    Delegate { tool: "path-uppercase", binary: "mv", required: true },
];

/// Check if a binary is available in PATH
pub fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Resolve a binary or fail with [`ShellkitError::MissingTool`].
pub fn require_binary(name: &str) -> Result<PathBuf, ShellkitError> {
    which::which(name).map_err(|_| ShellkitError::missing_tool(name))
}

/// One row of the availability report.
#[derive(Debug, Clone, Serialize)]
pub struct DelegateStatus {
    pub tool: &'static str,
    pub binary: &'static str,
    pub required: bool,
    pub path: Option<PathBuf>,
}

/// Result of environment verification
#[derive(Debug, Clone, Serialize)]
pub struct SanityReport {
    pub delegates: Vec<DelegateStatus>,
    pub missing_required: Vec<String>,
    /// Tools with alternatives where none is installed
    pub unsatisfied_tools: Vec<String>,
}

impl SanityReport {
    /// Returns true if every tool can run
    pub fn is_ok(&self) -> bool {
        self.missing_required.is_empty() && self.unsatisfied_tools.is_empty()
    }
}

/// Resolve every delegate.
pub fn verify_environment() -> SanityReport {
    build_report(|binary| which::which(binary).ok())
}

fn build_report<F>(mut resolve: F) -> SanityReport
where
    F: FnMut(&str) -> Option<PathBuf>,
{
    let delegates: Vec<DelegateStatus> = DELEGATES
        .iter()
        .map(|d| DelegateStatus {
            tool: d.tool,
            binary: d.binary,
            required: d.required,
            path: resolve(d.binary),
        })
        .collect();

    let missing_required = delegates
        .iter()
        .filter(|d| d.required && d.path.is_none())
        .map(|d| d.binary.to_string())
        .collect();

    let mut unsatisfied_tools: Vec<String> = Vec::new();
    for d in delegates.iter().filter(|d| !d.required) {
        let any_found = delegates
            .iter()
            .any(|other| other.tool == d.tool && !other.required && other.path.is_some());
        if !any_found && !unsatisfied_tools.iter().any(|t| t == d.tool) {
            unsatisfied_tools.push(d.tool.to_string());
        }
    }

    SanityReport {
        delegates,
        missing_required,
        unsatisfied_tools,
    }
}
