//! Error handling module for shellkit
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every tool failure that is not simply "the delegate returned non-zero" is
//! expressed as one of these variants so entry points can map it to an exit
//! status.

use thiserror::Error;

/// Main error type for shellkit tools
#[derive(Error, Debug)]
pub enum ShellkitError {
    /// Misuse of the command line (missing or malformed arguments)
    #[error("{0}")]
    Usage(String),

    /// Arguments parsed but refer to something unusable (missing file, bad branch)
    #[error("{0}")]
    Validation(String),

    /// A required external program is not installed
    #[error("required program not found: {0}")]
    MissingTool(String),

    /// A delegate ran and failed; its exit status is carried through
    #[error("{program} failed with exit code {code}")]
    Delegate { program: String, code: i32 },

    /// IO errors (spawning, temp files, renames)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for shellkit operations
pub type Result<T> = std::result::Result<T, ShellkitError>;

impl ShellkitError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a missing-tool error
    pub fn missing_tool(name: impl Into<String>) -> Self {
        Self::MissingTool(name.into())
    }

    /// Create a delegate failure carrying the delegate's exit code
    pub fn delegate(program: impl Into<String>, code: i32) -> Self {
        Self::Delegate {
            program: program.into(),
            code,
        }
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// Delegate failures keep the delegate's own code; everything else is a
    /// plain failure (1).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Delegate { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Map an `anyhow` error chain to a process exit status.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ShellkitError>())
        .map(ShellkitError::exit_code)
        .unwrap_or(1)
}
