//! shellkit library
//!
//! Small independent command-line tools, each a thin wrapper around one or
//! two external programs, plus the runtime they share: typed delegate
//! arguments, a logged and dry-run aware process runner, child-process
//! teardown on signals, and environment defaults.

pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod process_guard;
pub mod sanity;
pub mod tool_runner;
pub mod tool_traits;
pub mod tools;
pub mod types;

// Re-export main types for convenience
pub use config::Settings;
pub use entry::{ToolCommand, run_standalone};
pub use error::{Result, ShellkitError};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use sanity::{SanityReport, verify_environment};
pub use tool_runner::{OutputMode, ToolOutput, run_pipeline, run_tool};
pub use tool_traits::{ToolArgs, UserCommand, enable_dry_run, is_dry_run};
pub use types::{CaseStyle, ClipboardBackend, ClipboardSelection};
