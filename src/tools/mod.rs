//! One module per tool. Each exposes a `run` function returning the exit
//! status and the typed `ToolArgs` structs for its delegates.

pub mod clipboard;
pub mod git_squash;
pub mod path_case;
pub mod run_quiet;
pub mod ssh_wait;
pub mod string_replace;
pub mod tmux_run;
