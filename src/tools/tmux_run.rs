//! tmux-run: start a command in a new tmux window.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::Settings;
use crate::error::ShellkitError;
use crate::sanity::require_binary;
use crate::tool_runner::{OutputMode, run_tool};
use crate::tool_traits::{ToolArgs, UserCommand};

#[derive(Debug, Clone, Default)]
pub struct TmuxRunOptions {
    pub command: Vec<String>,
    /// Window name; defaults to the command's file name
    pub name: Option<String>,
    /// Target session (or `session:index`)
    pub target: Option<String>,
    pub directory: Option<PathBuf>,
    /// Create the window without switching to it
    pub detached: bool,
}

/// `tmux new-window [-d] [-t T] -c DIR -n NAME cmd args...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWindowArgs {
    pub name: String,
    pub target: Option<String>,
    pub directory: PathBuf,
    pub detached: bool,
    pub command: UserCommand,
}

impl ToolArgs for NewWindowArgs {
    fn program(&self) -> &str {
        "tmux"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["new-window".to_string()];
        if self.detached {
            args.push("-d".to_string());
        }
        if let Some(target) = &self.target {
            args.push("-t".to_string());
            // Trailing colon: next free index in that session
            if target.contains(':') {
                args.push(target.clone());
            } else {
                args.push(format!("{}:", target));
            }
        }
        args.push("-c".to_string());
        args.push(self.directory.display().to_string());
        args.push("-n".to_string());
        args.push(self.name.clone());
        args.push(self.command.program.clone());
        args.extend(self.command.args.iter().cloned());
        args
    }
}

/// Window name derived from a command: its file name, minus any path.
pub fn window_name(program: &str) -> String {
    Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| program.to_string())
}

/// Validate options and build the tmux invocation.
pub fn build(options: &TmuxRunOptions, settings: &Settings, cwd: PathBuf) -> Result<NewWindowArgs, ShellkitError> {
    let command = UserCommand::from_argv(&options.command)
        .ok_or_else(|| ShellkitError::usage("no command given"))?;
    if command.program.starts_with('-') {
        return Err(ShellkitError::usage(format!(
            "command must not start with '-': {}",
            command.program
        )));
    }

    let target = options.target.clone().or_else(|| settings.tmux_target.clone());
    if target.is_none() && !settings.inside_tmux {
        return Err(ShellkitError::validation(
            "not inside a tmux session; pass --target <session> or set TMUX_RUN_TARGET",
        ));
    }

    Ok(NewWindowArgs {
        name: options
            .name
            .clone()
            .unwrap_or_else(|| window_name(&command.program)),
        target,
        directory: options.directory.clone().unwrap_or(cwd),
        detached: options.detached,
        command,
    })
}

/// Run tmux-run; returns tmux's exit status.
pub fn run(options: &TmuxRunOptions, settings: &Settings) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let args = build(options, settings, cwd)?;
    require_binary("tmux")?;
    Ok(run_tool(&args, OutputMode::Interactive)?.status_code())
}
