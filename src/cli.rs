use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::entry::ToolCommand;
use crate::tools::{clipboard, git_squash, path_case, run_quiet, ssh_wait, string_replace, tmux_run};
use crate::types::{CaseStyle, ClipboardBackend, ClipboardSelection};

/// shellkit - small wrappers around sed, ssh, git, tmux and friends
#[derive(Parser, Debug)]
#[command(name = "shellkit")]
#[command(about = "Small command-line wrappers around sed, ssh, git, tmux and friends")]
#[command(version, arg_required_else_help = true)]
pub struct Cli {
    /// Print delegate commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replace text in a file, a directory tree, or stdin
    StringReplace(StringReplaceCli),
    /// Print the clipboard contents
    ClipboardRead(ClipboardReadCli),
    /// Wait until a host accepts ssh connections
    SshWait(SshWaitCli),
    /// Squash all commits since another branch into one
    GitSquash(GitSquashCli),
    /// Run a command in a new tmux window
    TmuxRun(TmuxRunCli),
    /// Rename a path to upper case (or another case)
    PathUppercase(PathCaseCli),
    /// Run a command, showing its output only if it fails
    RunQuietOnSuccess(RunQuietCli),
    /// Report which delegate programs are installed
    Check {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// string-replace
// ============================================================================

/// Replace every occurrence of BEFORE with AFTER.
///
/// Without FILE, reads stdin and writes stdout. With FILE, edits it in place.
/// With -r, edits every file below the directory (default: current directory).
#[derive(Parser, Debug)]
#[command(name = "string-replace", version, arg_required_else_help = true)]
pub struct StringReplaceCli {
    /// Match case-insensitively
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Treat BEFORE as an extended regular expression and AFTER as a sed replacement
    #[arg(short = 'e', long)]
    pub regex: bool,

    /// Recurse into a directory, editing files in parallel
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Show the result (file) or matching files (directory) without editing
    #[arg(short = 'd', long)]
    pub preview: bool,

    /// Text to search for
    pub before: String,

    /// Replacement text
    pub after: String,

    /// File or directory to edit
    pub path: Option<PathBuf>,
}

impl ToolCommand for StringReplaceCli {
    const NAME: &'static str = "string-replace";

    fn guard_children(&self) -> bool {
        true
    }

    fn execute(self, settings: &Settings) -> anyhow::Result<i32> {
        let request = string_replace::ReplaceRequest {
            before: self.before,
            after: self.after,
            path: self.path,
            ignore_case: self.ignore_case,
            regex: self.regex,
            recursive: self.recursive,
            preview: self.preview,
        };
        string_replace::run(&request, settings)
    }
}

// ============================================================================
// clipboard-read
// ============================================================================

/// Print the clipboard contents to stdout.
#[derive(Parser, Debug)]
#[command(name = "clipboard-read", version)]
pub struct ClipboardReadCli {
    /// Paste program to use instead of auto-detection [env: CLIPBOARD_BACKEND]
    #[arg(long, value_enum)]
    pub backend: Option<ClipboardBackend>,

    /// Selection to read, X11/Wayland only [env: CLIPBOARD_SELECTION]
    #[arg(long, value_enum)]
    pub selection: Option<ClipboardSelection>,
}

impl ToolCommand for ClipboardReadCli {
    const NAME: &'static str = "clipboard-read";

    fn guard_children(&self) -> bool {
        true
    }

    fn execute(self, settings: &Settings) -> anyhow::Result<i32> {
        let settings = Settings {
            clipboard_backend: self.backend.or(settings.clipboard_backend),
            clipboard_selection: self.selection.unwrap_or(settings.clipboard_selection),
            ..settings.clone()
        };
        clipboard::run(&settings)
    }
}

// ============================================================================
// ssh-wait
// ============================================================================

/// Poll HOST until it accepts ssh connections, then exit 0.
#[derive(Parser, Debug)]
#[command(name = "ssh-wait", version, arg_required_else_help = true)]
pub struct SshWaitCli {
    /// Seconds between attempts [env: SSH_WAIT_INTERVAL, default 5]
    #[arg(long)]
    pub interval: Option<u64>,

    /// ssh ConnectTimeout in seconds [env: SSH_WAIT_CONNECT_TIMEOUT, default 5]
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Give up after this many attempts (default: never)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Open an interactive ssh session once the host is up
    #[arg(long)]
    pub connect: bool,

    /// Host (anything ssh accepts, including user@host and config aliases)
    pub host: String,
}

impl ToolCommand for SshWaitCli {
    const NAME: &'static str = "ssh-wait";

    fn execute(self, settings: &Settings) -> anyhow::Result<i32> {
        let options = ssh_wait::WaitOptions {
            host: self.host,
            interval: self
                .interval
                .map(Duration::from_secs)
                .unwrap_or(settings.ssh_interval),
            connect_timeout: self
                .connect_timeout
                .map(Duration::from_secs)
                .unwrap_or(settings.ssh_connect_timeout),
            max_attempts: self.max_attempts.filter(|&n| n > 0),
            connect: self.connect,
        };
        ssh_wait::run(&options)
    }
}

// ============================================================================
// git-squash
// ============================================================================

/// Squash every commit since BRANCH into a single commit.
#[derive(Parser, Debug)]
#[command(name = "git-squash", version, arg_required_else_help = true)]
pub struct GitSquashCli {
    /// Commit message (default: all squashed messages, oldest first)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Commit without opening the editor
    #[arg(long)]
    pub no_edit: bool,

    /// Run as if started in this directory
    #[arg(short = 'C', value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Branch to squash against
    pub branch: String,
}

impl ToolCommand for GitSquashCli {
    const NAME: &'static str = "git-squash";

    fn execute(self, _settings: &Settings) -> anyhow::Result<i32> {
        let options = git_squash::SquashOptions {
            branch: self.branch,
            message: self.message,
            edit: !self.no_edit,
            repo: self.repo,
        };
        git_squash::run(&options)
    }
}

// ============================================================================
// tmux-run
// ============================================================================

/// Open COMMAND in a new tmux window.
#[derive(Parser, Debug)]
#[command(name = "tmux-run", version, arg_required_else_help = true)]
pub struct TmuxRunCli {
    /// Do not switch to the new window
    #[arg(short = 'd', long)]
    pub detached: bool,

    /// Window name (default: command name)
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Target session, required outside tmux [env: TMUX_RUN_TARGET]
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Working directory (default: current directory)
    #[arg(short = 'c', long)]
    pub directory: Option<PathBuf>,

    /// Command and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl ToolCommand for TmuxRunCli {
    const NAME: &'static str = "tmux-run";

    fn execute(self, settings: &Settings) -> anyhow::Result<i32> {
        let options = tmux_run::TmuxRunOptions {
            command: self.command,
            name: self.name,
            target: self.target,
            directory: self.directory,
            detached: self.detached,
        };
        tmux_run::run(&options, settings)
    }
}

// ============================================================================
// path-uppercase
// ============================================================================

/// Rename PATH so its last component is upper case.
#[derive(Parser, Debug)]
#[command(name = "path-uppercase", version, arg_required_else_help = true)]
pub struct PathCaseCli {
    /// Case to convert to
    #[arg(short, long, value_enum, default_value_t = CaseStyle::Upper)]
    pub style: CaseStyle,

    /// Convert only the part before the last '.'
    #[arg(short = 'x', long)]
    pub keep_extension: bool,

    /// File or directory to rename
    pub path: PathBuf,
}

impl ToolCommand for PathCaseCli {
    const NAME: &'static str = "path-uppercase";

    fn guard_children(&self) -> bool {
        true
    }

    fn execute(self, _settings: &Settings) -> anyhow::Result<i32> {
        path_case::run(&path_case::RenameOptions {
            path: self.path,
            style: self.style,
            keep_extension: self.keep_extension,
        })
    }
}

// ============================================================================
// run-quiet-on-success
// ============================================================================

/// Run COMMAND; print its output only if it exits non-zero.
#[derive(Parser, Debug)]
#[command(name = "run-quiet-on-success", version, arg_required_else_help = true)]
pub struct RunQuietCli {
    /// Command and its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl ToolCommand for RunQuietCli {
    const NAME: &'static str = run_quiet::TOOL_NAME;

    fn guard_children(&self) -> bool {
        true
    }

    fn execute(self, _settings: &Settings) -> anyhow::Result<i32> {
        run_quiet::run(&self.command)
    }
}
