//! `tmux-run` standalone binary.

use shellkit::cli::TmuxRunCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<TmuxRunCli>()
}
