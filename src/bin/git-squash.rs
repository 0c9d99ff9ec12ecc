//! `git-squash` standalone binary.

use shellkit::cli::GitSquashCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<GitSquashCli>()
}
