//! `ssh-wait` standalone binary.

use shellkit::cli::SshWaitCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<SshWaitCli>()
}
