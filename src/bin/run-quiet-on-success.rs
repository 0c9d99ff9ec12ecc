//! `run-quiet-on-success` standalone binary.

use shellkit::cli::RunQuietCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<RunQuietCli>()
}
