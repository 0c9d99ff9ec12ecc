//! `path-uppercase` standalone binary.

use shellkit::cli::PathCaseCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<PathCaseCli>()
}
