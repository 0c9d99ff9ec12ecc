//! `clipboard-read` standalone binary.

use shellkit::cli::ClipboardReadCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<ClipboardReadCli>()
}
