//! `string-replace` standalone binary.

use shellkit::cli::StringReplaceCli;
use std::process::ExitCode;

fn main() -> ExitCode {
    shellkit::run_standalone::<StringReplaceCli>()
}
