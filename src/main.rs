//! shellkit - multiplexer entry point
//!
//! `shellkit <tool> ...` runs the same tools as the standalone binaries, plus
//! `check` and `completions`.

use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::debug;

use shellkit::cli::{Cli, Commands};
use shellkit::config::Settings;
use shellkit::entry::{execute_tool, init_logging, level_for_verbosity, usage_exit};
use shellkit::sanity::{SanityReport, verify_environment};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_exit(e),
    };
    init_logging(level_for_verbosity(cli.verbose));
    debug!("CLI arguments parsed");

    let mut settings = Settings::from_env();
    settings.dry_run |= cli.dry_run;

    match cli.command {
        Commands::StringReplace(args) => execute_tool(args, &settings),
        Commands::ClipboardRead(args) => execute_tool(args, &settings),
        Commands::SshWait(args) => execute_tool(args, &settings),
        Commands::GitSquash(args) => execute_tool(args, &settings),
        Commands::TmuxRun(args) => execute_tool(args, &settings),
        Commands::PathUppercase(args) => execute_tool(args, &settings),
        Commands::RunQuietOnSuccess(args) => execute_tool(args, &settings),
        Commands::Check { json } => run_check(json),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "shellkit", &mut io::stdout());
            ExitCode::SUCCESS
        }
    }
}

/// Print the delegate availability report; exit 1 if any tool cannot run.
fn run_check(json: bool) -> ExitCode {
    let report = verify_environment();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("shellkit: {}", shellkit::ShellkitError::from(e));
                return ExitCode::from(1);
            }
        }
    } else {
        print_report(&report);
    }

    if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn print_report(report: &SanityReport) {
    for delegate in &report.delegates {
        let (mark, location) = match &delegate.path {
            Some(path) => ("✓", path.display().to_string()),
            None if delegate.required => ("✗", "missing".to_string()),
            None => ("-", "not installed (optional)".to_string()),
        };
        println!(
            "{} {:<22} {:<10} {}",
            mark, delegate.tool, delegate.binary, location
        );
    }
    for tool in &report.unsatisfied_tools {
        println!("✗ {}: no backend installed", tool);
    }
}
