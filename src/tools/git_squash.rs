//! git-squash: collapse every commit since the merge base with another
//! branch into a single commit.
//!
//! The branch is moved with `git reset --soft`, so the index keeps the
//! combined change and only history is rewritten. If the final commit does
//! not happen (editor aborted, hook failed) the branch is reset back to where
//! it started.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::error::ShellkitError;
use crate::sanity::require_binary;
use crate::tool_runner::{OutputMode, ToolOutput, run_tool};
use crate::tool_traits::ToolArgs;

#[derive(Debug, Clone, Default)]
pub struct SquashOptions {
    /// Branch (or any commit-ish) to squash against
    pub branch: String,
    /// Use this message instead of the combined commit messages
    pub message: Option<String>,
    /// Open the editor on the final message
    pub edit: bool,
    /// Repository directory (`git -C`); defaults to the current directory
    pub repo: Option<PathBuf>,
}

/// Any `git` invocation, optionally rooted with `-C`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitArgs {
    pub repo: Option<PathBuf>,
    pub args: Vec<String>,
    /// Inspects the repository without changing it
    pub query: bool,
}

impl GitArgs {
    /// A command that changes the repository.
    pub fn new<I, S>(repo: Option<&PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repo: repo.cloned(),
            args: args.into_iter().map(Into::into).collect(),
            query: false,
        }
    }

    /// A read-only command; runs even in dry-run mode.
    pub fn query<I, S>(repo: Option<&PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            query: true,
            ..Self::new(repo, args)
        }
    }
}

impl ToolArgs for GitArgs {
    fn program(&self) -> &str {
        "git"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        if let Some(repo) = &self.repo {
            args.push("-C".to_string());
            args.push(repo.display().to_string());
        }
        args.extend(self.args.iter().cloned());
        args
    }

    fn read_only(&self) -> bool {
        self.query
    }
}

/// Join `%B%x00`-separated commit bodies oldest first, blank line between.
pub fn combine_messages(log: &str) -> String {
    log.split('\0')
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

struct Repo<'a> {
    dir: Option<&'a PathBuf>,
}

impl Repo<'_> {
    fn capture(&self, args: &[&str]) -> Result<ToolOutput> {
        run_tool(&GitArgs::query(self.dir, args.iter().copied()), OutputMode::Capture)
    }

    /// Trimmed stdout of a query that must succeed.
    fn stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.capture(args)?;
        checked(args, &output)?;
        Ok(output.stdout.trim().to_string())
    }

    /// Run a command that moves the branch; skipped in dry-run mode.
    fn update(&self, args: &[&str]) -> Result<()> {
        let output = run_tool(&GitArgs::new(self.dir, args.iter().copied()), OutputMode::Capture)?;
        checked(args, &output)
    }
}

fn checked(args: &[&str], output: &ToolOutput) -> Result<()> {
    output
        .ensure_success("git")
        .with_context(|| format!("git {} failed: {}", args.join(" "), output.stderr.trim()))?;
    Ok(())
}

/// Run git-squash; returns 0 on success.
pub fn run(options: &SquashOptions) -> Result<i32> {
    require_binary("git")?;
    let repo = Repo {
        dir: options.repo.as_ref(),
    };

    if !repo.capture(&["rev-parse", "--is-inside-work-tree"])?.success {
        return Err(ShellkitError::validation("not inside a git work tree").into());
    }

    let target = format!("{}^{{commit}}", options.branch);
    if !repo.capture(&["rev-parse", "--verify", "--quiet", &target])?.success {
        return Err(ShellkitError::validation(format!(
            "unknown branch or commit: {}",
            options.branch
        ))
        .into());
    }

    let dirty = repo.stdout(&["status", "--porcelain", "--untracked-files=no"])?;
    if !dirty.is_empty() {
        return Err(ShellkitError::validation(
            "working tree has uncommitted changes; commit or stash them first",
        )
        .into());
    }

    let head = repo.stdout(&["rev-parse", "HEAD"])?;
    let base = repo.stdout(&["merge-base", "HEAD", &options.branch])?;
    let range = format!("{}..HEAD", base);
    let count: u32 = repo
        .stdout(&["rev-list", "--count", &range])?
        .parse()
        .context("unexpected output from git rev-list --count")?;

    match count {
        0 => {
            return Err(ShellkitError::validation(format!(
                "nothing to squash: HEAD has no commits beyond {}",
                options.branch
            ))
            .into());
        }
        1 if options.message.is_none() => {
            println!("Only one commit since {}; nothing to squash.", options.branch);
            return Ok(0);
        }
        _ => {}
    }

    let message = match &options.message {
        Some(message) => message.clone(),
        None => combine_messages(&repo.stdout(&[
            "log",
            "--reverse",
            "--format=%B%x00",
            &range,
        ])?),
    };

    info!(count, base = %base, "squashing commits");
    repo.update(&["reset", "--soft", &base])?;

    let mut commit = vec!["commit", "--quiet", "-m", message.as_str()];
    if options.edit {
        commit.push("--edit");
    }
    let committed = run_tool(
        &GitArgs::new(options.repo.as_ref(), commit),
        OutputMode::Interactive,
    );

    match committed {
        Ok(output) if output.dry_run => {
            println!("Would squash {} commits onto {}.", count, short(&base));
            Ok(0)
        }
        Ok(output) if output.success => {
            println!("Squashed {} commits onto {}.", count, short(&base));
            Ok(0)
        }
        other => {
            warn!("commit did not complete, restoring {}", head);
            repo.update(&["reset", "--soft", &head])
                .context("squash aborted and restoring the original HEAD failed")?;
            let output = other?;
            Err(ShellkitError::general(format!(
                "squash aborted (git commit exited {}); branch restored to {}",
                output.status_code(),
                short(&head)
            ))
            .into())
        }
    }
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
