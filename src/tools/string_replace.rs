//! string-replace: replace text in a file, a directory tree, or stdin via sed.
//!
//! Literal search/replacement text is escaped before it is interpolated into
//! a `s/…/…/g` expression, so `a.b` only ever matches the three characters
//! `a.b`. With `-e` the search text is an extended regular expression and the
//! replacement may use back-references.
//!
//! Directory mode hands the file list to `xargs -P` so that the parallelism
//! belongs to xargs, not to this process.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::ShellkitError;
use crate::sanity::require_binary;
use crate::tool_runner::{OutputMode, run_pipeline, run_tool};
use crate::tool_traits::ToolArgs;

const DELIMITER: char = '/';

/// Characters with special meaning in a POSIX extended regular expression.
const ERE_SPECIAL: &[char] = &[
    '\\', '.', '*', '[', ']', '^', '$', '+', '?', '(', ')', '{', '}', '|',
];

/// Parsed request, independent of how it arrived on the command line.
#[derive(Debug, Clone, Default)]
pub struct ReplaceRequest {
    pub before: String,
    pub after: String,
    pub path: Option<PathBuf>,
    pub ignore_case: bool,
    pub regex: bool,
    pub recursive: bool,
    pub preview: bool,
}

// ============================================================================
// Escaping
// ============================================================================

/// Escape literal text for use as an ERE pattern.
///
/// When `delimiter` is given it is escaped too, for use inside `s/…/…/`.
pub fn escape_pattern(text: &str, delimiter: Option<char>) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            c if ERE_SPECIAL.contains(&c) || Some(c) == delimiter => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Escape literal text for the replacement half of a sed `s` command.
pub fn escape_replacement(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\\' | '&' | DELIMITER => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Escape only unescaped delimiters, leaving regex syntax untouched.
pub fn escape_delimiter(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 4);
    let mut backslashes = 0usize;
    for c in text.chars() {
        if c == DELIMITER && backslashes % 2 == 0 {
            escaped.push('\\');
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        escaped.push(c);
    }
    escaped
}

/// Build the full `s/pattern/replacement/flags` expression.
pub fn sed_expression(request: &ReplaceRequest) -> String {
    let (pattern, replacement) = if request.regex {
        (escape_delimiter(&request.before), escape_delimiter(&request.after))
    } else {
        (
            escape_pattern(&request.before, Some(DELIMITER)),
            escape_replacement(&request.after),
        )
    };
    let flags = if request.ignore_case { "gI" } else { "g" };
    format!("s{d}{pattern}{d}{replacement}{d}{flags}", d = DELIMITER)
}

/// Pattern for `grep -E`, which has no delimiter to escape.
pub fn grep_pattern(request: &ReplaceRequest) -> String {
    if request.regex {
        request.before.clone()
    } else {
        escape_pattern(&request.before, None)
    }
}

// ============================================================================
// Delegate arguments
// ============================================================================

/// `sed -E [-i] -e EXPR [-- files...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SedArgs {
    pub program: String,
    pub expression: String,
    pub in_place: bool,
    pub files: Vec<PathBuf>,
}

impl ToolArgs for SedArgs {
    fn program(&self) -> &str {
        &self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["-E".to_string()];
        if self.in_place {
            args.push("-i".to_string());
        }
        args.push("-e".to_string());
        args.push(self.expression.clone());
        if !self.files.is_empty() {
            args.push("--".to_string());
            args.extend(self.files.iter().map(|f| f.display().to_string()));
        }
        args
    }
}

/// `find ROOT -type f -not -path '*/.git/*' -print0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindFilesArgs {
    pub root: PathBuf,
}

impl ToolArgs for FindFilesArgs {
    fn program(&self) -> &str {
        "find"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            path_operand(&self.root),
            "-type".to_string(),
            "f".to_string(),
            "-not".to_string(),
            "-path".to_string(),
            "*/.git/*".to_string(),
            "-print0".to_string(),
        ]
    }
}

/// `xargs -0 -r -P JOBS sed -E -i -e EXPR --`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelSedArgs {
    pub jobs: usize,
    pub sed: SedArgs,
}

impl ToolArgs for ParallelSedArgs {
    fn program(&self) -> &str {
        "xargs"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "-0".to_string(),
            "-r".to_string(),
            "-P".to_string(),
            self.jobs.to_string(),
            self.sed.program.clone(),
        ];
        args.extend(self.sed.to_cli_args());
        // File names appended by xargs are never sed options
        args.push("--".to_string());
        args
    }
}

/// `grep -rlIE [-i] --exclude-dir=.git -e PATTERN -- ROOT`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepListArgs {
    pub pattern: String,
    pub ignore_case: bool,
    pub root: PathBuf,
}

impl ToolArgs for GrepListArgs {
    fn program(&self) -> &str {
        "grep"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["-rlIE".to_string()];
        if self.ignore_case {
            args.push("-i".to_string());
        }
        args.push("--exclude-dir=.git".to_string());
        args.push("-e".to_string());
        args.push(self.pattern.clone());
        args.push("--".to_string());
        args.push(self.root.display().to_string());
        args
    }
}

/// find has no `--`; a root that looks like an option gets a `./` prefix.
fn path_operand(path: &Path) -> String {
    let text = path.display().to_string();
    if text.starts_with('-') {
        format!("./{}", text)
    } else {
        text
    }
}

// ============================================================================
// Planning
// ============================================================================

/// What will be executed for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacePlan {
    /// stdin -> stdout
    Filter(SedArgs),
    /// Edit one file in place
    InPlace(SedArgs),
    /// Print one transformed file to stdout
    Preview(SedArgs),
    /// Edit every file below a directory
    Directory {
        find: FindFilesArgs,
        xargs: ParallelSedArgs,
    },
    /// List files below a directory that contain a match
    DirectoryPreview(GrepListArgs),
}

/// Validate a request against the filesystem and choose delegates.
pub fn plan(request: &ReplaceRequest, settings: &Settings) -> Result<ReplacePlan, ShellkitError> {
    if request.before.is_empty() {
        return Err(ShellkitError::usage("search text must not be empty"));
    }

    let sed = |in_place: bool, files: Vec<PathBuf>| SedArgs {
        program: settings.sed_program.clone(),
        expression: sed_expression(request),
        in_place,
        files,
    };

    let path = match (&request.path, request.recursive) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("."),
        (None, false) => return Ok(ReplacePlan::Filter(sed(false, Vec::new()))),
    };

    let meta = fs::metadata(&path).map_err(|_| {
        ShellkitError::validation(format!("{}: no such file or directory", path.display()))
    })?;

    match (meta.is_dir(), request.recursive) {
        (true, false) => Err(ShellkitError::validation(format!(
            "{} is a directory (use -r)",
            path.display()
        ))),
        (false, true) => Err(ShellkitError::validation(format!(
            "{} is not a directory",
            path.display()
        ))),
        (false, false) if request.preview => Ok(ReplacePlan::Preview(sed(false, vec![path]))),
        (false, false) => Ok(ReplacePlan::InPlace(sed(true, vec![path]))),
        (true, true) if request.preview => Ok(ReplacePlan::DirectoryPreview(GrepListArgs {
            pattern: grep_pattern(request),
            ignore_case: request.ignore_case,
            root: path,
        })),
        (true, true) => Ok(ReplacePlan::Directory {
            find: FindFilesArgs { root: path },
            xargs: ParallelSedArgs {
                jobs: settings.replace_jobs,
                sed: sed(true, Vec::new()),
            },
        }),
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Run string-replace; returns the process exit status.
pub fn run(request: &ReplaceRequest, settings: &Settings) -> Result<i32> {
    let plan = plan(request, settings)?;
    debug!(?plan, "string-replace plan");

    let status = match &plan {
        ReplacePlan::Filter(sed) | ReplacePlan::InPlace(sed) | ReplacePlan::Preview(sed) => {
            require_binary(&sed.program)?;
            run_tool(sed, OutputMode::Inherit)?.status_code()
        }
        ReplacePlan::Directory { find, xargs } => {
            require_binary(find.program())?;
            require_binary(xargs.program())?;
            require_binary(&xargs.sed.program)?;
            info!(root = %find.root.display(), jobs = xargs.jobs, "replacing in directory");
            run_pipeline(find, xargs)?.status_code()
        }
        ReplacePlan::DirectoryPreview(grep) => {
            require_binary(grep.program())?;
            // grep exits 1 when nothing matched; nothing to change is not an error
            match run_tool(grep, OutputMode::Inherit)?.status_code() {
                1 => 0,
                code => code,
            }
        }
    };
    Ok(status)
}
