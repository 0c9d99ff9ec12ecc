//! path-uppercase: rename a file or directory to a different case.
//!
//! Only the final path component changes. The rename itself is `mv`, whose
//! exit status is passed through.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::error::ShellkitError;
use crate::sanity::require_binary;
use crate::tool_runner::{OutputMode, run_tool};
use crate::tool_traits::ToolArgs;
use crate::types::CaseStyle;

#[derive(Debug, Clone, Default)]
pub struct RenameOptions {
    pub path: PathBuf,
    pub style: CaseStyle,
    /// Convert the stem only and keep `.ext` as is
    pub keep_extension: bool,
}

/// `mv -- FROM TO`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveArgs {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl ToolArgs for MoveArgs {
    fn program(&self) -> &str {
        "mv"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "--".to_string(),
            self.from.display().to_string(),
            self.to.display().to_string(),
        ]
    }
}

/// Apply `style` to a file name.
pub fn convert_name(name: &str, style: CaseStyle, keep_extension: bool) -> String {
    if keep_extension {
        // A leading dot marks a hidden file, not an extension
        if let Some((stem, ext)) = name.rsplit_once('.').filter(|(stem, _)| !stem.is_empty()) {
            return format!("{}.{}", style.apply(stem), ext);
        }
    }
    style.apply(name)
}

/// Compute the rename, or `None` when the name is already in that case.
pub fn plan(options: &RenameOptions) -> Result<Option<MoveArgs>, ShellkitError> {
    let path = &options.path;
    let meta = fs::symlink_metadata(path).map_err(|_| {
        ShellkitError::validation(format!("{}: no such file or directory", path.display()))
    })?;

    let name = path
        .file_name()
        .ok_or_else(|| ShellkitError::validation(format!("{}: has no file name", path.display())))?
        .to_str()
        .ok_or_else(|| {
            ShellkitError::validation(format!("{}: file name is not valid UTF-8", path.display()))
        })?;

    let converted = convert_name(name, options.style, options.keep_extension);
    if converted == name {
        return Ok(None);
    }
    if converted.is_empty() || converted.contains('/') {
        return Err(ShellkitError::validation(format!(
            "cannot convert {:?} to {} case",
            name, options.style
        )));
    }

    let target = path.with_file_name(&converted);
    if let Ok(existing) = fs::symlink_metadata(&target) {
        // Case-insensitive filesystems report the source itself
        if !same_file(&meta, &existing) {
            return Err(ShellkitError::validation(format!(
                "{} already exists",
                target.display()
            )));
        }
    }

    Ok(Some(MoveArgs {
        from: path.clone(),
        to: target,
    }))
}

fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.dev() == b.dev() && a.ino() == b.ino()
}

/// Run path-uppercase (or another style); returns mv's exit status.
pub fn run(options: &RenameOptions) -> Result<i32> {
    match plan(options)? {
        None => {
            debug!(path = %options.path.display(), "name already in requested case");
            Ok(0)
        }
        Some(args) => {
            require_binary("mv")?;
            let output = run_tool(&args, OutputMode::Inherit)?;
            if output.success {
                info!(from = %args.from.display(), to = %args.to.display(), "renamed");
            }
            Ok(output.status_code())
        }
    }
}
