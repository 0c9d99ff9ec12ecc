//! clipboard-read: print the clipboard to stdout using whatever paste
//! program the platform provides.

use anyhow::Result;
use tracing::debug;

use crate::config::Settings;
use crate::error::ShellkitError;
use crate::sanity::binary_exists;
use crate::tool_runner::{OutputMode, run_tool};
use crate::tool_traits::ToolArgs;
use crate::types::{ClipboardBackend, ClipboardSelection};

/// Paste command for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteArgs {
    pub backend: ClipboardBackend,
    pub selection: ClipboardSelection,
}

impl ToolArgs for PasteArgs {
    fn program(&self) -> &str {
        self.backend.binary()
    }

    fn to_cli_args(&self) -> Vec<String> {
        let primary = self.selection == ClipboardSelection::Primary;
        let args: &[&str] = match (self.backend, primary) {
            // pbpaste has no primary selection
            (ClipboardBackend::Pbpaste, _) => &[],
            (ClipboardBackend::WlPaste, false) => &["--no-newline"],
            (ClipboardBackend::WlPaste, true) => &["--no-newline", "--primary"],
            (ClipboardBackend::Xclip, false) => &["-selection", "clipboard", "-o"],
            (ClipboardBackend::Xclip, true) => &["-selection", "primary", "-o"],
            (ClipboardBackend::Xsel, false) => &["--clipboard", "--output"],
            (ClipboardBackend::Xsel, true) => &["--primary", "--output"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }
}

/// Backends to try, most specific first.
pub fn candidate_backends(settings: &Settings, macos: bool) -> Vec<ClipboardBackend> {
    if let Some(forced) = settings.clipboard_backend {
        return vec![forced];
    }
    let mut candidates = Vec::with_capacity(4);
    if macos {
        candidates.push(ClipboardBackend::Pbpaste);
    }
    if settings.wayland {
        candidates.push(ClipboardBackend::WlPaste);
    }
    candidates.push(ClipboardBackend::Xclip);
    candidates.push(ClipboardBackend::Xsel);
    candidates
}

/// Pick the first installed backend.
pub fn select_backend<F>(candidates: &[ClipboardBackend], mut installed: F) -> Result<ClipboardBackend, ShellkitError>
where
    F: FnMut(&str) -> bool,
{
    candidates
        .iter()
        .copied()
        .find(|backend| installed(backend.binary()))
        .ok_or_else(|| {
            let tried: Vec<&str> = candidates.iter().map(|b| b.binary()).collect();
            ShellkitError::validation(format!(
                "no clipboard source available (tried {})",
                tried.join(", ")
            ))
        })
}

/// Run clipboard-read; returns the backend's exit status.
pub fn run(settings: &Settings) -> Result<i32> {
    let candidates = candidate_backends(settings, cfg!(target_os = "macos"));
    let backend = select_backend(&candidates, binary_exists)?;
    debug!(%backend, "selected clipboard backend");

    let args = PasteArgs {
        backend,
        selection: settings.clipboard_selection,
    };
    Ok(run_tool(&args, OutputMode::Inherit)?.status_code())
}
