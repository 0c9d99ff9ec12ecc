//! Small closed sets of choices shared by the CLI and the tools.
//!
//! Stringly-typed flag values become enums here so clap, config parsing and
//! the tools agree on spelling.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToTitleCase};
use serde::Serialize;
use strum::{Display, EnumIter, EnumString};

/// Target case for a file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display, EnumString, EnumIter, clap::ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum CaseStyle {
    /// NOTES.TXT
    #[default]
    Upper,
    /// notes.txt
    Lower,
    /// my_notes
    Snake,
    /// my-notes
    Kebab,
    /// MY_NOTES
    ShoutySnake,
    /// myNotes
    Camel,
    /// My Notes
    Title,
}

impl CaseStyle {
    /// Convert `text` to this style.
    ///
    /// Upper and lower map every character; the word-based styles split on
    /// case changes and separators the way `heck` does.
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Snake => text.to_snake_case(),
            Self::Kebab => text.to_kebab_case(),
            Self::ShoutySnake => text.to_shouty_snake_case(),
            Self::Camel => text.to_lower_camel_case(),
            Self::Title => text.to_title_case(),
        }
    }
}

/// Program used to read the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[derive(Display, EnumString, EnumIter, clap::ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum ClipboardBackend {
    /// macOS pasteboard
    Pbpaste,
    /// Wayland (wl-clipboard)
    WlPaste,
    Xclip,
    Xsel,
}

impl ClipboardBackend {
    /// Executable name on `PATH`.
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Pbpaste => "pbpaste",
            Self::WlPaste => "wl-paste",
            Self::Xclip => "xclip",
            Self::Xsel => "xsel",
        }
    }
}

/// Which X11/Wayland selection to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display, EnumString, EnumIter, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum ClipboardSelection {
    #[default]
    Clipboard,
    Primary,
}
