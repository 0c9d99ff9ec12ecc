//! Environment-variable defaults
//!
//! Each tool reads its tunables from the environment once, at start-up, into
//! a [`Settings`] value. Command-line flags override these. Values that fail
//! to parse fall back to the built-in default with a warning rather than
//! aborting, matching how shell scripts treat `${VAR:-default}`.

use crate::types::{ClipboardBackend, ClipboardSelection};
use std::collections::HashMap;
use std::ffi::OsString;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const ENV_DRY_RUN: &str = "SHELLKIT_DRY_RUN";
pub const ENV_LOG: &str = "SHELLKIT_LOG";
pub const ENV_SSH_INTERVAL: &str = "SSH_WAIT_INTERVAL";
pub const ENV_SSH_CONNECT_TIMEOUT: &str = "SSH_WAIT_CONNECT_TIMEOUT";
pub const ENV_REPLACE_JOBS: &str = "STRING_REPLACE_JOBS";
pub const ENV_REPLACE_SED: &str = "STRING_REPLACE_SED";
pub const ENV_CLIPBOARD_BACKEND: &str = "CLIPBOARD_BACKEND";
pub const ENV_CLIPBOARD_SELECTION: &str = "CLIPBOARD_SELECTION";
pub const ENV_TMUX_TARGET: &str = "TMUX_RUN_TARGET";

const DEFAULT_SSH_INTERVAL_SECS: u64 = 5;
const DEFAULT_SSH_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Defaults gathered from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dry_run: bool,
    pub ssh_interval: Duration,
    pub ssh_connect_timeout: Duration,
    pub replace_jobs: usize,
    pub sed_program: String,
    pub clipboard_backend: Option<ClipboardBackend>,
    pub clipboard_selection: ClipboardSelection,
    pub tmux_target: Option<String>,
    /// Set when running inside a tmux client (`$TMUX`)
    pub inside_tmux: bool,
    /// Set when a Wayland compositor is reachable (`$WAYLAND_DISPLAY`)
    pub wayland: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dry_run: false,
            ssh_interval: Duration::from_secs(DEFAULT_SSH_INTERVAL_SECS),
            ssh_connect_timeout: Duration::from_secs(DEFAULT_SSH_CONNECT_TIMEOUT_SECS),
            replace_jobs: default_jobs(),
            sed_program: "sed".to_string(),
            clipboard_backend: None,
            clipboard_selection: ClipboardSelection::default(),
            tmux_target: None,
            inside_tmux: false,
            wayland: false,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Unrelated variables are never decoded, so a non-UTF-8 value elsewhere
    /// in the environment is harmless. One of ours that is not UTF-8 is
    /// ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_vars(known_vars(std::env::vars_os()))
    }

    /// Read settings from an explicit set of variables.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Self {
            dry_run: get(ENV_DRY_RUN).is_some_and(parse_flag),
            ssh_interval: get(ENV_SSH_INTERVAL)
                .and_then(|v| parse_or_warn::<u64>(ENV_SSH_INTERVAL, v))
                .map(Duration::from_secs)
                .unwrap_or(defaults.ssh_interval),
            ssh_connect_timeout: get(ENV_SSH_CONNECT_TIMEOUT)
                .and_then(|v| parse_or_warn::<u64>(ENV_SSH_CONNECT_TIMEOUT, v))
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.ssh_connect_timeout),
            replace_jobs: get(ENV_REPLACE_JOBS)
                .and_then(|v| parse_or_warn::<usize>(ENV_REPLACE_JOBS, v))
                .filter(|&jobs| jobs > 0)
                .unwrap_or(defaults.replace_jobs),
            sed_program: get(ENV_REPLACE_SED)
                .map(str::to_string)
                .unwrap_or(defaults.sed_program),
            clipboard_backend: get(ENV_CLIPBOARD_BACKEND)
                .and_then(|v| parse_or_warn::<ClipboardBackend>(ENV_CLIPBOARD_BACKEND, v)),
            clipboard_selection: get(ENV_CLIPBOARD_SELECTION)
                .and_then(|v| parse_or_warn::<ClipboardSelection>(ENV_CLIPBOARD_SELECTION, v))
                .unwrap_or(defaults.clipboard_selection),
            tmux_target: get(ENV_TMUX_TARGET).map(str::to_string),
            inside_tmux: get("TMUX").is_some(),
            wayland: get("WAYLAND_DISPLAY").is_some(),
        }
    }
}

/// Every variable [`Settings::from_vars`] looks at.
const KNOWN_VARS: &[&str] = &[
    ENV_DRY_RUN,
    ENV_SSH_INTERVAL,
    ENV_SSH_CONNECT_TIMEOUT,
    ENV_REPLACE_JOBS,
    ENV_REPLACE_SED,
    ENV_CLIPBOARD_BACKEND,
    ENV_CLIPBOARD_SELECTION,
    ENV_TMUX_TARGET,
    "TMUX",
    "WAYLAND_DISPLAY",
];

/// Keep the variables we read, as UTF-8.
fn known_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let key = key.to_str().filter(|k| KNOWN_VARS.contains(k))?.to_string();
            match value.into_string() {
                Ok(value) => Some((key, value)),
                Err(raw) => {
                    warn!("ignoring non-UTF-8 {}={:?}, using default", key, raw);
                    None
                }
            }
        })
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring invalid {}={:?}, using default", key, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_environment_uses_defaults() {
        let settings = Settings::from_vars(Vec::<(String, String)>::new());
        assert_eq!(settings, Settings::default());
        assert!(settings.replace_jobs >= 1);
        assert_eq!(settings.sed_program, "sed");
    }

    #[test]
    fn test_values_are_read() {
        let settings = Settings::from_vars([
            (ENV_DRY_RUN, "yes"),
            (ENV_SSH_INTERVAL, "2"),
            (ENV_SSH_CONNECT_TIMEOUT, "9"),
            (ENV_REPLACE_JOBS, "3"),
            (ENV_REPLACE_SED, "gsed"),
            (ENV_CLIPBOARD_BACKEND, "xsel"),
            (ENV_CLIPBOARD_SELECTION, "primary"),
            (ENV_TMUX_TARGET, "work"),
            ("TMUX", "/tmp/tmux-1000/default,123,0"),
            ("WAYLAND_DISPLAY", "wayland-0"),
        ]);
        assert!(settings.dry_run);
        assert_eq!(settings.ssh_interval, Duration::from_secs(2));
        assert_eq!(settings.ssh_connect_timeout, Duration::from_secs(9));
        assert_eq!(settings.replace_jobs, 3);
        assert_eq!(settings.sed_program, "gsed");
        assert_eq!(settings.clipboard_backend, Some(ClipboardBackend::Xsel));
        assert_eq!(settings.clipboard_selection, ClipboardSelection::Primary);
        assert_eq!(settings.tmux_target.as_deref(), Some("work"));
        assert!(settings.inside_tmux);
        assert!(settings.wayland);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let settings = Settings::from_vars([
            (ENV_SSH_INTERVAL, "soon"),
            (ENV_SSH_CONNECT_TIMEOUT, "0"),
            (ENV_REPLACE_JOBS, "0"),
            (ENV_CLIPBOARD_BACKEND, "carrier-pigeon"),
            (ENV_DRY_RUN, "nope"),
        ]);
        let defaults = Settings::default();
        assert_eq!(settings.ssh_interval, defaults.ssh_interval);
        assert_eq!(settings.ssh_connect_timeout, defaults.ssh_connect_timeout);
        assert_eq!(settings.replace_jobs, defaults.replace_jobs);
        assert_eq!(settings.clipboard_backend, None);
        assert!(!settings.dry_run);
    }

    #[test]
    fn test_non_utf8_environment_is_tolerated() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (OsString::from("UNRELATED"), OsString::from_vec(vec![0xff, 0xfe])),
            (OsString::from(ENV_TMUX_TARGET), OsString::from_vec(vec![b'w', 0xff])),
            (OsString::from(ENV_REPLACE_SED), OsString::from("gsed")),
        ];
        let kept = known_vars(vars);
        assert_eq!(kept, vec![(ENV_REPLACE_SED.to_string(), "gsed".to_string())]);

        let settings = Settings::from_vars(kept);
        assert_eq!(settings.tmux_target, None);
        assert_eq!(settings.sed_program, "gsed");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let settings = Settings::from_vars([("TMUX", ""), (ENV_TMUX_TARGET, "  ")]);
        assert!(!settings.inside_tmux);
        assert_eq!(settings.tmux_target, None);
    }
}
