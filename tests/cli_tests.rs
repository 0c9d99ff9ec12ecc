//! End-to-end tests for the tool binaries
//!
//! These run the compiled binaries the way a user would and check the
//! acceptance properties every tool shares:
//! - insufficient arguments print usage and exit 1
//! - the delegate's exit status is passed through
//! - string-replace with identical literal text leaves input untouched
//! - run-quiet-on-success is silent on success and replays output on failure
//!
//! Delegates that cannot be assumed on a CI box (ssh, xclip) are replaced by
//! small scripts placed first on PATH.

use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn bin(name: &str) -> PathBuf {
    let path = match name {
        "shellkit" => env!("CARGO_BIN_EXE_shellkit"),
        "string-replace" => env!("CARGO_BIN_EXE_string-replace"),
        "clipboard-read" => env!("CARGO_BIN_EXE_clipboard-read"),
        "ssh-wait" => env!("CARGO_BIN_EXE_ssh-wait"),
        "git-squash" => env!("CARGO_BIN_EXE_git-squash"),
        "tmux-run" => env!("CARGO_BIN_EXE_tmux-run"),
        "path-uppercase" => env!("CARGO_BIN_EXE_path-uppercase"),
        "run-quiet-on-success" => env!("CARGO_BIN_EXE_run-quiet-on-success"),
        other => panic!("unknown binary {}", other),
    };
    PathBuf::from(path)
}

fn tool(name: &str) -> Command {
    let mut cmd = Command::new(bin(name));
    cmd.env_remove("SHELLKIT_DRY_RUN").env_remove("SHELLKIT_LOG");
    cmd
}

fn run_with_stdin(mut cmd: Command, input: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tool");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Write an executable script into `dir`.
fn fake_program(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// PATH with `dir` searched first.
fn path_with(dir: &Path) -> String {
    format!(
        "{}:{}",
        dir.display(),
        std::env::var("PATH").unwrap_or_default()
    )
}

// =============================================================================
// Usage errors
// =============================================================================

#[test]
fn test_every_tool_exits_1_with_usage_when_arguments_missing() {
    for name in [
        "string-replace",
        "ssh-wait",
        "git-squash",
        "tmux-run",
        "path-uppercase",
        "run-quiet-on-success",
    ] {
        let output = tool(name).output().unwrap();
        assert_eq!(output.status.code(), Some(1), "{} exit code", name);
        let all = text(&output.stdout) + &text(&output.stderr);
        assert!(all.contains("Usage:"), "{} printed no usage: {}", name, all);
    }
}

#[test]
fn test_string_replace_one_argument_is_usage_error() {
    let output = tool("string-replace").arg("before").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("Usage:"));
}

#[test]
fn test_help_exits_zero() {
    let output = tool("string-replace").arg("-h").output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(text(&output.stdout).contains("--ignore-case"));
}

// =============================================================================
// string-replace
// =============================================================================

#[test]
fn test_string_replace_stdin_literal() {
    let mut cmd = tool("string-replace");
    cmd.args(["a.b", "c&d"]);
    let output = run_with_stdin(cmd, "a.b aXb a.b\n");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(text(&output.stdout), "c&d aXb c&d\n");
}

#[test]
fn test_string_replace_tolerates_non_utf8_environment() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let mut cmd = tool("string-replace");
    cmd.env("SHELLKIT_UNRELATED", OsStr::from_bytes(b"\xff"))
        .env("STRING_REPLACE_SED", OsStr::from_bytes(b"se\xffd"))
        .args(["hello", "bye"]);
    let output = run_with_stdin(cmd, "hello\n");

    assert_eq!(output.status.code(), Some(0), "{}", text(&output.stderr));
    assert_eq!(text(&output.stdout), "bye\n");
}

#[test]
fn test_string_replace_file_named_like_option() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("-n"), "hello\n").unwrap();

    let output = tool("string-replace")
        .current_dir(dir.path())
        .args(["--", "hello", "bye", "-n"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", text(&output.stderr));
    assert_eq!(fs::read_to_string(dir.path().join("-n")).unwrap(), "bye\n");
}

#[test]
fn test_string_replace_regex_mode() {
    let mut cmd = tool("string-replace");
    cmd.args(["-e", r"v([0-9]+)", r"version \1"]);
    let output = run_with_stdin(cmd, "v12 and v3\n");
    assert_eq!(text(&output.stdout), "version 12 and version 3\n");
}

#[test]
fn test_string_replace_identical_text_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("data.txt");
    let original = "path/to/*.rs [x] $HOME & more\nsecond line\n";
    fs::write(&file, original).unwrap();

    let output = tool("string-replace")
        .args(["path/to/*.rs", "path/to/*.rs"])
        .arg(&file)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(fs::read_to_string(&file).unwrap(), original);
}

#[test]
fn test_string_replace_preview_does_not_edit() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("data.txt");
    fs::write(&file, "old\n").unwrap();

    let output = tool("string-replace")
        .args(["-d", "old", "new"])
        .arg(&file)
        .output()
        .unwrap();

    assert_eq!(text(&output.stdout), "new\n");
    assert_eq!(fs::read_to_string(&file).unwrap(), "old\n");
}

#[test]
fn test_string_replace_missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    let output = tool("string-replace")
        .args(["a", "b"])
        .arg(dir.path().join("missing.txt"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("no such file or directory"));
}

#[test]
fn test_string_replace_directory_needs_flag() {
    let dir = TempDir::new().unwrap();
    let output = tool("string-replace")
        .args(["a", "b"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("use -r"));
}

#[test]
fn test_string_replace_directory_preview_lists_matches() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hit.txt"), "needle\n").unwrap();
    fs::write(dir.path().join("miss.txt"), "hay\n").unwrap();

    let output = tool("string-replace")
        .args(["-rd", "needle", "pin"])
        .arg(dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let listed = text(&output.stdout);
    assert!(listed.contains("hit.txt"));
    assert!(!listed.contains("miss.txt"));
    assert_eq!(fs::read_to_string(dir.path().join("hit.txt")).unwrap(), "needle\n");
}

// =============================================================================
// run-quiet-on-success
// =============================================================================

#[test]
fn test_run_quiet_silent_on_success() {
    let output = tool("run-quiet-on-success")
        .args(["sh", "-c", "echo hello; echo warn >&2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

#[test]
fn test_run_quiet_replays_output_and_propagates_code() {
    let output = tool("run-quiet-on-success")
        .args(["sh", "-c", "echo partial; echo broken >&2; exit 42"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(42));
    assert_eq!(text(&output.stdout), "partial\nbroken\n");
    assert!(text(&output.stderr).contains("exited with status 42"));
}

#[test]
fn test_run_quiet_missing_command_is_127() {
    let output = tool("run-quiet-on-success")
        .arg("shellkit-no-such-command")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(127));
    assert!(text(&output.stdout).contains("command not found"));
}

// =============================================================================
// path-uppercase
// =============================================================================

#[test]
fn test_path_uppercase_renames() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("todo.txt");
    fs::write(&file, "x").unwrap();

    let output = tool("path-uppercase").arg(&file).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty(), "rename should be silent");
    assert!(dir.path().join("TODO.TXT").exists());
}

#[test]
fn test_path_uppercase_missing_path_exits_1() {
    let dir = TempDir::new().unwrap();
    let output = tool("path-uppercase")
        .arg(dir.path().join("nothing"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

// =============================================================================
// tmux-run
// =============================================================================

#[test]
fn test_tmux_run_outside_tmux_without_target_exits_1() {
    let output = tool("tmux-run")
        .env_remove("TMUX")
        .env_remove("TMUX_RUN_TARGET")
        .args(["htop"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("not inside a tmux session"));
}

#[test]
fn test_tmux_run_passes_tmux_exit_code() {
    let fakes = TempDir::new().unwrap();
    fake_program(fakes.path(), "tmux", "echo \"$@\" > \"$(dirname \"$0\")/args\"; exit 3");

    let output = tool("tmux-run")
        .env("PATH", path_with(fakes.path()))
        .env("TMUX", "/tmp/fake,1,0")
        .args(["-n", "logs", "tail", "-f", "x.log"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let args = fs::read_to_string(fakes.path().join("args")).unwrap();
    assert!(args.starts_with("new-window -c "));
    assert!(args.trim_end().ends_with("-n logs tail -f x.log"));
}

// =============================================================================
// clipboard-read
// =============================================================================

#[test]
fn test_clipboard_read_uses_backend() {
    let fakes = TempDir::new().unwrap();
    fake_program(fakes.path(), "xclip", "printf 'clip contents'");

    let output = tool("clipboard-read")
        .env("PATH", path_with(fakes.path()))
        .env("CLIPBOARD_BACKEND", "xclip")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(text(&output.stdout), "clip contents");
}

#[test]
fn test_clipboard_read_invalid_backend_env_falls_back() {
    let fakes = TempDir::new().unwrap();
    fake_program(fakes.path(), "xclip", "printf 'clip contents'");

    let output = tool("clipboard-read")
        .env("PATH", path_with(fakes.path()))
        .env("CLIPBOARD_BACKEND", "carrier-pigeon")
        .env("CLIPBOARD_SELECTION", "sideways")
        .env_remove("WAYLAND_DISPLAY")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", text(&output.stderr));
    assert_eq!(text(&output.stdout), "clip contents");
}

#[test]
fn test_clipboard_read_without_source_exits_1() {
    let empty = TempDir::new().unwrap();
    let output = tool("clipboard-read")
        .env("PATH", empty.path())
        .env_remove("CLIPBOARD_BACKEND")
        .env_remove("WAYLAND_DISPLAY")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("no clipboard source available"));
}

// =============================================================================
// ssh-wait
// =============================================================================

#[test]
fn test_ssh_wait_succeeds_when_probe_succeeds() {
    let fakes = TempDir::new().unwrap();
    fake_program(fakes.path(), "ssh", "exit 0");

    let output = tool("ssh-wait")
        .env("PATH", path_with(fakes.path()))
        .args(["--interval", "0", "build-box"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(text(&output.stderr).contains("build-box is up"));
}

#[test]
fn test_ssh_wait_retries_until_reachable() {
    let fakes = TempDir::new().unwrap();
    // Fails twice, then succeeds
    fake_program(
        fakes.path(),
        "ssh",
        "c=\"$(dirname \"$0\")/count\"; n=$(cat \"$c\" 2>/dev/null || echo 0); n=$((n+1)); echo $n > \"$c\"; [ $n -ge 3 ]",
    );

    let output = tool("ssh-wait")
        .env("PATH", path_with(fakes.path()))
        .args(["--interval", "0", "build-box"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(fs::read_to_string(fakes.path().join("count")).unwrap().trim(), "3");
}

#[test]
fn test_ssh_wait_max_attempts_exits_1() {
    let fakes = TempDir::new().unwrap();
    fake_program(fakes.path(), "ssh", "exit 255");

    let output = tool("ssh-wait")
        .env("PATH", path_with(fakes.path()))
        .args(["--interval", "0", "--max-attempts", "2", "down-box"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("still unreachable after 2 attempts"));
}

#[test]
fn test_ssh_wait_dry_run_still_probes() {
    let fakes = TempDir::new().unwrap();
    fake_program(fakes.path(), "ssh", "exit 255");

    let output = tool("ssh-wait")
        .env("PATH", path_with(fakes.path()))
        .env("SHELLKIT_DRY_RUN", "1")
        .args(["--interval", "0", "--max-attempts", "2", "down-box"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!text(&output.stderr).contains("down-box is up"));
}

// =============================================================================
// shellkit multiplexer
// =============================================================================

#[test]
fn test_multiplexer_dry_run_prints_delegate() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("f.txt");
    fs::write(&file, "x\n").unwrap();

    let output = tool("shellkit")
        .args(["--dry-run", "string-replace", "x", "y"])
        .arg(&file)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(text(&output.stdout).starts_with("[DRY RUN] sed -E -i -e s/x/y/g"));
    assert_eq!(fs::read_to_string(&file).unwrap(), "x\n");
}

#[test]
fn test_multiplexer_check_json() {
    let output = tool("shellkit").args(["check", "--json"]).output().unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(report["delegates"].as_array().unwrap().len() >= 10);
}

#[test]
fn test_multiplexer_completions() {
    let output = tool("shellkit").args(["completions", "bash"]).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(text(&output.stdout).contains("string-replace"));
}

// =============================================================================
// git-squash
// =============================================================================

fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("git available");
    assert!(output.status.success(), "git {:?}: {}", args, text(&output.stderr));
    text(&output.stdout).trim().to_string()
}

/// Repo on `main` with a `feature` branch three commits ahead.
fn feature_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = dir.path();
    git(repo, &["init", "--quiet", "--initial-branch=main"]);
    fs::write(repo.join("base.txt"), "base\n").unwrap();
    git(repo, &["add", "."]);
    git(repo, &["commit", "--quiet", "-m", "base"]);
    git(repo, &["checkout", "--quiet", "-b", "feature"]);
    for n in 1..=3 {
        fs::write(repo.join(format!("f{}.txt", n)), "x\n").unwrap();
        git(repo, &["add", "."]);
        git(repo, &["commit", "--quiet", "-m", &format!("step {}", n)]);
    }
    dir
}

fn git_squash(repo: &Path) -> Command {
    let mut cmd = tool("git-squash");
    cmd.arg("-C")
        .arg(repo)
        .env("GIT_EDITOR", "true")
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com");
    cmd
}

#[test]
fn test_git_squash_combines_commits() {
    let dir = feature_repo();
    let repo = dir.path();

    let output = git_squash(repo).args(["--no-edit", "main"]).output().unwrap();
    assert!(output.status.success(), "{}", text(&output.stderr));

    assert_eq!(git(repo, &["rev-list", "--count", "main..HEAD"]), "1");
    let message = git(repo, &["log", "-1", "--format=%B"]);
    assert_eq!(message, "step 1\n\nstep 2\n\nstep 3");
    assert!(repo.join("f3.txt").exists());
}

#[test]
fn test_git_squash_with_message() {
    let dir = feature_repo();
    let repo = dir.path();

    let output = git_squash(repo)
        .args(["--no-edit", "-m", "feature done", "main"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", text(&output.stderr));
    assert_eq!(git(repo, &["log", "-1", "--format=%s"]), "feature done");
    assert_eq!(git(repo, &["rev-list", "--count", "main..HEAD"]), "1");
}

#[test]
fn test_git_squash_refuses_dirty_tree() {
    let dir = feature_repo();
    let repo = dir.path();
    fs::write(repo.join("f1.txt"), "changed\n").unwrap();
    let head = git(repo, &["rev-parse", "HEAD"]);

    let output = git_squash(repo).args(["--no-edit", "main"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(git(repo, &["rev-parse", "HEAD"]), head);
}

#[test]
fn test_git_squash_unknown_branch_exits_1() {
    let dir = feature_repo();
    let output = git_squash(dir.path())
        .args(["--no-edit", "no-such-branch"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).starts_with("git-squash: "));
}

#[test]
fn test_git_squash_restores_branch_when_commit_fails() {
    let dir = feature_repo();
    let repo = dir.path();
    let head = git(repo, &["rev-parse", "HEAD"]);

    // An editor that fails aborts the commit
    let output = git_squash(repo)
        .env("GIT_EDITOR", "false")
        .arg("main")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).contains("branch restored"));
    assert_eq!(git(repo, &["rev-parse", "HEAD"]), head);
}

#[test]
fn test_git_squash_dry_run_leaves_branch_alone() {
    let dir = feature_repo();
    let repo = dir.path();
    let head = git(repo, &["rev-parse", "HEAD"]);

    let output = tool("shellkit")
        .args(["--dry-run", "git-squash", "--no-edit", "-C"])
        .arg(repo)
        .arg("main")
        .env("GIT_EDITOR", "true")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", text(&output.stderr));
    let stdout = text(&output.stdout);
    assert!(stdout.contains("[DRY RUN] git -C"));
    assert!(stdout.contains("reset --soft"));
    assert!(stdout.contains("Would squash 3 commits"));
    assert_eq!(git(repo, &["rev-parse", "HEAD"]), head);
    assert_eq!(git(repo, &["rev-list", "--count", "main..HEAD"]), "3");
}
