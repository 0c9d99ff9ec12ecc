//! Child process lifecycle for wrapped commands
//!
//! Tools that capture a delegate's output (run-quiet-on-success, the
//! string-replace pipeline) must not leave that delegate running when the
//! wrapper itself is interrupted. Pipeline stages lead their own process
//! groups and are signalled as a group, which also reaches the sed workers
//! that `xargs -P` forks. This module keeps a process-wide registry
//! of such children and tears them down on SIGINT/SIGTERM/SIGHUP or when a
//! [`ProcessGuard`] is dropped.
//!
//! Interactive delegates (an editor under `git commit`, an `ssh` session,
//! `tmux`) are never registered: they share the terminal's foreground
//! process group and receive terminal signals themselves.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static CHILD_REGISTRY: OnceLock<Arc<Mutex<ChildRegistry>>> = OnceLock::new();

/// Grace period between SIGTERM and SIGKILL when a signal arrives.
pub const SIGNAL_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Registry tracking spawned child processes.
#[derive(Debug, Default)]
pub struct ChildRegistry {
    /// PID -> whether the child leads its own process group
    children: HashMap<u32, bool>,
    /// Set once teardown started so a second signal does not repeat it
    cleanup_initiated: bool,
}

impl ChildRegistry {
    /// Get or create the global child registry
    pub fn global() -> Arc<Mutex<ChildRegistry>> {
        CHILD_REGISTRY
            .get_or_init(|| Arc::new(Mutex::new(ChildRegistry::default())))
            .clone()
    }

    /// Lock the global registry, recovering from a poisoned mutex.
    pub fn lock_global(registry: &Mutex<ChildRegistry>) -> MutexGuard<'_, ChildRegistry> {
        registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a child that shares our process group.
    pub fn register(&mut self, pid: u32) {
        self.children.insert(pid, false);
        debug!(pid, "registered child process");
    }

    /// Register a child that leads its own process group.
    pub fn register_group_leader(&mut self, pid: u32) {
        self.children.insert(pid, true);
        debug!(pid, "registered child process group");
    }

    /// Forget a child once it has been reaped.
    pub fn unregister(&mut self, pid: u32) {
        self.children.remove(&pid);
        debug!(pid, "unregistered child process");
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// Terminate every tracked child: SIGTERM, wait up to `grace_period`,
    /// then SIGKILL whatever is left.
    pub fn terminate_all(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            debug!("child cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        if self.children.is_empty() {
            return;
        }

        info!(count = self.children.len(), "terminating child processes");
        let targets: Vec<(u32, bool)> = self.children.iter().map(|(&p, &g)| (p, g)).collect();

        for &(pid, group) in &targets {
            if let Err(e) = deliver(pid, group, Signal::SIGTERM) {
                warn!(pid, error = %e, "failed to send SIGTERM");
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if targets.iter().all(|&(pid, _)| !is_process_alive(pid)) {
                debug!("all child processes exited after SIGTERM");
                self.children.clear();
                return;
            }
            std::thread::sleep(Duration::from_millis(50));
        }

        for &(pid, group) in &targets {
            if is_process_alive(pid) {
                warn!(pid, "child ignored SIGTERM, sending SIGKILL");
                let _ = deliver(pid, group, Signal::SIGKILL);
            }
        }
        self.children.clear();
    }
}

/// Signal a child, or its whole process group when it leads one.
fn deliver(pid: u32, group: bool, sig: Signal) -> Result<(), nix::Error> {
    let raw = pid as i32;
    if group {
        // Negative PID addresses the group; fall back to the leader alone.
        signal::kill(Pid::from_raw(-raw), sig).or_else(|_| signal::kill(Pid::from_raw(raw), sig))
    } else {
        signal::kill(Pid::from_raw(raw), sig)
    }
}

/// Check if a process is still alive (zombies count as dead).
pub fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/<pid>/stat is the state letter.
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        if let Some(state) = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
        {
            return !matches!(state, "Z" | "X");
        }
    }

    true
}

/// RAII guard that terminates registered children on drop.
pub struct ProcessGuard {
    registry: Arc<Mutex<ChildRegistry>>,
    grace_period: Duration,
}

impl ProcessGuard {
    /// Create a guard attached to the global registry.
    pub fn new() -> Self {
        Self {
            registry: ChildRegistry::global(),
            grace_period: Duration::from_secs(5),
        }
    }
}

impl Default for ProcessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        debug!("process guard dropped");
        ChildRegistry::lock_global(&self.registry).terminate_all(self.grace_period);
    }
}

/// Install SIGINT/SIGTERM/SIGHUP handlers that tear down registered
/// children and exit with 128 + signal number.
///
/// Only call this for tools whose delegates run non-interactively.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "signal",
            };
            info!("received {}, cleaning up", name);

            let registry = ChildRegistry::global();
            ChildRegistry::lock_global(&registry).terminate_all(SIGNAL_GRACE_PERIOD);

            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

/// Extension trait for `std::process::Command` controlling how a child is
/// tied to this process.
pub trait CommandProcessGroup {
    /// Run the child as leader of a new process group so the whole tree can
    /// be signalled at once. Not for anything that reads the terminal.
    fn in_new_process_group(&mut self) -> &mut Self;

    /// Ask the kernel to SIGTERM the child if this process dies first.
    /// No-op outside Linux.
    fn with_parent_death_signal(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        self.process_group(0);
        self.with_parent_death_signal()
    }

    #[cfg(target_os = "linux")]
    fn with_parent_death_signal(&mut self) -> &mut Self {
        use nix::libc;
        use std::os::unix::process::CommandExt;
        // SAFETY: prctl is async-signal-safe and touches no parent state.
        unsafe {
            self.pre_exec(|| {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self
    }

    #[cfg(not(target_os = "linux"))]
    fn with_parent_death_signal(&mut self) -> &mut Self {
        self
    }
}
