//! Worker process pools.
//!
//! The daemon isolates request categories into separate OS processes rather
//! than one shared thread pool, to bound blast radius and allow independent
//! resource limits per category. Each spawned worker re-execs the current
//! binary with a hidden `--worker-role` flag, registers its own PID under a
//! role-specific name, and ignores SIGINT (only the parent reacts to
//! shutdown signals).

use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Child, Command};
use std::time::Duration;

use crate::bootstrap::pidfile;

/// Request category served by a dedicated worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerRole {
    /// General request execution.
    LocalRequest,
    /// Authentication handling.
    Authentication,
    /// Security event ingestion.
    SecurityEvents,
}

impl WorkerRole {
    /// Every pool role, in spawn order.
    pub const ALL: [WorkerRole; 3] = [
        WorkerRole::LocalRequest,
        WorkerRole::Authentication,
        WorkerRole::SecurityEvents,
    ];

    /// Process name the worker registers its PID under.
    pub fn process_name(self) -> &'static str {
        match self {
            Self::LocalRequest => "vigil-apid_exec",
            Self::Authentication => "vigil-apid_auth",
            Self::SecurityEvents => "vigil-apid_events",
        }
    }

    /// Value passed via the hidden `--worker-role` flag.
    pub fn flag_name(self) -> &'static str {
        match self {
            Self::LocalRequest => "exec",
            Self::Authentication => "auth",
            Self::SecurityEvents => "events",
        }
    }

    /// Parse the `--worker-role` flag value.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "exec" => Some(Self::LocalRequest),
            "auth" => Some(Self::Authentication),
            "events" => Some(Self::SecurityEvents),
            _ => None,
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.process_name())
    }
}

/// Handle to a spawned pool worker, owned by the orchestrator.
///
/// Shutdown iterates these handles; there are no ambient process-table
/// lookups.
#[derive(Debug)]
pub struct WorkerHandle {
    /// Role this worker serves.
    pub role: WorkerRole,
    /// OS process ID of the worker.
    pub pid: u32,
    child: Option<Child>,
}

impl WorkerHandle {
    /// Handle for a process spawned elsewhere (tests, recording doubles).
    pub fn detached(role: WorkerRole, pid: u32) -> Self {
        Self {
            role,
            pid,
            child: None,
        }
    }
}

/// Spawn a pool worker by re-exec'ing the current binary.
pub fn spawn_worker(role: WorkerRole, config_file: Option<&Path>) -> io::Result<WorkerHandle> {
    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    command.arg("--worker-role").arg(role.flag_name());
    if let Some(config_file) = config_file {
        command.arg("-c").arg(config_file);
    }

    let child = command.spawn()?;
    let pid = child.id();
    tracing::info!(role = %role, pid, "Spawned pool worker");

    Ok(WorkerHandle {
        role,
        pid,
        child: Some(child),
    })
}

/// Worker-side entry point. Registers the PID under the role name, ignores
/// SIGINT, and idles until the parent terminates the process.
pub fn run_worker(role: WorkerRole, pid_dir: &Path) -> io::Result<()> {
    let pid = std::process::id();
    pidfile::create_pid(pid_dir, role.process_name(), pid)?;

    // Only the parent reacts to interrupt signals.
    // SAFETY: SigIgn installs no handler code; this is async-signal-safe.
    unsafe {
        let _ = nix::sys::signal::signal(
            nix::sys::signal::Signal::SIGINT,
            nix::sys::signal::SigHandler::SigIgn,
        );
    }

    tracing::info!(role = %role, pid, "Pool worker ready");
    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

/// Terminate every spawned worker and remove its PID file.
pub fn terminate_workers(workers: &mut Vec<WorkerHandle>, pid_dir: &Path) {
    for worker in workers.iter_mut() {
        let target = nix::unistd::Pid::from_raw(worker.pid as i32);
        if let Err(errno) = nix::sys::signal::kill(target, nix::sys::signal::Signal::SIGTERM) {
            tracing::warn!(role = %worker.role, pid = worker.pid, error = %errno, "Failed to signal worker");
        }
        if let Some(child) = worker.child.as_mut() {
            let _ = child.wait();
        }
        if let Err(error) = pidfile::delete_pid(pid_dir, worker.role.process_name(), worker.pid) {
            tracing::warn!(role = %worker.role, error = %error, "Failed to remove worker PID file");
        }
    }
    workers.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_flags_round_trip() {
        for role in WorkerRole::ALL {
            assert_eq!(WorkerRole::from_flag(role.flag_name()), Some(role));
        }
        assert_eq!(WorkerRole::from_flag("bogus"), None);
    }

    #[test]
    fn process_names_are_role_specific() {
        assert_eq!(WorkerRole::LocalRequest.process_name(), "vigil-apid_exec");
        assert_eq!(WorkerRole::Authentication.process_name(), "vigil-apid_auth");
        assert_eq!(WorkerRole::SecurityEvents.process_name(), "vigil-apid_events");
    }
}
