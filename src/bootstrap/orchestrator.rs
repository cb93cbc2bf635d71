//! Startup orchestration.
//!
//! # Responsibilities
//! - Sequence the bootstrap steps in strict order
//! - Abort the whole sequence on any step failure
//! - Own the handles of everything it started
//!
//! # Design Decisions
//! - Fail fast: a half-initialized server must never begin serving
//! - Side effects go through `BootstrapEnv`, so tests can substitute a
//!   recording double and assert ordering
//! - Privilege drop is strictly last before serving; everything that needs
//!   elevated rights (TLS ownership, port binding prep) runs before it

use crate::bootstrap::workers::{WorkerHandle, WorkerRole};
use crate::net::tls::TlsError;

/// Error type for the bootstrap sequence. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Persisted authorization/role store failed its integrity check.
    #[error("authorization store integrity check failed: {0}")]
    IntegrityCheck(String),

    /// A pool worker could not be spawned.
    #[error("failed to spawn {role} worker: {source}")]
    WorkerSpawn {
        role: WorkerRole,
        #[source]
        source: std::io::Error,
    },

    /// TLS provisioning failed.
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// PID file housekeeping failed.
    #[error("PID file housekeeping failed: {0}")]
    PidFile(#[source] std::io::Error),

    /// Daemonization failed.
    #[error("daemonization failed: {0}")]
    Daemonize(String),

    /// Service account resolution or identity switch failed.
    #[error("privilege drop failed: {0}")]
    PrivilegeDrop(String),
}

/// Flags controlling which bootstrap steps run.
#[derive(Debug, Clone, Copy)]
pub struct BootstrapOptions {
    /// Run TLS provisioning (config `https.enabled`).
    pub https_enabled: bool,
    /// Skip daemonization and log to the console.
    pub foreground: bool,
    /// Keep running as the invoking (privileged) user.
    pub run_as_root: bool,
    /// Switch to the service account (config `process.drop_privileges`).
    pub drop_privileges: bool,
}

/// Transient process-scoped state produced by a successful bootstrap.
///
/// Owned exclusively by the orchestration path; request handling never
/// sees it.
#[derive(Debug)]
pub struct BootstrapState {
    /// Spawned pool workers, in spawn order. Shutdown iterates this list.
    pub workers: Vec<WorkerHandle>,

    /// Whether the process detached from its terminal.
    pub daemonized: bool,

    /// Whether the UID/GID switch happened.
    pub privileges_dropped: bool,

    /// PID of the (possibly re-forked) serving process.
    pub pid: u32,
}

/// Side-effect boundary of the bootstrap sequence.
///
/// The production implementation talks to the OS; tests record events.
pub trait BootstrapEnv {
    /// Step 1: verify the persisted authorization/role store.
    fn check_store_integrity(&mut self) -> Result<(), BootstrapError>;

    /// Step 2: spawn one pool worker for `role`.
    fn spawn_worker(&mut self, role: WorkerRole) -> Result<WorkerHandle, BootstrapError>;

    /// Step 3: materialize TLS key/cert, validate protocol, assign ownership.
    fn provision_tls(&mut self) -> Result<(), BootstrapError>;

    /// Step 4: remove PID files from a previous unclean shutdown.
    fn clean_stale_pid_files(&mut self) -> Result<(), BootstrapError>;

    /// Step 5: detach from the terminal.
    fn daemonize(&mut self) -> Result<(), BootstrapError>;

    /// Step 6: switch to the service account.
    fn drop_privileges(&mut self) -> Result<(), BootstrapError>;

    /// Step 7: record the main PID.
    fn write_pid_file(&mut self) -> Result<(), BootstrapError>;

    /// PID of the current process.
    fn current_pid(&self) -> u32 {
        std::process::id()
    }
}

/// Drives the bootstrap sequence once, single-threaded, before any
/// request-serving concurrency begins.
pub struct Orchestrator {
    options: BootstrapOptions,
}

impl Orchestrator {
    pub fn new(options: BootstrapOptions) -> Self {
        Self { options }
    }

    /// Run the full sequence. Any error aborts; the process must not
    /// continue past a failed step.
    pub fn run<E: BootstrapEnv>(&self, env: &mut E) -> Result<BootstrapState, BootstrapError> {
        env.check_store_integrity()?;

        let mut workers = Vec::with_capacity(WorkerRole::ALL.len());
        for role in WorkerRole::ALL {
            workers.push(env.spawn_worker(role)?);
        }

        if self.options.https_enabled {
            env.provision_tls()?;
        }

        env.clean_stale_pid_files()?;

        let daemonized = if self.options.foreground {
            tracing::info!("Starting API in foreground");
            false
        } else {
            env.daemonize()?;
            true
        };

        let privileges_dropped = if self.options.run_as_root {
            tracing::info!("Starting API as root");
            false
        } else if self.options.drop_privileges {
            env.drop_privileges()?;
            true
        } else {
            false
        };

        env.write_pid_file()?;

        Ok(BootstrapState {
            workers,
            daemonized,
            privileges_dropped,
            pid: env.current_pid(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::workers::WorkerHandle;

    /// Recording double: logs every step, optionally failing one of them.
    struct RecordingEnv {
        events: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl RecordingEnv {
        fn new() -> Self {
            Self {
                events: Vec::new(),
                fail_on: None,
            }
        }

        fn failing_at(step: &'static str) -> Self {
            Self {
                events: Vec::new(),
                fail_on: Some(step),
            }
        }

        fn step(&mut self, name: &str) -> Result<(), BootstrapError> {
            self.events.push(name.to_string());
            if self.fail_on == Some(name) {
                return Err(BootstrapError::IntegrityCheck(format!("forced {name}")));
            }
            Ok(())
        }
    }

    impl BootstrapEnv for RecordingEnv {
        fn check_store_integrity(&mut self) -> Result<(), BootstrapError> {
            self.step("integrity")
        }

        fn spawn_worker(&mut self, role: WorkerRole) -> Result<WorkerHandle, BootstrapError> {
            self.step(&format!("spawn:{}", role.flag_name()))?;
            Ok(WorkerHandle::detached(role, 100 + role.flag_name().len() as u32))
        }

        fn provision_tls(&mut self) -> Result<(), BootstrapError> {
            self.step("tls")
        }

        fn clean_stale_pid_files(&mut self) -> Result<(), BootstrapError> {
            self.step("clean_pids")
        }

        fn daemonize(&mut self) -> Result<(), BootstrapError> {
            self.step("daemonize")
        }

        fn drop_privileges(&mut self) -> Result<(), BootstrapError> {
            self.step("drop_privileges")
        }

        fn write_pid_file(&mut self) -> Result<(), BootstrapError> {
            self.step("write_pid")
        }

        fn current_pid(&self) -> u32 {
            4242
        }
    }

    fn options() -> BootstrapOptions {
        BootstrapOptions {
            https_enabled: true,
            foreground: false,
            run_as_root: false,
            drop_privileges: true,
        }
    }

    #[test]
    fn steps_run_in_strict_order() {
        let mut env = RecordingEnv::new();
        let state = Orchestrator::new(options()).run(&mut env).unwrap();

        assert_eq!(
            env.events,
            vec![
                "integrity",
                "spawn:exec",
                "spawn:auth",
                "spawn:events",
                "tls",
                "clean_pids",
                "daemonize",
                "drop_privileges",
                "write_pid",
            ]
        );
        assert_eq!(state.workers.len(), 3);
        assert!(state.daemonized);
        assert!(state.privileges_dropped);
        assert_eq!(state.pid, 4242);
    }

    #[test]
    fn privilege_drop_never_precedes_tls_or_worker_spawn() {
        let mut env = RecordingEnv::new();
        Orchestrator::new(options()).run(&mut env).unwrap();

        let position = |name: &str| env.events.iter().position(|e| e == name).unwrap();
        assert!(position("drop_privileges") > position("tls"));
        assert!(position("drop_privileges") > position("spawn:events"));
        assert!(position("write_pid") > position("drop_privileges"));
    }

    #[test]
    fn integrity_failure_aborts_everything() {
        let mut env = RecordingEnv::failing_at("integrity");
        assert!(Orchestrator::new(options()).run(&mut env).is_err());
        assert_eq!(env.events, vec!["integrity"]);
    }

    #[test]
    fn tls_failure_stops_before_housekeeping() {
        let mut env = RecordingEnv::failing_at("tls");
        assert!(Orchestrator::new(options()).run(&mut env).is_err());
        assert_eq!(env.events.last().unwrap(), "tls");
        assert!(!env.events.iter().any(|e| e == "clean_pids"));
    }

    #[test]
    fn housekeeping_failure_is_fatal_too() {
        // Strict policy: steps 4-7 abort on error like steps 1-3.
        let mut env = RecordingEnv::failing_at("clean_pids");
        assert!(Orchestrator::new(options()).run(&mut env).is_err());
        assert!(!env.events.iter().any(|e| e == "daemonize"));
    }

    #[test]
    fn foreground_skips_daemonize() {
        let mut env = RecordingEnv::new();
        let mut opts = options();
        opts.foreground = true;
        let state = Orchestrator::new(opts).run(&mut env).unwrap();

        assert!(!state.daemonized);
        assert!(!env.events.iter().any(|e| e == "daemonize"));
    }

    #[test]
    fn run_as_root_skips_privilege_drop() {
        let mut env = RecordingEnv::new();
        let mut opts = options();
        opts.run_as_root = true;
        let state = Orchestrator::new(opts).run(&mut env).unwrap();

        assert!(!state.privileges_dropped);
        assert!(!env.events.iter().any(|e| e == "drop_privileges"));
    }

    #[test]
    fn http_only_skips_tls_provisioning() {
        let mut env = RecordingEnv::new();
        let mut opts = options();
        opts.https_enabled = false;
        Orchestrator::new(opts).run(&mut env).unwrap();

        assert!(!env.events.iter().any(|e| e == "tls"));
    }
}
