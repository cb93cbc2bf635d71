//! Bootstrap sequence behavior through the public orchestration API, plus
//! the production integrity check against real files.

use std::cell::RefCell;
use std::rc::Rc;

use vigil_api::bootstrap::{
    BootstrapEnv, BootstrapError, BootstrapOptions, Orchestrator, SystemBootstrapEnv,
    WorkerHandle, WorkerRole,
};
use vigil_api::config::ApiConfig;

/// Minimal recording double shared with the assertion site via `Rc`.
struct ScriptedEnv {
    events: Rc<RefCell<Vec<String>>>,
    fail_on: Option<&'static str>,
}

impl ScriptedEnv {
    fn step(&mut self, name: &str) -> Result<(), BootstrapError> {
        self.events.borrow_mut().push(name.to_string());
        if self.fail_on == Some(name) {
            return Err(BootstrapError::Daemonize(format!("forced {name}")));
        }
        Ok(())
    }
}

impl BootstrapEnv for ScriptedEnv {
    fn check_store_integrity(&mut self) -> Result<(), BootstrapError> {
        self.step("integrity")
    }

    fn spawn_worker(&mut self, role: WorkerRole) -> Result<WorkerHandle, BootstrapError> {
        self.step("spawn")?;
        Ok(WorkerHandle::detached(role, 1))
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
}

fn all_steps() -> BootstrapOptions {
    BootstrapOptions {
        https_enabled: true,
        foreground: false,
        run_as_root: false,
        drop_privileges: true,
    }
}

#[test]
fn privilege_drop_runs_after_every_privileged_step() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut env = ScriptedEnv {
        events: Rc::clone(&events),
        fail_on: None,
    };

    Orchestrator::new(all_steps()).run(&mut env).unwrap();

    let events = events.borrow();
    let position = |name: &str| events.iter().position(|e| e == name).unwrap();
    assert!(position("drop_privileges") > position("tls"));
    assert!(position("drop_privileges") > position("spawn"));
    assert!(position("drop_privileges") > position("daemonize"));
    assert_eq!(events.last().unwrap(), "write_pid");
}

#[test]
fn a_failed_step_stops_the_sequence() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let mut env = ScriptedEnv {
        events: Rc::clone(&events),
        fail_on: Some("daemonize"),
    };

    let result = Orchestrator::new(all_steps()).run(&mut env);
    assert!(matches!(result, Err(BootstrapError::Daemonize(_))));

    let events = events.borrow();
    assert_eq!(events.last().unwrap(), "daemonize");
    assert!(!events.iter().any(|e| e == "drop_privileges"));
    assert!(!events.iter().any(|e| e == "write_pid"));
}

#[test]
fn integrity_check_skipped_when_no_store_is_configured() {
    let config = ApiConfig::default();
    assert!(config.process.rbac_store_path.as_os_str().is_empty());

    let mut env = SystemBootstrapEnv::new(config, None);
    assert!(env.check_store_integrity().is_ok());
}

#[test]
fn missing_store_fails_the_integrity_check() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ApiConfig::default();
    config.process.rbac_store_path = dir.path().join("rbac.db");

    let mut env = SystemBootstrapEnv::new(config, None);
    assert!(matches!(
        env.check_store_integrity(),
        Err(BootstrapError::IntegrityCheck(_))
    ));
}

#[test]
fn empty_store_fails_the_integrity_check() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("rbac.db");
    std::fs::write(&store, b"").unwrap();

    let mut config = ApiConfig::default();
    config.process.rbac_store_path = store;

    let mut env = SystemBootstrapEnv::new(config, None);
    assert!(matches!(
        env.check_store_integrity(),
        Err(BootstrapError::IntegrityCheck(_))
    ));
}

#[test]
fn populated_store_passes_the_integrity_check() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("rbac.db");
    std::fs::write(&store, b"role data").unwrap();

    let mut config = ApiConfig::default();
    config.process.rbac_store_path = store;

    let mut env = SystemBootstrapEnv::new(config, None);
    assert!(env.check_store_integrity().is_ok());
}
