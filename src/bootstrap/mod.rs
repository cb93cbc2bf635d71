//! Process bootstrap: integrity check, worker pools, TLS provisioning,
//! PID housekeeping, daemonization, and the privilege drop.
//!
//! # Responsibilities
//! - Drive the ordered startup sequence through [`Orchestrator`]
//! - Provide the production [`BootstrapEnv`] implementation backed by the
//!   real OS primitives
//!
//! # Design Decisions
//! - Everything here runs single-threaded, before the async runtime starts;
//!   `fork()` is only safe under that condition
//! - The orchestrator never touches the OS directly, so its sequencing logic
//!   is testable without root or forking

pub mod daemon;
pub mod orchestrator;
pub mod pidfile;
pub mod privileges;
pub mod workers;

use std::fs;
use std::path::PathBuf;

pub use orchestrator::{BootstrapEnv, BootstrapError, BootstrapOptions, BootstrapState, Orchestrator};
pub use workers::{WorkerHandle, WorkerRole};

use crate::config::ApiConfig;
use crate::net::tls;

/// Production bootstrap environment backed by the operating system.
pub struct SystemBootstrapEnv {
    config: ApiConfig,
    config_file: Option<PathBuf>,
}

impl SystemBootstrapEnv {
    pub fn new(config: ApiConfig, config_file: Option<PathBuf>) -> Self {
        Self {
            config,
            config_file,
        }
    }
}

impl BootstrapEnv for SystemBootstrapEnv {
    /// Verify the persisted authorization/role store is present and readable.
    /// An empty configured path disables the check.
    fn check_store_integrity(&mut self) -> Result<(), BootstrapError> {
        let store = &self.config.process.rbac_store_path;
        if store.as_os_str().is_empty() {
            tracing::debug!("No authorization store configured, skipping integrity check");
            return Ok(());
        }

        let metadata = fs::metadata(store).map_err(|error| {
            BootstrapError::IntegrityCheck(format!(
                "cannot access {}: {error}",
                store.display()
            ))
        })?;
        if metadata.len() == 0 {
            return Err(BootstrapError::IntegrityCheck(format!(
                "{} exists but is empty",
                store.display()
            )));
        }

        tracing::info!(store = %store.display(), "Authorization store integrity verified");
        Ok(())
    }

    fn spawn_worker(&mut self, role: WorkerRole) -> Result<WorkerHandle, BootstrapError> {
        workers::spawn_worker(role, self.config_file.as_deref())
            .map_err(|source| BootstrapError::WorkerSpawn { role, source })
    }

    /// Materialize key/cert, validate the protocol name, and hand ownership
    /// of both files to the service account so they stay readable after the
    /// privilege drop.
    fn provision_tls(&mut self) -> Result<(), BootstrapError> {
        let https = &self.config.https;
        tls::select_protocol(&https.ssl_protocol)?;
        tls::ensure_server_material(https)?;

        if self.config.process.drop_privileges {
            let process = &self.config.process;
            let account =
                privileges::resolve_service_account(&process.service_user, &process.service_group)
                    .map_err(|error| BootstrapError::PrivilegeDrop(error.to_string()))?;
            tls::assign_service_ownership(&https.key_path, account.uid, account.gid)?;
            tls::assign_service_ownership(&https.cert_path, account.uid, account.gid)?;
        }
        Ok(())
    }

    fn clean_stale_pid_files(&mut self) -> Result<(), BootstrapError> {
        pidfile::clean_stale_pid_files(&self.config.process.pid_dir, crate::MAIN_PROCESS)
            .map_err(BootstrapError::PidFile)
    }

    fn daemonize(&mut self) -> Result<(), BootstrapError> {
        daemon::daemonize().map_err(|errno| BootstrapError::Daemonize(errno.to_string()))
    }

    fn drop_privileges(&mut self) -> Result<(), BootstrapError> {
        let process = &self.config.process;
        let account =
            privileges::resolve_service_account(&process.service_user, &process.service_group)
                .map_err(|error| BootstrapError::PrivilegeDrop(error.to_string()))?;
        privileges::drop_privileges(account)
            .map_err(|error| BootstrapError::PrivilegeDrop(error.to_string()))
    }

    fn write_pid_file(&mut self) -> Result<(), BootstrapError> {
        pidfile::create_pid(
            &self.config.process.pid_dir,
            crate::MAIN_PROCESS,
            std::process::id(),
        )
        .map_err(BootstrapError::PidFile)?;
        Ok(())
    }
}
