//! Daemon entry point.
//!
//! Parsing, fast paths, and the bootstrap sequence are synchronous on
//! purpose: daemonization forks, and forking after the tokio runtime has
//! started threads is unsound. The runtime is built only once the process
//! has reached its final identity.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use vigil_api::bootstrap::{
    self, workers, BootstrapOptions, Orchestrator, SystemBootstrapEnv, WorkerRole,
};
use vigil_api::config::{load_config, ApiConfig};
use vigil_api::http::ApiServer;
use vigil_api::observability::init_logging;
use vigil_api::security::bruteforce::BruteForceGuard;

#[derive(Parser)]
#[command(name = "vigil-apid")]
#[command(version = vigil_api::VERSION)]
#[command(about = "Vigil API daemon", long_about = None)]
struct Args {
    /// Run in the foreground, logging to the console.
    #[arg(short, long)]
    foreground: bool,

    /// Validate the configuration file and exit.
    #[arg(short, long)]
    test_config: bool,

    /// Keep running as root instead of dropping to the service account.
    #[arg(short, long)]
    root: bool,

    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-d: debug, -dd: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Internal: run as a pool worker for the given role.
    #[arg(long, hide = true, value_name = "ROLE")]
    worker_role: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_or_default(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            return ExitCode::FAILURE;
        }
    };

    if args.test_config {
        println!("Configuration OK");
        return ExitCode::SUCCESS;
    }

    let mut logs = config.logs.clone();
    match args.debug {
        0 => {}
        1 => logs.level = "debug".to_string(),
        _ => logs.level = "trace".to_string(),
    }

    // Workers inherit the parent's console when it runs in the foreground.
    let worker = args
        .worker_role
        .as_deref()
        .and_then(WorkerRole::from_flag);
    if let Some(role) = worker {
        if init_logging(&logs, args.foreground).is_err() || run_worker(role, &config).is_err() {
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }
    if args.worker_role.is_some() {
        eprintln!("Unknown worker role");
        return ExitCode::FAILURE;
    }

    if let Err(error) = init_logging(&logs, args.foreground) {
        eprintln!("Failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = vigil_api::VERSION, "vigil-apid starting");

    let options = BootstrapOptions {
        https_enabled: config.https.enabled,
        foreground: args.foreground,
        run_as_root: args.root,
        drop_privileges: config.process.drop_privileges,
    };
    let mut env = SystemBootstrapEnv::new(config.clone(), args.config.clone());

    let mut state = match Orchestrator::new(options).run(&mut env) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!(error = %error, "Startup aborted");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(pid = state.pid, "Bootstrap complete");

    let exit = match serve(config.clone()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Server error");
            ExitCode::FAILURE
        }
    };

    workers::terminate_workers(&mut state.workers, &config.process.pid_dir);
    bootstrap::pidfile::kill_registered_children(&config.process.pid_dir, vigil_api::MAIN_PROCESS);
    if let Err(error) =
        bootstrap::pidfile::delete_pid(&config.process.pid_dir, vigil_api::MAIN_PROCESS, state.pid)
    {
        tracing::warn!(error = %error, "Failed to remove main PID file");
    }
    tracing::info!("Shutdown complete");
    exit
}

/// Load the configuration file, falling back to defaults when none is given.
fn load_or_default(path: Option<&std::path::Path>) -> Result<ApiConfig, String> {
    match path {
        Some(path) => load_config(path).map_err(|error| error.to_string()),
        None => Ok(ApiConfig::default()),
    }
}

/// Build the runtime and serve until shutdown. Runs after daemonization and
/// the privilege drop.
fn serve(config: ApiConfig) -> Result<(), std::io::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let guard = std::sync::Arc::new(BruteForceGuard::new(config.access.max_login_attempts));
        let server = ApiServer::new(config, guard, axum::Router::new());
        server.run().await
    })
}

/// Pool worker entry: register the PID and idle until terminated.
fn run_worker(role: WorkerRole, config: &ApiConfig) -> std::io::Result<()> {
    bootstrap::workers::run_worker(role, &config.process.pid_dir)
}
