//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Route output to stdout in foreground mode, to the log file otherwise
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - Plain format by default; JSON when configured, for log shippers
//! - ANSI colors only on stdout

use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialize the global tracing subscriber.
///
/// Foreground mode writes to stdout; daemon mode appends to the configured
/// log file. Must be called once, before any bootstrap step logs.
pub fn init_logging(logs: &LogConfig, foreground: bool) -> io::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("vigil_api={},tower_http=warn", logs.level).into());

    let json = logs.format.eq_ignore_ascii_case("json");

    if foreground {
        let layer = tracing_subscriber::fmt::layer();
        let result = if json {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .try_init()
        } else {
            tracing_subscriber::registry().with(filter).with(layer).try_init()
        };
        if let Err(error) = result {
            // A subscriber installed earlier in the process wins.
            eprintln!("logging already initialized: {error}");
        }
        return Ok(());
    }

    if let Some(parent) = logs.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&logs.path)?;
    let writer = Arc::new(file);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);
    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(layer).try_init()
    };
    if let Err(error) = result {
        eprintln!("logging already initialized: {error}");
    }
    Ok(())
}
