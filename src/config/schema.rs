//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API
//! daemon. All types derive Serde traits for deserialization from config
//! files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the API daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind host/port, body limit).
    pub server: ServerConfig,

    /// HTTPS / TLS configuration.
    pub https: HttpsConfig,

    /// Access control settings (login attempt limits).
    pub access: AccessConfig,

    /// Process management settings (PID files, service account).
    pub process: ProcessConfig,

    /// Logging settings.
    pub logs: LogConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Maximum request body size the API accepts, in bytes.
    pub max_upload_size: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 55000,
            max_upload_size: 10 * 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// HTTPS / TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpsConfig {
    /// Enable HTTPS. When disabled the server listens in plain HTTP.
    pub enabled: bool,

    /// Path to private key file (PEM). Generated if absent.
    pub key_path: PathBuf,

    /// Path to certificate file (PEM). Generated if absent.
    pub cert_path: PathBuf,

    /// TLS protocol name: one of "tls", "tlsv1", "tlsv1.1", "tlsv1.2", "auto".
    pub ssl_protocol: String,

    /// Optional OpenSSL-style cipher list. Empty means library defaults.
    pub ssl_ciphers: String,

    /// Require client certificates signed by the configured CA.
    pub use_ca: bool,

    /// Path to the CA bundle, used only when `use_ca` is set.
    pub ca_path: PathBuf,
}

impl Default for HttpsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_path: PathBuf::from("/etc/vigil/server.key"),
            cert_path: PathBuf::from("/etc/vigil/server.crt"),
            ssl_protocol: "auto".to_string(),
            ssl_ciphers: String::new(),
            use_ca: false,
            ca_path: PathBuf::new(),
        }
    }
}

/// Access control settings consumed by the brute-force guard.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Failed login attempts from one IP before it is blocked.
    pub max_login_attempts: u32,

    /// Seconds a blocked IP stays blocked before it may be released.
    pub block_time: u64,

    /// Maximum requests per minute, consumed by the rate-limit collaborator.
    pub max_request_per_minute: u32,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            block_time: 300,
            max_request_per_minute: 300,
        }
    }
}

/// Process management settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Directory where PID files are written.
    pub pid_dir: PathBuf,

    /// Service account the process switches to after privileged setup.
    pub service_user: String,

    /// Service group for file ownership and the privilege drop.
    pub service_group: String,

    /// Switch UID/GID to the service account before serving.
    pub drop_privileges: bool,

    /// Path of the persisted authorization/role store checked at startup.
    /// Empty disables the integrity check.
    pub rbac_store_path: PathBuf,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            pid_dir: PathBuf::from("/var/run/vigil"),
            service_user: "vigil".to_string(),
            service_group: "vigil".to_string(),
            drop_privileges: true,
            rbac_store_path: PathBuf::new(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log file path, used when not running in foreground.
    pub path: PathBuf,

    /// Log format: "plain" or "json".
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: PathBuf::from("/var/log/vigil/api.log"),
            format: "plain".to_string(),
        }
    }
}
