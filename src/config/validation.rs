//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, attempt thresholds)
//! - Enforce the TLS protocol allow-list
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::ApiConfig;
use crate::net::tls::TlsProtocol;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Listener port is zero.
    #[error("server.port must be nonzero")]
    InvalidPort,

    /// TLS protocol name is not in the allow-list.
    #[error("https.ssl_protocol '{0}' is not one of: tls, tlsv1, tlsv1.1, tlsv1.2, auto")]
    UnknownTlsProtocol(String),

    /// CA verification requested without a CA bundle path.
    #[error("https.use_ca is set but https.ca_path is empty")]
    MissingCaPath,

    /// Attempt threshold would block on the first failure or never.
    #[error("access.max_login_attempts must be at least 1")]
    InvalidLoginAttempts,

    /// Log format is not a supported value.
    #[error("logs.format '{0}' is not one of: plain, json")]
    UnknownLogFormat(String),

    /// Log level is not a supported value.
    #[error("logs.level '{0}' is not one of: trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    /// Privilege drop requested without a service user.
    #[error("process.drop_privileges is set but process.service_user is empty")]
    MissingServiceUser,
}

/// Validate the loaded configuration, collecting every failure.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    if config.https.enabled && TlsProtocol::from_name(&config.https.ssl_protocol).is_none() {
        errors.push(ValidationError::UnknownTlsProtocol(
            config.https.ssl_protocol.clone(),
        ));
    }

    if config.https.enabled && config.https.use_ca && config.https.ca_path.as_os_str().is_empty() {
        errors.push(ValidationError::MissingCaPath);
    }

    if config.access.max_login_attempts == 0 {
        errors.push(ValidationError::InvalidLoginAttempts);
    }

    if !matches!(config.logs.format.as_str(), "plain" | "json") {
        errors.push(ValidationError::UnknownLogFormat(config.logs.format.clone()));
    }

    if !matches!(
        config.logs.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::UnknownLogLevel(config.logs.level.clone()));
    }

    if config.process.drop_privileges && config.process.service_user.is_empty() {
        errors.push(ValidationError::MissingServiceUser);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
