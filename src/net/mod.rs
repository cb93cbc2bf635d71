//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap (HTTPS enabled):
//!     tls.rs (ensure key/cert, validate protocol, assign ownership)
//!     → rustls server config
//!     → handed to the HTTP serving layer
//! ```
//!
//! # Design Decisions
//! - Missing material is generated, never a fatal error
//! - Deprecated protocol selections warn but still serve
//! - Ownership assignment is idempotent

pub mod tls;

pub use tls::{ensure_server_material, load_rustls_config, select_protocol, TlsError, TlsProtocol};
