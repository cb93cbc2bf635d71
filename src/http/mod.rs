//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → access control (blocklist check, expired-block release)
//!     → body limit (413 problem document when exceeded)
//!     → [routing/validation framework handles the request]
//!     → error boundary (rejection → problem document)
//!     → Send to client
//! ```

pub mod server;

pub use server::{rejection_response, ApiServer, AppState, X_REQUEST_ID};
