//! Vigil API daemon
//!
//! The privileged HTTPS management daemon for the Vigil platform.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────┐
//!                         │                 API DAEMON                  │
//!                         │                                             │
//!     Client Request      │  ┌─────────┐    ┌─────────┐    ┌─────────┐ │
//!     ────────────────────┼─▶│   net   │───▶│  http   │───▶│ routing │ │
//!                         │  │  (TLS)  │    │ server  │    │framework│ │
//!                         │  └─────────┘    └────┬────┘    └────┬────┘ │
//!                         │                      │              │      │
//!                         │              ┌───────▼──────┐       │      │
//!                         │              │   security   │       │      │
//!                         │              │ guard + ACL  │       │      │
//!                         │              └───────┬──────┘       │      │
//!     Client Response     │              ┌───────▼──────┐       │      │
//!     ◀───────────────────┼──────────────│   problem    │◀──────┘      │
//!                         │              │ (RFC 7807)   │              │
//!                         │              └──────────────┘              │
//!                         │                                             │
//!                         │  ┌───────────────────────────────────────┐ │
//!                         │  │          Cross-Cutting Concerns        │ │
//!                         │  │ ┌────────┐ ┌──────────┐ ┌───────────┐ │ │
//!                         │  │ │ config │ │bootstrap │ │observa-   │ │ │
//!                         │  │ │        │ │sequence  │ │bility     │ │ │
//!                         │  │ └────────┘ └──────────┘ └───────────┘ │ │
//!                         │  └───────────────────────────────────────┘ │
//!                         └────────────────────────────────────────────┘
//! ```
//!
//! Every request-time failure is translated into an RFC 7807 problem
//! document by the problem module; repeated authentication failures feed
//! the brute-force guard, whose blocklist the access-control middleware
//! enforces. The bootstrap module drives the privileged startup sequence
//! (integrity check, worker pools, TLS provisioning, PID housekeeping,
//! daemonization, privilege drop) before the server starts accepting
//! connections.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod problem;

// Security
pub mod security;

// Cross-cutting concerns
pub mod bootstrap;
pub mod observability;

/// Name the main process registers its PID under.
pub const MAIN_PROCESS: &str = "vigil-apid";

/// Crate version, surfaced by the default endpoint and `-V`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
