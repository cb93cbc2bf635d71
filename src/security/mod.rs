//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Failed login at an auth endpoint:
//!     → problem/classifier.rs (Unauthorized, auth-endpoint branch)
//!     → bruteforce.rs (increment per-IP attempts, block at threshold)
//!
//! Every incoming request:
//!     → access_control.rs (release expired blocks, reject blocked IPs)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Guard state is injected, never a module-level singleton
//! - Per-key linearizable increments; a race here weakens a security control
//! - Block release is explicit and window-based, never implicit decay

pub mod access_control;
pub mod bruteforce;

pub use access_control::{access_control_middleware, problem_response, AccessControlState};
pub use bruteforce::{AttemptRecord, BruteForceGuard};
