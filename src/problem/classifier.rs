//! Rejection classification.
//!
//! Maps every request-time rejection to a [`Problem`] record and an HTTP
//! status via one exhaustive match over a closed taxonomy. The only side
//! effect is the brute-force guard update on the auth-endpoint branch; the
//! classifier itself performs no I/O, never blocks, and never fails.

use axum::http::Method;
use serde_json::{Map, Value};

use crate::problem::{Problem, ProblemDetail};
use crate::security::bruteforce::BruteForceGuard;

/// The two literal authentication endpoints protected by the brute-force
/// guard. Exact-match only, never prefix-match.
pub const AUTH_ENDPOINTS: [&str; 2] = [
    "/security/user/authenticate",
    "/security/user/authenticate/run_as",
];

/// Metadata about the request that raised the rejection.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// HTTP method of the request.
    pub method: Method,

    /// Request path, as matched by the router.
    pub path: String,

    /// Client IP, keyed into the brute-force guard.
    pub client_ip: String,

    /// Whether an identity/authentication context was attached upstream.
    pub has_token_info: bool,
}

impl RequestInfo {
    /// Whether this request targets a protected authentication endpoint.
    pub fn is_auth_endpoint(&self) -> bool {
        AUTH_ENDPOINTS.contains(&self.path.as_str())
            && (self.method == Method::GET || self.method == Method::POST)
    }
}

/// Closed taxonomy of request-time rejections.
///
/// Produced by the routing/validation framework and business logic; this
/// layer only consumes them.
#[derive(Debug, Clone)]
pub enum Rejection {
    /// Credentials rejected. May trigger abuse tracking.
    Unauthorized {
        /// Status supplied by the originating failure, normally 401.
        status: u16,
    },

    /// Malformed request; detail is the violated constraint.
    BadRequest {
        status: u16,
        detail: Option<String>,
    },

    /// Framework-level HTTP error not otherwise classified.
    Http {
        status: u16,
        /// Reason phrase, e.g. "Not Found".
        reason: String,
    },

    /// Malformed or expired bearer token.
    TokenDecode,

    /// Business-logic error carrying a rich payload.
    DomainProblem {
        status: u16,
        title: Option<String>,
        problem_type: Option<String>,
        detail: Option<Value>,
        /// Extension members merged at the top level of the body.
        extensions: Map<String, Value>,
    },

    /// Request body exceeded the configured limit.
    PayloadTooLarge {
        message: String,
    },
}

impl Rejection {
    /// Plain 401 without an explicit status override.
    pub fn unauthorized() -> Self {
        Self::Unauthorized { status: 401 }
    }
}

/// Translate a rejection into a normalized [`Problem`].
///
/// Pure function of (rejection, request metadata, current tracker state)
/// apart from the attempt-tracker update on the auth-endpoint branch.
pub fn classify(rejection: Rejection, request: &RequestInfo, guard: &BruteForceGuard) -> Problem {
    match rejection {
        Rejection::Unauthorized { status } => {
            let problem = Problem::new(status, "Unauthorized");
            if request.is_auth_endpoint() {
                guard.record_failed_attempt(&request.client_ip);
                problem.with_detail_text("Invalid credentials")
            } else if !request.has_token_info {
                problem.with_detail_text("No authorization token provided")
            } else {
                problem
            }
        }

        Rejection::BadRequest { status, detail } => {
            let problem = Problem::new(status, "Bad Request");
            match detail {
                Some(detail) if !detail.is_empty() => problem.with_detail_text(detail),
                _ => problem,
            }
        }

        Rejection::Http { status, reason } => Problem::new(status, reason.clone())
            .with_detail_text(format!("{status}: {reason}")),

        Rejection::TokenDecode => {
            Problem::new(401, "Unauthorized").with_detail_text("No authorization token provided")
        }

        Rejection::DomainProblem {
            status,
            title,
            problem_type,
            detail,
            extensions,
        } => {
            let mut problem = Problem::new(status, title.unwrap_or_else(|| "Bad Request".into()))
                .with_type(problem_type.unwrap_or_else(|| "about:blank".into()))
                .with_extensions(extensions);
            if let Some(detail) = detail.and_then(coerce_detail) {
                problem = problem.with_detail(detail);
            }
            problem
        }

        Rejection::PayloadTooLarge { message } => {
            Problem::new(413, "Content size exceeded.").with_detail_text(message)
        }
    }
}

/// Best-effort coercion of an arbitrary detail payload.
///
/// Objects pass through structured; strings pass through as text; anything
/// else is stringified rather than rejected, since this is the last line of
/// defense before an unhandled-exception response.
fn coerce_detail(value: Value) -> Option<ProblemDetail> {
    match value {
        Value::Null => None,
        Value::Object(object) => Some(ProblemDetail::Structured(object)),
        Value::String(text) => Some(ProblemDetail::Text(text)),
        other => Some(ProblemDetail::Text(other.to_string())),
    }
}
