//! Blocklist enforcement middleware.
//!
//! Consumes the brute-force guard state before any expensive work: blocked
//! IPs are rejected with a problem document, after first releasing entries
//! whose block window has elapsed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::problem::{Problem, PROBLEM_CONTENT_TYPE};
use crate::security::bruteforce::BruteForceGuard;

/// State required for blocklist enforcement.
#[derive(Clone)]
pub struct AccessControlState {
    pub guard: Arc<BruteForceGuard>,
    /// Seconds a blocked IP stays blocked (config `access.block_time`).
    pub block_time_secs: u64,
}

/// Middleware function rejecting requests from blocked client IPs.
pub async fn access_control_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AccessControlState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client_ip = addr.ip().to_string();

    state
        .guard
        .release_expired(&client_ip, state.block_time_secs);

    if state.guard.is_blocked(&client_ip) {
        tracing::warn!(client = %client_ip, "Request rejected, IP is on the blocklist");
        let problem = Problem::new(403, "Permission Denied").with_detail_text(format!(
            "IP blocked due to exceeded number of login attempts: {client_ip}"
        ));
        return problem_response(&problem);
    }

    next.run(request).await
}

/// Build an HTTP response from a problem record.
///
/// The status travels on the status line; the body is the normalized
/// problem document.
pub fn problem_response(problem: &Problem) -> Response {
    let mut response = Response::new(Body::from(problem.to_bytes()));
    *response.status_mut() =
        StatusCode::from_u16(problem.status).unwrap_or(StatusCode::BAD_REQUEST);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
    );
    response
}
