//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and wire the middleware stack
//! - Enforce the request body limit before handlers run
//! - Convert every rejection into a problem document response
//! - Serve plain HTTP or TLS and shut down gracefully on signals
//!
//! # Design Decisions
//! - The routing/validation framework mounts its own routes; this layer only
//!   provides the error boundary, the blocklist middleware, and the listener
//! - The problem body format is owned by the problem module; nothing here
//!   serializes errors by hand

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::problem::classifier::{classify, Rejection, RequestInfo};
use crate::problem::PROBLEM_CONTENT_TYPE;
use crate::security::access_control::{
    access_control_middleware, problem_response, AccessControlState,
};
use crate::security::bruteforce::BruteForceGuard;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the error boundary and handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<BruteForceGuard>,
    pub max_upload_size: usize,
}

/// HTTP server for the API daemon.
pub struct ApiServer {
    router: Router,
    config: ApiConfig,
}

impl ApiServer {
    /// Create a new server. `routes` carries the externally built API
    /// surface; the default routes and the middleware stack are added here.
    pub fn new(config: ApiConfig, guard: Arc<BruteForceGuard>, routes: Router<AppState>) -> Self {
        let state = AppState {
            guard: guard.clone(),
            max_upload_size: config.server.max_upload_size,
        };
        let access = AccessControlState {
            guard,
            block_time_secs: config.access.block_time,
        };

        let router = Router::new()
            .route("/", get(basic_info))
            .merge(routes)
            .fallback(not_found)
            .with_state(state.clone())
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(request_id_middleware))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.server.request_timeout_secs,
                    )))
                    .layer(middleware::from_fn_with_state(
                        access,
                        access_control_middleware,
                    ))
                    .layer(middleware::from_fn_with_state(state, body_limit_middleware)),
            )
            // Bounds streamed bodies without a declared length; the
            // middleware above normalizes the resulting 413.
            .layer(DefaultBodyLimit::max(config.server.max_upload_size));

        Self { router, config }
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|error| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{error}"))
            })?;

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        if self.config.https.enabled {
            let tls = crate::net::tls::load_rustls_config(&self.config.https)
                .await
                .map_err(|error| std::io::Error::other(error.to_string()))?;
            tracing::info!(address = %addr, "HTTPS server starting");

            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app)
                .await?;
        } else {
            tracing::info!(address = %addr, "HTTP server starting");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Translate a rejection into the problem response for this request.
///
/// The single error boundary: handlers and middleware call this instead of
/// building error responses themselves.
pub fn rejection_response(
    rejection: Rejection,
    request: &RequestInfo,
    guard: &BruteForceGuard,
) -> Response {
    let problem = classify(rejection, request, guard);
    problem_response(&problem)
}

/// Build the request metadata the classifier needs.
fn request_info(request: &Request<Body>, addr: SocketAddr) -> RequestInfo {
    RequestInfo {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
        client_ip: addr.ip().to_string(),
        has_token_info: request.headers().contains_key(header::AUTHORIZATION),
    }
}

/// Reject oversized bodies, declared or streamed.
///
/// Declared lengths are checked up front. Length-less uploads are bounded
/// by the body-limit layer while handlers read them; its bare 413 is
/// rewritten here into the problem document every other rejection gets.
async fn body_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let info = request_info(&request, addr);
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());

    if let Some(length) = declared {
        if length > state.max_upload_size {
            tracing::warn!(client = %info.client_ip, length, "Request body exceeds the configured limit");
            return rejection_response(
                Rejection::PayloadTooLarge {
                    message: format!(
                        "Maximum content size limit ({}) exceeded ({length} bytes read)",
                        state.max_upload_size
                    ),
                },
                &info,
                &state.guard,
            );
        }
    }

    let response = next.run(request).await;

    let already_problem = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|value| value == PROBLEM_CONTENT_TYPE);
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !already_problem {
        tracing::warn!(client = %info.client_ip, "Streamed request body exceeded the configured limit");
        return rejection_response(
            Rejection::PayloadTooLarge {
                message: format!(
                    "Maximum content size limit ({}) exceeded",
                    state.max_upload_size
                ),
            },
            &info,
            &state.guard,
        );
    }
    response
}

/// Attach a correlation ID to the request and echo it on the response.
async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Ok(value) = header::HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(X_REQUEST_ID, value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(X_REQUEST_ID, value);
        return response;
    }
    next.run(request).await
}

/// Default endpoint, mirrors the daemon identity.
async fn basic_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "title": "Vigil API",
        "api_version": crate::VERSION,
        "hostname": hostname(),
    }))
}

fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_default()
}

/// Fallback for unmatched paths; goes through the classifier like every
/// other rejection.
async fn not_found(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let info = request_info(&request, addr);
    rejection_response(
        Rejection::Http {
            status: 404,
            reason: "Not Found".to_string(),
        },
        &info,
        &state.guard,
    )
}

/// Wait for SIGTERM or Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Failed to install Ctrl+C handler");
        }
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    #[test]
    fn request_info_captures_identity_context() {
        let addr: SocketAddr = "10.0.0.1:4321".parse().unwrap();

        let bare = Request::builder()
            .method(Method::GET)
            .uri("/agents?limit=5")
            .body(Body::empty())
            .unwrap();
        let info = request_info(&bare, addr);
        assert_eq!(info.path, "/agents");
        assert_eq!(info.client_ip, "10.0.0.1");
        assert!(!info.has_token_info);

        let authed = Request::builder()
            .method(Method::GET)
            .uri("/agents")
            .header(header::AUTHORIZATION, "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert!(request_info(&authed, addr).has_token_info);
    }

    #[tokio::test]
    async fn oversized_bodies_yield_problem_documents() {
        use axum::body::Bytes;
        use axum::routing::post;
        use tower::ServiceExt;

        let mut config = ApiConfig::default();
        config.https.enabled = false;
        config.server.max_upload_size = 64;
        let guard = Arc::new(BruteForceGuard::new(5));
        let routes =
            Router::new().route("/echo", post(|body: Bytes| async move { body.len().to_string() }));
        let server = ApiServer::new(config, guard, routes);
        let addr: SocketAddr = "10.0.0.1:5555".parse().unwrap();

        // Declared length over the limit: rejected before the handler runs.
        let declared = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(header::CONTENT_LENGTH, "128")
            .extension(ConnectInfo(addr))
            .body(Body::from(vec![0u8; 128]))
            .unwrap();
        let response = server.router.clone().oneshot(declared).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PROBLEM_CONTENT_TYPE
        );

        // No declared length: the body-limit layer stops the read and the
        // bare 413 is rewritten into the same document shape.
        let streamed = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .extension(ConnectInfo(addr))
            .body(Body::from(vec![0u8; 128]))
            .unwrap();
        let response = server.router.clone().oneshot(streamed).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PROBLEM_CONTENT_TYPE
        );

        // Within the limit the handler answers normally.
        let small = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .extension(ConnectInfo(addr))
            .body(Body::from(vec![0u8; 16]))
            .unwrap();
        let response = server.router.clone().oneshot(small).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn oversized_rejection_names_the_limit() {
        let guard = BruteForceGuard::new(5);
        let info = RequestInfo {
            method: Method::POST,
            path: "/agents".to_string(),
            client_ip: "10.0.0.1".to_string(),
            has_token_info: true,
        };
        let response = rejection_response(
            Rejection::PayloadTooLarge {
                message: "Maximum content size limit (10) exceeded (20 bytes read)".to_string(),
            },
            &info,
            &guard,
        );
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            crate::problem::PROBLEM_CONTENT_TYPE
        );
    }
}
