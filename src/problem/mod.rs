//! Problem document construction and serialization.
//!
//! # Data Flow
//! ```text
//! Rejection raised while handling a request
//!     → classifier.rs (map rejection kind → Problem record)
//!     → Problem::to_bytes (normalize, render RFC-7807-style JSON)
//!     → HTTP response (status carried on the status line, never in the body)
//! ```
//!
//! # Design Decisions
//! - The HTTP status lives on the response, not inside the body
//! - Empty detail is omitted entirely, never serialized as ""
//! - Top-level `code` is renamed to `error` (stable public contract name)
//! - Serialization never fails; malformed payloads degrade to string coercion

pub mod classifier;

use serde_json::{Map, Value};

pub use classifier::{classify, Rejection, RequestInfo};

/// Content type of every error response body.
pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json; charset=utf-8";

/// Detail payload of a problem document.
#[derive(Debug, Clone, PartialEq)]
pub enum ProblemDetail {
    /// Free-form explanation, normalized to a single line on serialization.
    Text(String),
    /// Structured explanation. Nested `status`/`type` keys are stripped on
    /// serialization since they duplicate the outer fields.
    Structured(Map<String, Value>),
}

/// Normalized error representation produced by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Human-readable category, e.g. "Unauthorized".
    pub title: String,

    /// Stable classifier token. Only emitted when set.
    pub problem_type: Option<String>,

    /// Free-form or structured explanation.
    pub detail: Option<ProblemDetail>,

    /// Additional members merged at the top level of the body.
    pub extensions: Map<String, Value>,

    /// HTTP status code, carried out-of-band as the response status.
    pub status: u16,
}

impl Problem {
    /// Create a problem with a title and status and no other members.
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            problem_type: None,
            detail: None,
            extensions: Map::new(),
            status,
        }
    }

    /// Attach a free-form text detail.
    #[must_use]
    pub fn with_detail_text(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(ProblemDetail::Text(detail.into()));
        self
    }

    /// Attach an already-structured detail object.
    #[must_use]
    pub fn with_detail(mut self, detail: ProblemDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Set the `type` member.
    #[must_use]
    pub fn with_type(mut self, problem_type: impl Into<String>) -> Self {
        self.problem_type = Some(problem_type.into());
        self
    }

    /// Merge extension members into the top level of the body.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Render the normalized body as a JSON value.
    ///
    /// Applies every body invariant: empty detail dropped, nested
    /// `status`/`type` stripped from structured detail, extensions merged,
    /// `code` renamed to `error`, and no top-level `status` leakage.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("title".to_string(), Value::String(self.title.clone()));

        if let Some(problem_type) = &self.problem_type {
            body.insert("type".to_string(), Value::String(problem_type.clone()));
        }

        match &self.detail {
            Some(ProblemDetail::Text(text)) => {
                let normalized = cleanup_detail_field(text);
                if !normalized.is_empty() {
                    body.insert("detail".to_string(), Value::String(normalized));
                }
            }
            Some(ProblemDetail::Structured(object)) => {
                body.insert("detail".to_string(), Value::Object(object.clone()));
            }
            None => {}
        }

        for (key, value) in &self.extensions {
            body.insert(key.clone(), value.clone());
        }

        // The strip runs after the merge: an extension may have supplied or
        // replaced the detail object, and nested status/type duplicate the
        // outer fields no matter where the object came from.
        if let Some(Value::Object(object)) = body.get_mut("detail") {
            object.remove("status");
            object.remove("type");
        }

        // An extension may have re-introduced an empty detail.
        let detail_is_empty = match body.get("detail") {
            Some(Value::String(text)) => text.is_empty(),
            Some(Value::Object(object)) => object.is_empty(),
            Some(Value::Null) => true,
            _ => false,
        };
        if detail_is_empty {
            body.remove("detail");
        }

        // The status line carries the status; the body never duplicates it.
        body.remove("status");
        if let Some(code) = body.remove("code") {
            body.insert("error".to_string(), code);
        }

        Value::Object(body)
    }

    /// Render the body to bytes for the wire.
    ///
    /// This is the last line of defense before an unhandled-exception
    /// response; it degrades to a minimal document rather than failing.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_json())
            .unwrap_or_else(|_| br#"{"title":"Bad Request"}"#.to_vec())
    }
}

/// Normalize a free-form detail string to a single readable line.
///
/// Double newlines become `". "`, remaining newlines act as separators, and
/// whitespace runs collapse to single spaces.
pub fn cleanup_detail_field(detail: &str) -> String {
    detail
        .replace("\n\n", ". ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
