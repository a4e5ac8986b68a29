//! # Error Classification
//!
//! Maps source failures onto the five operational error kinds that drive
//! retry and recovery decisions. Typed [`SourceError`] variants map
//! directly; only opaque free-text errors go through the keyword
//! heuristic, whose table is pinned as part of the public contract.

use serde::{Deserialize, Serialize};

use crate::source::SourceError;

/// Operational error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    ConnectionFailed,
    NotFound,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Internal => "internal",
        }
    }

    /// Kinds the executor's retry loop is allowed to retry. Internal gets
    /// a single generic retry handled separately; NotFound and
    /// InvalidRequest are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::ConnectionFailed)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure with its classification attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_retryable(),
        }
    }
}

/// Classify a source failure. Typed variants carry their own kind;
/// [`SourceError::Other`] falls back to [`classify_message`].
pub fn classify(error: &SourceError) -> ClassifiedError {
    match error {
        SourceError::Timeout { .. } => ClassifiedError::new(ErrorKind::Timeout, error.to_string()),
        SourceError::ConnectionFailed { .. } => {
            ClassifiedError::new(ErrorKind::ConnectionFailed, error.to_string())
        }
        SourceError::NotFound { .. } => {
            ClassifiedError::new(ErrorKind::NotFound, error.to_string())
        }
        SourceError::InvalidRequest { .. } => {
            ClassifiedError::new(ErrorKind::InvalidRequest, error.to_string())
        }
        SourceError::Internal { .. } => {
            ClassifiedError::new(ErrorKind::Internal, error.to_string())
        }
        SourceError::Other { message } => {
            ClassifiedError::new(classify_message(message), message.clone())
        }
    }
}

/// Keyword heuristic for opaque error text, matched case-insensitively.
/// First hit wins, in this order:
///
/// 1. `timeout`, `timed out`, `etimedout` → [`ErrorKind::Timeout`]
/// 2. `econnrefused`, `connection refused`, `connection reset`,
///    `econnreset`, `network`, `unreachable`, plus the generic transient
///    markers `transient` and `temporary` → [`ErrorKind::ConnectionFailed`]
/// 3. `not found`, `enoent`, `no such`, `404` → [`ErrorKind::NotFound`]
/// 4. `invalid`, `malformed`, `bad request`, `validation` →
///    [`ErrorKind::InvalidRequest`]
/// 5. everything else → [`ErrorKind::Internal`]
///
/// This table is load-bearing for callers that depend on retry behavior;
/// changing it is a breaking change.
pub fn classify_message(message: &str) -> ErrorKind {
    let normalized = message.to_lowercase();
    if contains_any(&normalized, &["timeout", "timed out", "etimedout"]) {
        ErrorKind::Timeout
    } else if contains_any(
        &normalized,
        &[
            "econnrefused",
            "connection refused",
            "connection reset",
            "econnreset",
            "network",
            "unreachable",
            "transient",
            "temporary",
        ],
    ) {
        ErrorKind::ConnectionFailed
    } else if contains_any(&normalized, &["not found", "enoent", "no such", "404"]) {
        ErrorKind::NotFound
    } else if contains_any(
        &normalized,
        &["invalid", "malformed", "bad request", "validation"],
    ) {
        ErrorKind::InvalidRequest
    } else {
        ErrorKind::Internal
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
