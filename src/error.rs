//! # Structured Error Handling
//!
//! Error types for the relay core. Every failure that can cross the
//! dispatcher boundary maps onto one of the wire error codes in
//! [`crate::constants::error_codes`]; terminal operation failures carry a
//! sanitized message, a classification code, and a request id for
//! correlation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::constants::error_codes;
use crate::resilience::classifier::ErrorKind;

/// Result alias used throughout the crate.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors produced by the dispatcher, executor, and handler surface.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed envelope or arguments. Never retried.
    #[error("envelope validation failed: {message}")]
    Validation { message: String },

    /// Unknown method or tool name.
    #[error("method not found: {method}")]
    MethodNotFound { method: String },

    /// Admission limit reached. The display string is the wire contract.
    #[error("{}", crate::constants::ADMISSION_REJECTED_MESSAGE)]
    Busy { active: usize, max: usize },

    /// The circuit breaker for an operation class is open.
    #[error("circuit open for {key}, rejecting call")]
    CircuitOpen { key: String },

    /// Lifecycle misuse, such as starting a running dispatcher.
    #[error("lifecycle error: {message}")]
    Lifecycle { message: String },

    /// Terminal operation failure after the full resilience pipeline.
    /// `message` has already been sanitized.
    #[error("[{code}] {message} (request {request_id})")]
    Operation {
        code: ErrorKind,
        message: String,
        timestamp: DateTime<Utc>,
        request_id: String,
    },

    /// Invalid configuration detected at construction or validation.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Anything unexpected that escapes a handler.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelayError::Validation {
            message: message.into(),
        }
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        RelayError::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn busy(active: usize, max: usize) -> Self {
        RelayError::Busy { active, max }
    }

    pub fn circuit_open(key: impl Into<String>) -> Self {
        RelayError::CircuitOpen { key: key.into() }
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        RelayError::Lifecycle {
            message: message.into(),
        }
    }

    /// Stamp a terminal operation failure with the current time. The
    /// message must already be sanitized by the caller.
    pub fn operation(
        code: ErrorKind,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        RelayError::Operation {
            code,
            message: message.into(),
            timestamp: Utc::now(),
            request_id: request_id.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        RelayError::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RelayError::Internal {
            message: message.into(),
        }
    }

    /// Wire error code for the response envelope.
    pub fn error_code(&self) -> i64 {
        match self {
            RelayError::Validation { .. } => error_codes::INVALID_ENVELOPE,
            RelayError::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            RelayError::Busy { .. } => error_codes::ADMISSION_REJECTED,
            RelayError::CircuitOpen { .. }
            | RelayError::Lifecycle { .. }
            | RelayError::Operation { .. }
            | RelayError::Configuration { .. }
            | RelayError::Internal { .. } => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether the caller may reasonably submit the same request again.
    /// Admission rejection is the only explicitly retriable condition at
    /// the envelope level.
    pub fn is_retriable(&self) -> bool {
        matches!(self, RelayError::Busy { .. })
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            RelayError::internal(format!("payload I/O failure: {err}"))
        } else {
            // syntax, eof, and data-shape errors are all envelope problems
            RelayError::validation(format!("malformed payload: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_creation_helpers() {
        let err = RelayError::validation("missing method");
        assert!(matches!(err, RelayError::Validation { .. }));
        assert_eq!(err.error_code(), error_codes::INVALID_ENVELOPE);

        let err = RelayError::method_not_found("tools/unknown");
        assert_eq!(err.error_code(), error_codes::METHOD_NOT_FOUND);
        assert!(err.to_string().contains("tools/unknown"));

        let err = RelayError::busy(10, 10);
        assert_eq!(err.error_code(), error_codes::ADMISSION_REJECTED);
        assert!(err.is_retriable());
    }

    #[test]
    fn busy_display_matches_wire_contract() {
        let err = RelayError::busy(3, 3);
        assert_eq!(
            err.to_string(),
            crate::constants::ADMISSION_REJECTED_MESSAGE
        );
    }

    #[test]
    fn operation_errors_carry_classification_and_request_id() {
        let err = RelayError::operation(ErrorKind::Timeout, "backend call timed out", "req-42");
        assert_eq!(err.error_code(), error_codes::INTERNAL_ERROR);
        let display = err.to_string();
        assert!(display.contains("timeout"));
        assert!(display.contains("req-42"));
        if let RelayError::Operation { timestamp, .. } = err {
            assert!(timestamp <= Utc::now());
        } else {
            panic!("expected operation error");
        }
    }

    #[test]
    fn serde_errors_become_validation_errors() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: RelayError = parse_err.into();
        assert!(matches!(err, RelayError::Validation { .. }));
        assert_eq!(err.error_code(), error_codes::INVALID_ENVELOPE);
    }

    #[test]
    fn only_busy_is_retriable() {
        assert!(!RelayError::validation("x").is_retriable());
        assert!(!RelayError::internal("x").is_retriable());
        assert!(!RelayError::circuit_open("backend.fetch").is_retriable());
    }
}
