//! # Injected Collaborators
//!
//! The relay core owns resilience, admission, and caching; it deliberately
//! owns no business behavior. Two collaborators are injected by the
//! embedding layer: a [`DataSource`] that resolves lookups (and may fail),
//! and a [`ResultFormatter`] that renders fetched values into text for the
//! response payload. The core never interprets a fetched value beyond
//! passing it between the two.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::constants::KEY_QUALIFIER_SENTINEL;

/// Errors a data source may raise. Sources are encouraged to return the
/// typed variants so classification never has to fall back to message
/// heuristics; [`SourceError::Other`] exists for sources that only have a
/// string to offer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("not found: {key}")]
    NotFound { key: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("internal source error: {reason}")]
    Internal { reason: String },

    /// Unclassified free-text error; routed through the keyword heuristic.
    #[error("{message}")]
    Other { message: String },
}

impl SourceError {
    pub fn timeout(operation: impl Into<String>) -> Self {
        SourceError::Timeout {
            operation: operation.into(),
        }
    }

    pub fn connection_failed(reason: impl Into<String>) -> Self {
        SourceError::ConnectionFailed {
            reason: reason.into(),
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        SourceError::NotFound { key: key.into() }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        SourceError::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        SourceError::Internal {
            reason: reason.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        SourceError::Other {
            message: message.into(),
        }
    }
}

/// Identifies one logical lookup. The cache key derivation is
/// deterministic and collision-free across distinct lookups: all three
/// fields participate, with a sentinel standing in for an absent
/// qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupKey {
    pub namespace: String,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl LookupKey {
    pub fn new(namespace: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            item: item.into(),
            qualifier: None,
        }
    }

    pub fn with_qualifier(
        namespace: impl Into<String>,
        item: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            item: item.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// Cache key rendering: `namespace:item:qualifier`, with
    /// [`KEY_QUALIFIER_SENTINEL`] when no qualifier was given.
    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.namespace,
            self.item,
            self.qualifier.as_deref().unwrap_or(KEY_QUALIFIER_SENTINEL)
        )
    }
}

impl std::fmt::Display for LookupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cache_key())
    }
}

/// The injected data-fetch collaborator.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Stable name, used as the component half of circuit-breaker keys.
    fn name(&self) -> &str;

    /// Resolve one lookup. Implementations should prefer the typed
    /// [`SourceError`] variants over [`SourceError::Other`].
    async fn fetch(&self, key: &LookupKey) -> Result<Value, SourceError>;
}

/// The injected presentation collaborator. Implementations must render
/// `Value::Null` as their empty representation; the core uses it to
/// surface "absent, and that is fine" results.
pub trait ResultFormatter: Send + Sync {
    fn format(&self, value: &Value) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_uses_sentinel_for_absent_qualifier() {
        let key = LookupKey::new("docs", "intro");
        assert_eq!(key.cache_key(), "docs:intro:-");
    }

    #[test]
    fn cache_key_includes_qualifier_when_present() {
        let key = LookupKey::with_qualifier("docs", "intro", "v2");
        assert_eq!(key.cache_key(), "docs:intro:v2");
    }

    #[test]
    fn qualified_and_unqualified_keys_never_collide() {
        let plain = LookupKey::new("docs", "intro");
        let qualified = LookupKey::with_qualifier("docs", "intro", "v2");
        assert_ne!(plain.cache_key(), qualified.cache_key());
    }

    #[test]
    fn display_matches_cache_key() {
        let key = LookupKey::with_qualifier("auth", "token", "primary");
        assert_eq!(key.to_string(), key.cache_key());
    }

    #[test]
    fn source_error_helpers_and_display() {
        let err = SourceError::timeout("backend.fetch");
        assert!(matches!(err, SourceError::Timeout { .. }));
        assert!(err.to_string().contains("backend.fetch"));

        let err = SourceError::not_found("docs:intro:-");
        assert_eq!(err.to_string(), "not found: docs:intro:-");

        let err = SourceError::other("something odd happened");
        assert_eq!(err.to_string(), "something odd happened");
    }
}
