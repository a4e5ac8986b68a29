//! # Wire Protocol
//!
//! Envelope types for the protocol-version-tagged RPC surface. The core is
//! transport-agnostic: the embedding layer decodes bytes into
//! `serde_json::Value` and hands envelopes to the dispatcher; these types
//! define the shape of what goes back out.
//!
//! Field names on the wire are camelCase (`protocolVersion`, `isError`);
//! absent optional fields are omitted entirely rather than serialized as
//! null.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::PROTOCOL_VERSION;
use crate::error::{RelayError, RelayResult};

/// A decoded request envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub protocol_version: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Correlation id, echoed verbatim in the response. Any JSON scalar.
    pub id: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Validate and decode a raw envelope. Every rejection names the field
    /// that failed so front-end authors can fix their envelopes without
    /// guesswork.
    pub fn parse(raw: &Value) -> RelayResult<Self> {
        let Some(object) = raw.as_object() else {
            return Err(RelayError::validation("request envelope must be a JSON object"));
        };

        let protocol_version = object
            .get("protocolVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::validation("missing or non-string protocolVersion"))?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(RelayError::validation(format!(
                "unsupported protocolVersion: {protocol_version} (expected {PROTOCOL_VERSION})"
            )));
        }

        let method = object
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::validation("missing or non-string method"))?;
        if method.is_empty() {
            return Err(RelayError::validation("method must be non-empty"));
        }

        let id = object
            .get("id")
            .cloned()
            .ok_or_else(|| RelayError::validation("missing id"))?;
        if id.is_null() {
            return Err(RelayError::validation("id must not be null"));
        }
        if !matches!(id, Value::String(_) | Value::Number(_)) {
            return Err(RelayError::validation("id must be a string or a number"));
        }

        Ok(Self {
            protocol_version: protocol_version.to_string(),
            method: method.to_string(),
            params: object.get("params").cloned(),
            id,
        })
    }

    /// The id as log-friendly text. String ids come back without JSON
    /// quoting; numbers render as digits.
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A response envelope. Exactly one of `result`/`error` is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub protocol_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }

    /// Build an error response from a crate error, mapping it onto its
    /// wire code. The display string is what crosses the boundary, so
    /// anything sensitive must be sanitized before it reaches here.
    pub fn from_error(id: Value, error: &RelayError) -> Self {
        Self::failure(id, error.error_code(), error.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Wire error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Params shape for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// One block of tool output. Only text content exists today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Result payload for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: Some(true),
        }
    }
}

/// Entry in the `tools/list` result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}
