//! Envelope and configuration builders shared across integration tests.

#![allow(dead_code)] // Not every test binary uses every helper

use serde_json::{json, Value};

use relay_core::config::RelayConfig;

/// Well-formed request envelope with the current protocol version.
pub fn envelope(method: &str, params: Option<Value>, id: Value) -> Value {
    let mut body = json!({
        "protocolVersion": "1.0",
        "method": method,
        "id": id,
    });
    if let Some(params) = params {
        body["params"] = params;
    }
    body
}

/// `tools/call` envelope for the standard lookup argument shape.
pub fn lookup_call(tool: &str, namespace: &str, item: &str, id: Value) -> Value {
    envelope(
        "tools/call",
        Some(json!({
            "name": tool,
            "arguments": {"namespace": namespace, "item": item},
        })),
        id,
    )
}

/// Test configuration with small thresholds and short delays.
pub fn test_config() -> RelayConfig {
    RelayConfig::for_test()
}
