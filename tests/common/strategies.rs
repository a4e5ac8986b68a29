//! Proptest strategies for protocol and resilience inputs.

#![allow(dead_code)] // Only the property test binary uses these

use proptest::prelude::*;
use serde_json::json;

/// Lowercase identifier usable as a lookup key part.
pub fn key_part_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,9}"
}

/// Free text that can surround an error marker.
pub fn message_affix_strategy() -> impl Strategy<Value = String> {
    "[a-z ]{0,20}"
}

/// Digit-only secret material, easy to assert absence of.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    "[0-9]{6,12}"
}

/// Absolute unix-style path with one to four segments.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,8}", 1..4)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Envelope-shaped and envelope-adjacent JSON documents, valid and
/// broken alike.
pub fn envelope_like_strategy() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(json!({"protocolVersion": "1.0", "method": "tools/list", "id": 1})),
        Just(json!({"protocolVersion": "1.0", "method": "tools/call", "params": {"name": "x"}, "id": "r"})),
        Just(json!({"protocolVersion": "2.0", "method": "tools/list", "id": 1})),
        Just(json!({"method": "tools/list", "id": 1})),
        Just(json!({"protocolVersion": "1.0", "id": 1})),
        Just(json!({"protocolVersion": "1.0", "method": "", "id": 1})),
        Just(json!({"protocolVersion": "1.0", "method": "tools/list"})),
        Just(json!({"protocolVersion": "1.0", "method": "tools/list", "id": null})),
        Just(json!({"protocolVersion": "1.0", "method": "tools/list", "id": {"nested": true}})),
        Just(json!({"protocolVersion": 1, "method": "tools/list", "id": 1})),
        Just(json!([1, 2, 3])),
        Just(json!("just a string")),
        Just(json!(null)),
        Just(json!(42)),
    ]
}
