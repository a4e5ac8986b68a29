//! End-to-end request flows: envelope in, protected lookup, formatted
//! result or structured error out.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use relay_core::constants::error_codes;
use relay_core::dispatch::{Dispatcher, LookupTool};
use relay_core::resilience::CircuitState;
use relay_core::source::{DataSource, SourceError};

use common::{envelope, lookup_call, PlainFormatter, ScriptedSource};

async fn dispatcher_with(source: Arc<ScriptedSource>) -> Dispatcher {
    let dispatcher = Dispatcher::new(common::test_config()).unwrap();
    dispatcher.register_tool(Arc::new(LookupTool::new(
        "catalog_lookup",
        "Look up catalog entries",
        source as Arc<dyn DataSource>,
        Arc::new(PlainFormatter),
    )));
    dispatcher.start().await.unwrap();
    dispatcher
}

#[tokio::test]
async fn successful_lookup_produces_a_text_result() {
    let source = Arc::new(ScriptedSource::fixed("catalog", Ok(json!({"sku": "W-1"}))));
    let dispatcher = dispatcher_with(source).await;

    let response = dispatcher
        .handle(lookup_call("catalog_lookup", "catalog", "widget", json!("req-1")))
        .await;

    assert!(response.is_success());
    assert_eq!(response.id, json!("req-1"));
    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["protocolVersion"], "1.0");
    assert_eq!(encoded["result"]["content"][0]["type"], "text");
    assert_eq!(encoded["result"]["content"][0]["text"], r#"{"sku":"W-1"}"#);
    assert!(encoded["result"].get("isError").is_none());
    dispatcher.stop().await;
}

#[tokio::test]
async fn missing_items_are_normal_empty_results() {
    let source = Arc::new(ScriptedSource::fixed(
        "catalog",
        Err(SourceError::not_found("widget")),
    ));
    let dispatcher = dispatcher_with(Arc::clone(&source)).await;

    for id in 0..2 {
        let response = dispatcher
            .handle(lookup_call("catalog_lookup", "catalog", "widget", json!(id)))
            .await;
        let result = response.result.expect("absence is not an error");
        assert_eq!(result["content"][0]["text"], "");
        assert!(result.get("isError").is_none());
    }

    // absent values are not cached, and they never trip the breaker
    assert_eq!(source.calls(), 2);
    let health = dispatcher.resilience().health();
    assert!(health
        .circuit_breakers
        .iter()
        .all(|b| b.state == CircuitState::Closed));
    assert_eq!(health.outcomes.success, 2);
    dispatcher.stop().await;
}

#[tokio::test]
async fn backend_failures_surface_as_sanitized_error_results() {
    let source = Arc::new(ScriptedSource::fixed(
        "catalog",
        Err(SourceError::connection_failed(
            "refused at /var/run/backend.sock password=hunter2",
        )),
    ));
    let dispatcher = dispatcher_with(Arc::clone(&source)).await;

    let response = dispatcher
        .handle(lookup_call("catalog_lookup", "catalog", "widget", json!(7)))
        .await;

    // handler failures ride inside a successful envelope
    assert!(response.is_success());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(!text.contains("hunter2"));
    assert!(!text.contains("/var/run/backend.sock"));
    assert!(text.contains("connection_failed"));

    // connection failures burn the whole retry budget
    assert_eq!(source.calls(), 3);
    dispatcher.stop().await;
}

#[tokio::test]
async fn bad_tool_arguments_are_protocol_errors() {
    let source = Arc::new(ScriptedSource::fixed("catalog", Ok(json!(1))));
    let dispatcher = dispatcher_with(Arc::clone(&source)).await;

    let response = dispatcher
        .handle(envelope(
            "tools/call",
            Some(json!({"name": "catalog_lookup", "arguments": {"item": "widget"}})),
            json!(3),
        ))
        .await;
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_ENVELOPE);

    let response = dispatcher
        .handle(envelope(
            "tools/call",
            Some(json!({"name": "catalog_lookup", "arguments": "not an object"})),
            json!(4),
        ))
        .await;
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_ENVELOPE);

    assert_eq!(source.calls(), 0);
    dispatcher.stop().await;
}

#[tokio::test]
async fn unknown_tool_and_unknown_method_both_report_not_found() {
    let source = Arc::new(ScriptedSource::fixed("catalog", Ok(json!(1))));
    let dispatcher = dispatcher_with(source).await;

    let response = dispatcher
        .handle(envelope(
            "tools/call",
            Some(json!({"name": "ghost_tool", "arguments": {}})),
            json!(5),
        ))
        .await;
    let error = response.error.unwrap();
    assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
    assert!(error.message.contains("ghost_tool"));

    let response = dispatcher
        .handle(envelope("tools/erase", None, json!(6)))
        .await;
    assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    dispatcher.stop().await;
}

#[tokio::test]
async fn tools_list_and_health_describe_the_service() {
    let source = Arc::new(ScriptedSource::fixed("catalog", Ok(json!("v"))));
    let dispatcher = dispatcher_with(source).await;

    let response = dispatcher
        .handle(envelope("tools/list", None, json!("list-1")))
        .await;
    let tools = response.result.unwrap();
    assert_eq!(tools["tools"][0]["name"], "catalog_lookup");
    assert_eq!(tools["tools"][0]["description"], "Look up catalog entries");

    dispatcher
        .handle(lookup_call("catalog_lookup", "catalog", "widget", json!("warm")))
        .await;

    let response = dispatcher
        .handle(envelope("system/health", None, json!("health-1")))
        .await;
    let health = response.result.unwrap();
    assert_eq!(health["running"], true);
    assert_eq!(health["max_concurrent_requests"], 4);
    assert_eq!(health["total_requests"], 3);
    assert_eq!(health["resilience"]["outcomes"]["success"], 1);
    assert_eq!(health["resilience"]["cache"]["ttl_entries"], 1);
    assert_eq!(
        health["resilience"]["circuit_breakers"][0]["key"],
        "catalog.lookup"
    );
    assert_eq!(
        health["resilience"]["circuit_breakers"][0]["state"],
        "closed"
    );
    dispatcher.stop().await;
}

#[tokio::test]
async fn number_and_string_ids_are_echoed_verbatim() {
    let source = Arc::new(ScriptedSource::fixed("catalog", Ok(json!("v"))));
    let dispatcher = dispatcher_with(source).await;

    let response = dispatcher.handle(envelope("tools/list", None, json!(42))).await;
    assert_eq!(response.id, json!(42));

    let response = dispatcher
        .handle(envelope("tools/list", None, json!("alpha-7")))
        .await;
    assert_eq!(response.id, json!("alpha-7"));
    dispatcher.stop().await;
}

#[tokio::test]
async fn tool_name_lookup_is_case_sensitive() {
    let source = Arc::new(ScriptedSource::fixed("catalog", Ok(json!("v"))));
    let dispatcher = dispatcher_with(source).await;

    let response = dispatcher
        .handle(envelope(
            "tools/call",
            Some(json!({"name": "Catalog_Lookup", "arguments": {"namespace": "c", "item": "i"}})),
            json!(1),
        ))
        .await;
    assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    dispatcher.stop().await;
}
