//! # Tool Handlers
//!
//! The handler seam between the dispatcher and domain logic. A
//! [`ToolHandler`] owns one named tool; [`LookupTool`] is the standard
//! implementation that reads from a [`DataSource`] through the cache
//! and the resilient executor.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::context::ResilienceContext;
use crate::error::{RelayError, RelayResult};
use crate::protocol::ToolResult;
use crate::resilience::{ExecuteOptions, OperationContext};
use crate::source::{DataSource, LookupKey, ResultFormatter};

/// Per-call context handed to every tool invocation.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    /// Fresh id for correlating everything this invocation logs.
    pub correlation_id: Uuid,
    /// The envelope id, as text.
    pub request_id: String,
    pub resilience: Arc<ResilienceContext>,
}

impl HandlerContext {
    pub fn new(request_id: impl Into<String>, resilience: Arc<ResilienceContext>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            request_id: request_id.into(),
            resilience,
        }
    }
}

/// One callable tool on the `tools/call` surface.
///
/// Argument-shape problems should surface as
/// [`RelayError::Validation`]; those become protocol errors. Everything
/// else a tool returns is reported inside the tool result with
/// `isError` set.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    async fn call(&self, arguments: Value, ctx: &HandlerContext) -> RelayResult<ToolResult>;
}

#[derive(Debug, Deserialize)]
struct LookupArgs {
    namespace: String,
    item: String,
    #[serde(default)]
    qualifier: Option<String>,
}

/// Standard lookup tool: cache-fronted, executor-protected reads from
/// one data source.
///
/// Missing items are a normal answer for a lookup surface, so the
/// default options treat them as a null result; the formatter decides
/// how "nothing" renders. Pass [`LookupTool::with_options`] to change
/// that or any other executor knob.
pub struct LookupTool {
    name: String,
    description: String,
    component: String,
    source: Arc<dyn DataSource>,
    formatter: Arc<dyn ResultFormatter>,
    options: ExecuteOptions,
}

impl LookupTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        source: Arc<dyn DataSource>,
        formatter: Arc<dyn ResultFormatter>,
    ) -> Self {
        let component = source.name().to_string();
        Self {
            name: name.into(),
            description: description.into(),
            component,
            source,
            formatter,
            options: ExecuteOptions::default().not_found_as_null(),
        }
    }

    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    fn parse_args(arguments: Value) -> RelayResult<LookupArgs> {
        let args: LookupArgs = serde_json::from_value(arguments)
            .map_err(|e| RelayError::validation(format!("invalid lookup arguments: {e}")))?;
        if args.namespace.trim().is_empty() || args.item.trim().is_empty() {
            return Err(RelayError::validation(
                "namespace and item must be non-empty",
            ));
        }
        Ok(args)
    }
}

#[async_trait]
impl ToolHandler for LookupTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, arguments: Value, ctx: &HandlerContext) -> RelayResult<ToolResult> {
        let args = Self::parse_args(arguments)?;

        let key = match &args.qualifier {
            Some(qualifier) => LookupKey::with_qualifier(&args.namespace, &args.item, qualifier),
            None => LookupKey::new(&args.namespace, &args.item),
        };
        let cache_key = key.cache_key();

        // breaker scope is the backend operation class, not the tool
        // registration name: every lookup against one source shares state
        let context = OperationContext::new(&self.component, "lookup", &ctx.request_id);
        let cache = Arc::clone(ctx.resilience.cache());

        let report = ctx
            .resilience
            .executor()
            .execute(
                || {
                    let source = Arc::clone(&self.source);
                    let cache = Arc::clone(&cache);
                    let key = key.clone();
                    let cache_key = cache_key.clone();
                    async move {
                        cache
                            .fetch_or_compute(&cache_key, || async move {
                                source.fetch(&key).await
                            })
                            .await
                    }
                },
                &context,
                &self.options,
            )
            .await?;

        Ok(ToolResult::text(self.formatter.format(&report.value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::source::SourceError;
    use serde_json::json;

    struct FixedSource {
        response: Result<Value, SourceError>,
    }

    #[async_trait]
    impl DataSource for FixedSource {
        fn name(&self) -> &str {
            "catalog"
        }

        async fn fetch(&self, _key: &LookupKey) -> Result<Value, SourceError> {
            self.response.clone()
        }
    }

    struct JsonFormatter;

    impl ResultFormatter for JsonFormatter {
        fn format(&self, value: &Value) -> String {
            if value.is_null() {
                String::new()
            } else {
                value.to_string()
            }
        }
    }

    fn handler_ctx() -> HandlerContext {
        HandlerContext::new(
            "req-1",
            Arc::new(ResilienceContext::from_config(&RelayConfig::for_test())),
        )
    }

    fn lookup_tool(response: Result<Value, SourceError>) -> LookupTool {
        LookupTool::new(
            "catalog_lookup",
            "Look up catalog entries",
            Arc::new(FixedSource { response }),
            Arc::new(JsonFormatter),
        )
    }

    #[tokio::test]
    async fn formats_the_fetched_value() {
        let tool = lookup_tool(Ok(json!({"id": 7})));
        let result = tool
            .call(json!({"namespace": "catalog", "item": "widget"}), &handler_ctx())
            .await
            .unwrap();
        assert_eq!(result.content[0].text, r#"{"id":7}"#);
        assert!(result.is_error.is_none());
    }

    #[tokio::test]
    async fn missing_items_render_as_empty_text() {
        let tool = lookup_tool(Err(SourceError::not_found("widget")));
        let result = tool
            .call(json!({"namespace": "catalog", "item": "widget"}), &handler_ctx())
            .await
            .unwrap();
        assert_eq!(result.content[0].text, "");
        assert!(result.is_error.is_none());
    }

    #[tokio::test]
    async fn malformed_arguments_are_validation_errors() {
        let tool = lookup_tool(Ok(json!(1)));
        let err = tool.call(json!({"item": "widget"}), &handler_ctx()).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation { .. }));

        let err = tool
            .call(json!({"namespace": " ", "item": "widget"}), &handler_ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Validation { .. }));
    }

    #[tokio::test]
    async fn terminal_source_failures_become_operation_errors() {
        let tool = lookup_tool(Err(SourceError::invalid_request("bad item id")));
        let err = tool
            .call(json!({"namespace": "catalog", "item": "widget"}), &handler_ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Operation { .. }));
    }

    #[tokio::test]
    async fn qualifier_distinguishes_cache_entries() {
        let ctx = handler_ctx();
        let tool = lookup_tool(Ok(json!("value")));

        tool.call(
            json!({"namespace": "catalog", "item": "widget", "qualifier": "eu"}),
            &ctx,
        )
        .await
        .unwrap();
        tool.call(json!({"namespace": "catalog", "item": "widget"}), &ctx)
            .await
            .unwrap();

        let stats = ctx.resilience.cache().stats();
        assert_eq!(stats.ttl_entries, 2);
    }
}
