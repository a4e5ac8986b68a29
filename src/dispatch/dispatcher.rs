//! # Request Dispatcher
//!
//! The front door of the relay core. Owns the lifecycle (start/stop and
//! the cache sweeper), admission control over concurrent requests, tool
//! registration, and routing of decoded envelopes to the built-in
//! methods and registered tools.
//!
//! Request handling order is fixed: lifecycle check, envelope
//! validation, admission, then routing. A malformed envelope is
//! rejected before admission so bad traffic cannot occupy slots.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::cache::CacheSweeper;
use crate::config::RelayConfig;
use crate::constants::methods;
use crate::context::{ResilienceContext, ResilienceHealth};
use crate::error::{RelayError, RelayResult};
use crate::logging;
use crate::protocol::{RpcRequest, RpcResponse, ToolCallParams, ToolDescriptor, ToolResult};

use super::handlers::{HandlerContext, ToolHandler};

/// Point-in-time dispatcher statistics, also the `system/health` body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatcherStats {
    pub running: bool,
    pub active_requests: usize,
    pub max_concurrent_requests: usize,
    pub total_requests: u64,
    pub resilience: ResilienceHealth,
}

/// Releases one admission slot when the request finishes, however it
/// finishes.
struct AdmissionGuard<'a> {
    active: &'a AtomicUsize,
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The request dispatcher.
pub struct Dispatcher {
    config: RelayConfig,
    resilience: Arc<ResilienceContext>,
    /// Registration order is `tools/list` order.
    tools: RwLock<Vec<Arc<dyn ToolHandler>>>,
    running: AtomicBool,
    active_requests: AtomicUsize,
    max_concurrent_requests: AtomicUsize,
    total_requests: AtomicU64,
    sweeper: Mutex<Option<CacheSweeper>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.is_running())
            .field("active_requests", &self.active_requests())
            .field("max_concurrent_requests", &self.max_concurrent_requests())
            .field("tools", &self.tools.read().len())
            .finish()
    }
}

impl Dispatcher {
    /// Builds a dispatcher from validated configuration.
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        config.validate().map_err(RelayError::configuration)?;
        let resilience = Arc::new(ResilienceContext::from_config(&config));
        let max_concurrent = config.dispatcher.max_concurrent_requests;

        Ok(Self {
            config,
            resilience,
            tools: RwLock::new(Vec::new()),
            running: AtomicBool::new(false),
            active_requests: AtomicUsize::new(0),
            max_concurrent_requests: AtomicUsize::new(max_concurrent),
            total_requests: AtomicU64::new(0),
            sweeper: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn resilience(&self) -> &Arc<ResilienceContext> {
        &self.resilience
    }

    /// Registers a tool. Re-registering a name replaces the previous
    /// handler in place, keeping its position in `tools/list`.
    pub fn register_tool(&self, tool: Arc<dyn ToolHandler>) {
        let mut tools = self.tools.write();
        if let Some(existing) = tools.iter_mut().find(|t| t.name() == tool.name()) {
            warn!(tool = tool.name(), "Replacing previously registered tool");
            *existing = tool;
            return;
        }
        info!(tool = tool.name(), "🔧 Registered tool");
        tools.push(tool);
    }

    pub fn find_tool(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.read().iter().find(|t| t.name() == name).map(Arc::clone)
    }

    pub fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .read()
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
            })
            .collect()
    }

    /// Starts the dispatcher and its cache sweeper. Starting twice is a
    /// lifecycle error.
    pub async fn start(&self) -> RelayResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(RelayError::lifecycle("dispatcher is already running"));
        }

        let sweeper = CacheSweeper::spawn(
            Arc::clone(self.resilience.cache()),
            self.config.cache.sweep_interval(),
        );
        *self.sweeper.lock() = Some(sweeper);

        self.config.log_configuration();
        info!(
            max_concurrent_requests = self.max_concurrent_requests.load(Ordering::Acquire),
            "✅ Relay dispatcher started"
        );
        Ok(())
    }

    /// Stops the dispatcher. Idempotent; in-flight requests finish on
    /// their own, new ones are rejected.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }
        info!("Relay dispatcher stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Acquire)
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests.load(Ordering::Acquire)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Adjusts the admission limit at runtime. Non-positive values are
    /// ignored; in-flight requests above a lowered limit drain naturally.
    pub fn set_max_concurrent_requests(&self, value: i64) {
        if value <= 0 {
            warn!(value, "Ignoring non-positive admission limit");
            return;
        }
        self.max_concurrent_requests.store(value as usize, Ordering::Release);
        info!(value, "Admission limit updated");
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            running: self.is_running(),
            active_requests: self.active_requests(),
            max_concurrent_requests: self.max_concurrent_requests(),
            total_requests: self.total_requests(),
            resilience: self.resilience.health(),
        }
    }

    /// Handles one decoded envelope and always produces a response, the
    /// failure cases included.
    #[instrument(
        skip(self, raw),
        fields(method = tracing::field::Empty, request_id = tracing::field::Empty)
    )]
    pub async fn handle(&self, raw: Value) -> RpcResponse {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        // best-effort id for errors raised before envelope validation
        let fallback_id = raw.get("id").cloned().unwrap_or(Value::Null);

        if !self.is_running() {
            let error = RelayError::lifecycle("dispatcher is not running");
            logging::log_request_handled(
                "unknown",
                "-",
                "rejected",
                started.elapsed().as_millis() as u64,
                Some(error.error_code()),
            );
            return RpcResponse::from_error(fallback_id, &error);
        }

        let request = match RpcRequest::parse(&raw) {
            Ok(request) => request,
            Err(error) => {
                logging::log_request_handled(
                    "unknown",
                    "-",
                    "invalid",
                    started.elapsed().as_millis() as u64,
                    Some(error.error_code()),
                );
                return RpcResponse::from_error(fallback_id, &error);
            }
        };

        let request_id = request.id_text();
        let span = tracing::Span::current();
        span.record("method", request.method.as_str());
        span.record("request_id", request_id.as_str());

        let guard = match self.try_admit() {
            Ok(guard) => guard,
            Err(error) => {
                warn!(
                    method = %request.method,
                    active = self.active_requests(),
                    max = self.max_concurrent_requests(),
                    "Admission rejected"
                );
                logging::log_request_handled(
                    &request.method,
                    &request_id,
                    "rejected",
                    started.elapsed().as_millis() as u64,
                    Some(error.error_code()),
                );
                return RpcResponse::from_error(request.id, &error);
            }
        };

        let result = self.route(&request).await;
        drop(guard);

        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(value) => {
                logging::log_request_handled(&request.method, &request_id, "ok", duration_ms, None);
                RpcResponse::success(request.id, value)
            }
            Err(error) => {
                logging::log_request_handled(
                    &request.method,
                    &request_id,
                    "error",
                    duration_ms,
                    Some(error.error_code()),
                );
                RpcResponse::from_error(request.id, &error)
            }
        }
    }

    fn try_admit(&self) -> Result<AdmissionGuard<'_>, RelayError> {
        let max = self.max_concurrent_requests.load(Ordering::Acquire);
        let mut active = self.active_requests.load(Ordering::Acquire);
        loop {
            if active >= max {
                return Err(RelayError::busy(active, max));
            }
            match self.active_requests.compare_exchange_weak(
                active,
                active + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(AdmissionGuard {
                        active: &self.active_requests,
                    })
                }
                Err(current) => active = current,
            }
        }
    }

    async fn route(&self, request: &RpcRequest) -> RelayResult<Value> {
        match request.method.as_str() {
            methods::TOOLS_CALL => self.handle_tools_call(request).await,
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::SYSTEM_HEALTH => self.handle_system_health(),
            unknown => Err(RelayError::method_not_found(unknown)),
        }
    }

    async fn handle_tools_call(&self, request: &RpcRequest) -> RelayResult<Value> {
        let params = request
            .params
            .clone()
            .ok_or_else(|| RelayError::validation("tools/call requires params"))?;
        let call: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| RelayError::validation(format!("invalid tools/call params: {e}")))?;

        let arguments = match call.arguments {
            Some(value) if value.is_object() => value,
            Some(_) => return Err(RelayError::validation("tool arguments must be an object")),
            None => Value::Object(serde_json::Map::new()),
        };

        let tool = self
            .find_tool(&call.name)
            .ok_or_else(|| RelayError::method_not_found(&call.name))?;

        let handler_ctx = HandlerContext::new(request.id_text(), Arc::clone(&self.resilience));
        match tool.call(arguments, &handler_ctx).await {
            Ok(result) => encode_tool_result(result),
            // argument-shape problems are the caller's fault and go back
            // as protocol errors
            Err(error @ RelayError::Validation { .. }) => Err(error),
            Err(error) => {
                warn!(tool = %call.name, error = %error, "Tool call failed");
                encode_tool_result(ToolResult::error(error.to_string()))
            }
        }
    }

    fn handle_tools_list(&self) -> RelayResult<Value> {
        Ok(serde_json::json!({ "tools": self.tool_descriptors() }))
    }

    fn handle_system_health(&self) -> RelayResult<Value> {
        serde_json::to_value(self.stats())
            .map_err(|e| RelayError::internal(format!("failed to encode health: {e}")))
    }
}

fn encode_tool_result(result: ToolResult) -> RelayResult<Value> {
    serde_json::to_value(result)
        .map_err(|e| RelayError::internal(format!("failed to encode tool result: {e}")))
}
