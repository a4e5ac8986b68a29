#![allow(clippy::doc_markdown)] // Allow technical terms like JSON, TTL in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Relay Core
//!
//! Resilient request-execution core for tool-calling front ends.
//!
//! ## Overview
//!
//! Relay Core sits between a thin transport layer and unreliable data
//! sources. The transport decodes bytes into JSON and hands envelopes to
//! the [`dispatch::Dispatcher`]; the core validates them, admits them
//! under a concurrency limit, routes them to registered tools, and runs
//! every backend read through caching, retries, circuit breakers,
//! recovery strategies, and fallbacks before a response goes back out.
//!
//! ## Architecture
//!
//! The dispatcher owns the request lifecycle; the resilience layer owns
//! failure handling. Domain code plugs in at two seams: a
//! [`source::DataSource`] that fetches values and a
//! [`dispatch::ToolHandler`] when a tool needs more than a plain lookup.
//!
//! ## Key Features
//!
//! - **Bounded Admission**: A hard cap on concurrent requests with a
//!   stable rejection message front ends can retry on
//! - **Circuit Breakers**: Per-operation isolation with a single-probe
//!   half-open recovery path
//! - **Tiered Caching**: Operator-pinned overrides over TTL-bounded
//!   entries, swept in the background
//! - **Error Classification**: Retry only what is worth retrying;
//!   sanitize what crosses the boundary
//! - **Health Surface**: One `system/health` call reports dispatcher,
//!   breaker, outcome, and cache state
//!
//! ## Module Organization
//!
//! - [`dispatch`] - Request lifecycle, admission, routing, and tools
//! - [`resilience`] - Circuit breakers, classification, retries, recovery
//! - [`cache`] - Two-tier read cache and its sweeper
//! - [`source`] - Data source and formatter seams
//! - [`protocol`] - Wire envelope types
//! - [`context`] - Shared protection infrastructure bundle
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use relay_core::config::RelayConfig;
//! use relay_core::dispatch::Dispatcher;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = Dispatcher::new(RelayConfig::from_environment())?;
//! dispatcher.start().await?;
//!
//! let response = dispatcher
//!     .handle(json!({
//!         "protocolVersion": "1.0",
//!         "method": "system/health",
//!         "id": "probe-1"
//!     }))
//!     .await;
//! println!("healthy: {}", response.is_success());
//!
//! dispatcher.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod resilience;
pub mod source;

pub use cache::{CacheStats, TieredCache};
pub use config::RelayConfig;
pub use context::{ResilienceContext, ResilienceHealth};
pub use dispatch::{Dispatcher, DispatcherStats, HandlerContext, LookupTool, ToolHandler};
pub use error::{RelayError, RelayResult};
pub use protocol::{RpcRequest, RpcResponse, ToolResult};
pub use resilience::{
    CircuitBreaker, CircuitBreakerRegistry, CircuitState, ClassifiedError, ErrorKind,
    ExecuteOptions, ExecutionReport, OperationContext, Outcome, RecoveryStrategy,
    ResilientExecutor,
};
pub use source::{DataSource, LookupKey, ResultFormatter, SourceError};
