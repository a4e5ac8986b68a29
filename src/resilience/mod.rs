//! # Resilience Module
//!
//! Fault tolerance for backend operations: circuit breakers to isolate
//! failing components, error classification to decide what is worth
//! retrying, outcome accounting for the health surface, and the
//! executor that ties retries, recovery strategies, and fallbacks
//! together.
//!
//! ## Architecture
//!
//! - **Circuit Breakers**: Per-operation failure isolation with a
//!   single-probe half-open recovery path
//! - **Classification**: Maps raw backend errors onto a small retryable
//!   / terminal taxonomy
//! - **Outcome Accounting**: Success / recovered / partial / failed
//!   counters, globally and per operation key
//! - **Executor**: Timeouts, linear-backoff retries, recovery
//!   strategies, and fallback values in one pipeline
//!
//! ## Usage
//!
//! ```rust
//! use relay_core::config::RelayConfig;
//! use relay_core::resilience::{
//!     CircuitBreakerConfig, CircuitBreakerRegistry, ErrorStats, ExecuteOptions,
//!     OperationContext, Outcome, ResilientExecutor,
//! };
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let config = RelayConfig::default();
//! let executor = ResilientExecutor::new(
//!     config.executor.clone(),
//!     Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default())),
//!     Arc::new(ErrorStats::new()),
//! );
//!
//! let context = OperationContext::new("catalog", "lookup", "req-1");
//! let report = executor
//!     .execute(
//!         || async { Ok(serde_json::json!({"status": "ok"})) },
//!         &context,
//!         &ExecuteOptions::default(),
//!     )
//!     .await
//!     .unwrap();
//! assert_eq!(report.outcome, Outcome::Success);
//! # });
//! ```

pub mod circuit_breaker;
pub mod classifier;
pub mod executor;
pub mod registry;
pub mod sanitize;
pub mod stats;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState,
};
pub use classifier::{classify, classify_message, ClassifiedError, ErrorKind};
pub use executor::{
    linear_backoff, ExecuteOptions, ExecutionReport, Fallback, FallbackFuture, OperationContext,
    RecoveryStrategy, ResilientExecutor,
};
pub use registry::CircuitBreakerRegistry;
pub use sanitize::sanitize_message;
pub use stats::{ErrorStats, ErrorStatsSnapshot, Outcome};
