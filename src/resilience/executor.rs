//! # Resilient Executor
//!
//! Runs backend operations through the full protection pipeline: circuit
//! breaker admission, per-attempt timeout, linear-backoff retries,
//! pluggable recovery strategies, and an optional fallback value. Every
//! execution ends in exactly one [`Outcome`], recorded against the
//! operation's breaker key.
//!
//! The breaker sees one verdict per logical execution, not per attempt:
//! a call that fails four times and then recovers counts as a single
//! success, and a call that exhausts everything counts as a single
//! failure. That keeps breaker thresholds meaningful under retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ExecutorSettings;
use crate::error::{RelayError, RelayResult};
use crate::source::SourceError;

use super::classifier::{classify, ClassifiedError, ErrorKind};
use super::registry::CircuitBreakerRegistry;
use super::sanitize::sanitize_message;
use super::stats::{ErrorStats, Outcome};

/// Identity of one protected execution, carried through logging, breaker
/// keying, and recovery strategies.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Backend or subsystem the operation targets, e.g. `catalog`.
    pub component: String,
    /// Operation name within the component, e.g. `lookup`.
    pub operation: String,
    /// Fresh per-execution id for log correlation.
    pub correlation_id: Uuid,
    /// The originating request id, echoed into terminal errors.
    pub request_id: String,
}

impl OperationContext {
    pub fn new(
        component: impl Into<String>,
        operation: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
            correlation_id: Uuid::new_v4(),
            request_id: request_id.into(),
        }
    }

    /// Breaker key shared by every execution of this operation class.
    pub fn breaker_key(&self) -> String {
        format!("{}.{}", self.component, self.operation)
    }
}

/// Future type produced by computed fallbacks.
pub type FallbackFuture = BoxFuture<'static, Result<Value, SourceError>>;

/// Last-resort value source consulted after retries and recovery fail.
#[derive(Clone)]
pub enum Fallback {
    /// A fixed value served as-is.
    Value(Value),
    /// A computation run at failure time; its own failure is absorbed
    /// and the pipeline proceeds to the terminal error.
    Compute(Arc<dyn Fn() -> FallbackFuture + Send + Sync>),
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Fallback::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// Per-call knobs layered over [`ExecutorSettings`] defaults.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Total attempt budget, including the first call.
    pub max_attempts: Option<u32>,
    /// Base delay for linear backoff between attempts.
    pub base_delay: Option<Duration>,
    /// Per-attempt timeout.
    pub timeout: Option<Duration>,
    /// When false the operation gets exactly one attempt.
    pub retry_enabled: bool,
    pub fallback: Option<Fallback>,
    /// Treat an absent item as a successful null result instead of a
    /// failure. Lookup surfaces where "not there" is a normal answer
    /// enable this so missing items never trip breakers.
    pub not_found_as_null: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            max_attempts: None,
            base_delay: None,
            timeout: None,
            retry_enabled: true,
            fallback: None,
            not_found_as_null: false,
        }
    }
}

impl ExecuteOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = Some(base_delay);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.retry_enabled = false;
        self
    }

    pub fn with_fallback_value(mut self, value: Value) -> Self {
        self.fallback = Some(Fallback::Value(value));
        self
    }

    pub fn with_fallback<F>(mut self, compute: F) -> Self
    where
        F: Fn() -> FallbackFuture + Send + Sync + 'static,
    {
        self.fallback = Some(Fallback::Compute(Arc::new(compute)));
        self
    }

    pub fn not_found_as_null(mut self) -> Self {
        self.not_found_as_null = true;
        self
    }
}

/// Domain-specific recovery consulted after retries are exhausted.
///
/// Strategies are tried in registration order; within one strategy,
/// [`max_attempts`](RecoveryStrategy::max_attempts) recovery calls are
/// made with [`retry_delay`](RecoveryStrategy::retry_delay) between
/// them. The first strategy to return a value wins.
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this strategy applies to the given failure.
    fn handles(&self, error: &ClassifiedError, context: &OperationContext) -> bool;

    /// Attempt to produce a substitute result.
    async fn recover(
        &self,
        error: &ClassifiedError,
        context: &OperationContext,
    ) -> Result<Value, SourceError>;

    fn max_attempts(&self) -> u32 {
        1
    }

    fn retry_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Result of a completed resilient execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub value: Value,
    pub outcome: Outcome,
    /// Operation invocations made, not counting recovery calls.
    pub attempts: u32,
}

/// Linear backoff: `base_delay` multiplied by the number of completed
/// attempts, capped at `max_delay`.
pub fn linear_backoff(
    base_delay: Duration,
    completed_attempts: u32,
    max_delay: Duration,
) -> Duration {
    base_delay.saturating_mul(completed_attempts).min(max_delay)
}

/// The execution pipeline. Shared behind `Arc` by every handler; holds
/// the breaker registry and outcome counters it reports into.
pub struct ResilientExecutor {
    settings: ExecutorSettings,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    error_stats: Arc<ErrorStats>,
    strategies: RwLock<Vec<Arc<dyn RecoveryStrategy>>>,
}

impl fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("settings", &self.settings)
            .field("strategies", &self.strategies.read().len())
            .finish()
    }
}

impl ResilientExecutor {
    pub fn new(
        settings: ExecutorSettings,
        circuit_breakers: Arc<CircuitBreakerRegistry>,
        error_stats: Arc<ErrorStats>,
    ) -> Self {
        Self {
            settings,
            circuit_breakers,
            error_stats,
            strategies: RwLock::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Registers a recovery strategy. Order of registration is the order
    /// of consultation.
    pub fn register_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        info!(strategy = strategy.name(), "Registered recovery strategy");
        self.strategies.write().push(strategy);
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.read().len()
    }

    /// Runs `operation` through the full pipeline.
    ///
    /// `operation` is a factory: it is called once per attempt so each
    /// retry gets a fresh future. An open breaker rejects the call before
    /// the first attempt and records nothing.
    #[instrument(
        skip(self, operation, context, options),
        fields(
            component = %context.component,
            operation = %context.operation,
            request_id = %context.request_id,
            correlation_id = %context.correlation_id,
        )
    )]
    pub async fn execute<F, Fut>(
        &self,
        operation: F,
        context: &OperationContext,
        options: &ExecuteOptions,
    ) -> RelayResult<ExecutionReport>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value, SourceError>>,
    {
        let key = context.breaker_key();
        let breaker = self.circuit_breakers.breaker(&key);

        if breaker.is_open() {
            debug!(breaker = %key, "Rejected by open circuit breaker");
            return Err(RelayError::circuit_open(key));
        }

        let max_attempts = if options.retry_enabled {
            options.max_attempts.unwrap_or(self.settings.max_attempts).max(1)
        } else {
            1
        };
        let base_delay = options.base_delay.unwrap_or_else(|| self.settings.base_delay());
        let max_delay = self.settings.max_delay();
        let per_attempt_timeout = options
            .timeout
            .unwrap_or_else(|| self.settings.operation_timeout());

        let mut attempts: u32 = 0;
        let mut internal_retry_used = false;

        let failure: ClassifiedError = loop {
            attempts += 1;

            let result = match tokio::time::timeout(per_attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::timeout(&key)),
            };

            let source_error = match result {
                Ok(value) => {
                    breaker.record_success();
                    let outcome = if attempts == 1 {
                        Outcome::Success
                    } else {
                        Outcome::Recovered
                    };
                    self.error_stats.record(&key, outcome);
                    debug!(attempts, outcome = outcome.as_str(), "Operation completed");
                    return Ok(ExecutionReport {
                        value,
                        outcome,
                        attempts,
                    });
                }
                Err(err) => err,
            };

            let classified = classify(&source_error);

            if options.not_found_as_null && classified.kind == ErrorKind::NotFound {
                breaker.record_success();
                self.error_stats.record(&key, Outcome::Success);
                debug!(attempts, "Item not present, serving null result");
                return Ok(ExecutionReport {
                    value: Value::Null,
                    outcome: Outcome::Success,
                    attempts,
                });
            }

            let mut may_retry = false;
            if attempts < max_attempts {
                if classified.retryable {
                    may_retry = true;
                } else if classified.kind == ErrorKind::Internal && !internal_retry_used {
                    // unclassified failures earn a single extra attempt
                    internal_retry_used = true;
                    may_retry = true;
                }
            }

            if may_retry {
                let delay = linear_backoff(base_delay, attempts, max_delay);
                warn!(
                    attempts,
                    error_kind = classified.kind.as_str(),
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying after backoff"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            break classified;
        };

        // retries exhausted; consult recovery strategies in registration order
        let strategies: Vec<Arc<dyn RecoveryStrategy>> =
            self.strategies.read().iter().map(Arc::clone).collect();
        for strategy in strategies {
            if !strategy.handles(&failure, context) {
                continue;
            }
            let strategy_attempts = strategy.max_attempts().max(1);
            for recovery_attempt in 1..=strategy_attempts {
                debug!(
                    strategy = strategy.name(),
                    recovery_attempt, "Attempting recovery"
                );
                match strategy.recover(&failure, context).await {
                    Ok(value) => {
                        breaker.record_success();
                        self.error_stats.record(&key, Outcome::Recovered);
                        info!(
                            strategy = strategy.name(),
                            recovery_attempt, "✅ Recovery strategy produced a result"
                        );
                        return Ok(ExecutionReport {
                            value,
                            outcome: Outcome::Recovered,
                            attempts,
                        });
                    }
                    Err(error) => {
                        debug!(
                            strategy = strategy.name(),
                            recovery_attempt,
                            error = %error,
                            "Recovery attempt failed"
                        );
                        if recovery_attempt < strategy_attempts {
                            let delay = strategy.retry_delay();
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                        }
                    }
                }
            }
        }

        if let Some(fallback) = &options.fallback {
            let value = match fallback {
                Fallback::Value(value) => Some(value.clone()),
                Fallback::Compute(compute) => match compute().await {
                    Ok(value) => Some(value),
                    Err(error) => {
                        warn!(error = %error, "Fallback computation failed");
                        None
                    }
                },
            };
            if let Some(value) = value {
                breaker.record_failure();
                self.error_stats.record(&key, Outcome::Partial);
                warn!(
                    error_kind = failure.kind.as_str(),
                    attempts, "Serving fallback value for failed operation"
                );
                return Ok(ExecutionReport {
                    value,
                    outcome: Outcome::Partial,
                    attempts,
                });
            }
        }

        breaker.record_failure();
        self.error_stats.record(&key, Outcome::Failed);
        let sanitized = sanitize_message(&failure.message);
        debug!(original_message = %failure.message, "Terminal failure message before sanitizing");
        warn!(
            error_kind = failure.kind.as_str(),
            attempts, "❌ Operation failed after retries, recovery, and fallback"
        );
        Err(RelayError::operation(
            failure.kind,
            sanitized,
            &context.request_id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_key_joins_component_and_operation() {
        let context = OperationContext::new("catalog", "lookup", "req-1");
        assert_eq!(context.breaker_key(), "catalog.lookup");
    }

    #[test]
    fn contexts_get_unique_correlation_ids() {
        let a = OperationContext::new("catalog", "lookup", "req-1");
        let b = OperationContext::new("catalog", "lookup", "req-1");
        assert_ne!(a.correlation_id, b.correlation_id);
    }

    #[test]
    fn linear_backoff_scales_with_completed_attempts() {
        let base = Duration::from_millis(100);
        let cap = Duration::from_secs(10);
        assert_eq!(linear_backoff(base, 1, cap), Duration::from_millis(100));
        assert_eq!(linear_backoff(base, 2, cap), Duration::from_millis(200));
        assert_eq!(linear_backoff(base, 5, cap), Duration::from_millis(500));
    }

    #[test]
    fn linear_backoff_respects_the_cap() {
        let base = Duration::from_millis(400);
        let cap = Duration::from_millis(1000);
        assert_eq!(linear_backoff(base, 3, cap), cap);
        assert_eq!(linear_backoff(base, 100, cap), cap);
    }

    #[test]
    fn default_options_retry_with_no_overrides() {
        let options = ExecuteOptions::default();
        assert!(options.retry_enabled);
        assert!(options.max_attempts.is_none());
        assert!(options.base_delay.is_none());
        assert!(options.timeout.is_none());
        assert!(options.fallback.is_none());
        assert!(!options.not_found_as_null);
    }

    #[test]
    fn option_builders_compose() {
        let options = ExecuteOptions::default()
            .with_max_attempts(5)
            .with_base_delay(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(1))
            .with_fallback_value(serde_json::json!({"cached": true}))
            .not_found_as_null();

        assert_eq!(options.max_attempts, Some(5));
        assert_eq!(options.base_delay, Some(Duration::from_millis(10)));
        assert_eq!(options.timeout, Some(Duration::from_secs(1)));
        assert!(matches!(options.fallback, Some(Fallback::Value(_))));
        assert!(options.not_found_as_null);
    }

    #[test]
    fn without_retry_disables_retries() {
        let options = ExecuteOptions::default().without_retry();
        assert!(!options.retry_enabled);
    }
}
