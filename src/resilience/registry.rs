//! # Circuit Breaker Registry
//!
//! Lazily creates and shares one [`CircuitBreaker`] per operation key so
//! that every execution path protecting the same backend operation
//! observes the same failure history.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot};

/// Concurrent map of operation key to its shared breaker.
///
/// Keys follow the `component.operation` convention produced by
/// [`OperationContext::breaker_key`](super::executor::OperationContext::breaker_key).
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Returns the breaker for `key`, creating it on first use.
    ///
    /// Two concurrent first calls for the same key settle on a single
    /// instance; the loser's allocation is discarded.
    pub fn breaker(&self, key: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self
            .breakers
            .entry(key.to_string())
            .or_insert_with(|| {
                debug!(breaker = %key, "Registering circuit breaker");
                Arc::new(CircuitBreaker::new(key, self.config.clone()))
            });
        Arc::clone(entry.value())
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots every registered breaker, sorted by key for stable
    /// health output.
    pub fn snapshot(&self) -> Vec<CircuitBreakerSnapshot> {
        let mut snapshots: Vec<CircuitBreakerSnapshot> = self
            .breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.key.cmp(&b.key));
        snapshots
    }
}
