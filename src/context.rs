//! # Resilience Context
//!
//! One shared bundle of the protection infrastructure: the circuit
//! breaker registry, outcome counters, tiered cache, and the executor
//! wired to all three. The dispatcher owns one and hands it to every
//! handler.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, TieredCache};
use crate::config::RelayConfig;
use crate::resilience::{
    CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakerSnapshot, ErrorStats,
    ErrorStatsSnapshot, RecoveryStrategy, ResilientExecutor,
};

/// Aggregated health view across all protection infrastructure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResilienceHealth {
    pub circuit_breakers: Vec<CircuitBreakerSnapshot>,
    pub outcomes: ErrorStatsSnapshot,
    pub cache: CacheStats,
}

/// Shared protection infrastructure for one dispatcher.
#[derive(Debug)]
pub struct ResilienceContext {
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    error_stats: Arc<ErrorStats>,
    cache: Arc<TieredCache>,
    executor: ResilientExecutor,
}

impl ResilienceContext {
    pub fn from_config(config: &RelayConfig) -> Self {
        let circuit_breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: config.circuit_breaker.failure_threshold,
            cooldown: config.circuit_breaker.cooldown(),
        }));
        let error_stats = Arc::new(ErrorStats::new());
        let cache = Arc::new(TieredCache::new(&config.cache));
        let executor = ResilientExecutor::new(
            config.executor.clone(),
            Arc::clone(&circuit_breakers),
            Arc::clone(&error_stats),
        );

        Self {
            circuit_breakers,
            error_stats,
            cache,
            executor,
        }
    }

    pub fn circuit_breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.circuit_breakers
    }

    pub fn error_stats(&self) -> &Arc<ErrorStats> {
        &self.error_stats
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn register_recovery_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.executor.register_strategy(strategy);
    }

    pub fn health(&self) -> ResilienceHealth {
        ResilienceHealth {
            circuit_breakers: self.circuit_breakers.snapshot(),
            outcomes: self.error_stats.snapshot(),
            cache: self.cache.stats(),
        }
    }
}
