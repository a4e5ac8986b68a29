//! # Configuration
//!
//! Operational settings for the dispatcher, executor, circuit breakers,
//! and cache. Profiles follow the usual environment split: `Default` is
//! the production shape, [`RelayConfig::for_test`] shrinks every delay so
//! suites run fast, and [`RelayConfig::from_environment`] layers `RELAY_*`
//! environment overrides on top of the detected profile.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::defaults;

/// Top-level configuration for a relay core instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    pub dispatcher: DispatcherSettings,
    pub executor: ExecutorSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub cache: CacheSettings,
}

/// Admission-control settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatcherSettings {
    /// Ceiling on concurrently in-flight requests. Runtime-mutable on the
    /// dispatcher; this value only seeds the initial limit.
    pub max_concurrent_requests: usize,
}

/// Retry and timeout settings for the resilient executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorSettings {
    /// Maximum total invocations of an operation, first attempt included.
    pub max_attempts: u32,
    /// Base for the linear backoff: the delay before attempt n+1 is
    /// `base * n`.
    pub base_delay_ms: u64,
    /// Cap applied to any single backoff delay.
    pub max_delay_ms: u64,
    /// Independent deadline for each outbound attempt.
    pub operation_timeout_seconds: u64,
}

impl ExecutorSettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}

/// Shared settings for every circuit breaker in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before a breaker opens.
    pub failure_threshold: u32,
    /// Cooldown before an open breaker admits its half-open probe.
    pub cooldown_seconds: u64,
}

impl CircuitBreakerSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

/// Tiered-cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    /// Default TTL for computed entries.
    pub default_ttl_seconds: u64,
    /// Interval between background sweeps of expired entries.
    pub sweep_interval_seconds: u64,
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherSettings {
                max_concurrent_requests: defaults::MAX_CONCURRENT_REQUESTS,
            },
            executor: ExecutorSettings {
                max_attempts: defaults::RETRY_MAX_ATTEMPTS,
                base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
                max_delay_ms: defaults::RETRY_MAX_DELAY_MS,
                operation_timeout_seconds: defaults::OPERATION_TIMEOUT_SECONDS,
            },
            circuit_breaker: CircuitBreakerSettings {
                failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
                cooldown_seconds: defaults::CIRCUIT_COOLDOWN_SECONDS,
            },
            cache: CacheSettings {
                default_ttl_seconds: defaults::CACHE_TTL_SECONDS,
                sweep_interval_seconds: defaults::CACHE_SWEEP_INTERVAL_SECONDS,
            },
        }
    }
}

impl RelayConfig {
    /// Shrunk delays and short TTLs so test suites never wait on wall
    /// clock time they do not control.
    pub fn for_test() -> Self {
        Self {
            dispatcher: DispatcherSettings {
                max_concurrent_requests: 4,
            },
            executor: ExecutorSettings {
                max_attempts: 3,
                base_delay_ms: 10,
                max_delay_ms: 100,
                operation_timeout_seconds: 5,
            },
            circuit_breaker: CircuitBreakerSettings {
                failure_threshold: 3,
                cooldown_seconds: 1,
            },
            cache: CacheSettings {
                default_ttl_seconds: 60,
                sweep_interval_seconds: 1,
            },
        }
    }

    /// Development profile: production shape with snappier retries.
    pub fn for_development() -> Self {
        Self {
            executor: ExecutorSettings {
                max_attempts: defaults::RETRY_MAX_ATTEMPTS,
                base_delay_ms: 100,
                max_delay_ms: 2_000,
                operation_timeout_seconds: 10,
            },
            ..Self::default()
        }
    }

    /// Profile selection from the detected environment, then `RELAY_*`
    /// overrides on top.
    pub fn from_environment() -> Self {
        let environment = detect_environment();
        let config = match environment.as_str() {
            "test" => Self::for_test(),
            "development" => Self::for_development(),
            _ => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Apply `RELAY_*` environment variable overrides. Unparseable values
    /// are ignored with a warning rather than failing startup.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env_override::<usize>("RELAY_MAX_CONCURRENT_REQUESTS") {
            self.dispatcher.max_concurrent_requests = value;
        }
        if let Some(value) = env_override::<u32>("RELAY_RETRY_MAX_ATTEMPTS") {
            self.executor.max_attempts = value;
        }
        if let Some(value) = env_override::<u64>("RELAY_RETRY_BASE_DELAY_MS") {
            self.executor.base_delay_ms = value;
        }
        if let Some(value) = env_override::<u64>("RELAY_RETRY_MAX_DELAY_MS") {
            self.executor.max_delay_ms = value;
        }
        if let Some(value) = env_override::<u64>("RELAY_OPERATION_TIMEOUT_SECONDS") {
            self.executor.operation_timeout_seconds = value;
        }
        if let Some(value) = env_override::<u32>("RELAY_CIRCUIT_FAILURE_THRESHOLD") {
            self.circuit_breaker.failure_threshold = value;
        }
        if let Some(value) = env_override::<u64>("RELAY_CIRCUIT_COOLDOWN_SECONDS") {
            self.circuit_breaker.cooldown_seconds = value;
        }
        if let Some(value) = env_override::<u64>("RELAY_CACHE_TTL_SECONDS") {
            self.cache.default_ttl_seconds = value;
        }
        if let Some(value) = env_override::<u64>("RELAY_CACHE_SWEEP_INTERVAL_SECONDS") {
            self.cache.sweep_interval_seconds = value;
        }
        self
    }

    /// Reject configurations that would disable admission control or the
    /// resilience pipeline outright.
    pub fn validate(&self) -> Result<(), String> {
        if self.dispatcher.max_concurrent_requests == 0 {
            return Err("dispatcher.max_concurrent_requests must be at least 1".to_string());
        }
        if self.executor.max_attempts == 0 {
            return Err("executor.max_attempts must be at least 1".to_string());
        }
        if self.executor.base_delay_ms == 0 {
            return Err("executor.base_delay_ms must be at least 1".to_string());
        }
        if self.executor.max_delay_ms < self.executor.base_delay_ms {
            return Err("executor.max_delay_ms must be >= executor.base_delay_ms".to_string());
        }
        if self.executor.operation_timeout_seconds == 0 {
            return Err("executor.operation_timeout_seconds must be at least 1".to_string());
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err("circuit_breaker.failure_threshold must be at least 1".to_string());
        }
        if self.circuit_breaker.cooldown_seconds == 0 {
            return Err("circuit_breaker.cooldown_seconds must be at least 1".to_string());
        }
        if self.cache.default_ttl_seconds == 0 {
            return Err("cache.default_ttl_seconds must be at least 1".to_string());
        }
        if self.cache.sweep_interval_seconds == 0 {
            return Err("cache.sweep_interval_seconds must be at least 1".to_string());
        }
        Ok(())
    }

    /// Log the effective configuration at startup.
    pub fn log_configuration(&self) {
        info!(
            max_concurrent_requests = self.dispatcher.max_concurrent_requests,
            max_attempts = self.executor.max_attempts,
            base_delay_ms = self.executor.base_delay_ms,
            operation_timeout_seconds = self.executor.operation_timeout_seconds,
            failure_threshold = self.circuit_breaker.failure_threshold,
            cooldown_seconds = self.circuit_breaker.cooldown_seconds,
            cache_ttl_seconds = self.cache.default_ttl_seconds,
            sweep_interval_seconds = self.cache.sweep_interval_seconds,
            "🔧 Relay configuration loaded"
        );
    }
}

/// Environment detection used for profile selection and log formatting.
pub fn detect_environment() -> String {
    std::env::var("RELAY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .or_else(|_| std::env::var("RUST_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn env_override<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
