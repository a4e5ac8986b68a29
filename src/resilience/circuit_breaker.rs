//! # Circuit Breaker
//!
//! Fault isolation for one operation class. The classic three-state
//! machine: Closed (normal operation), Open (failing fast until a
//! cooldown elapses), and Half-Open (exactly one probe call decides
//! between closing again and re-opening for a fresh cooldown window).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::defaults;

/// Circuit breaker states representing the current operational mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - calls are allowed through.
    Closed = 0,
    /// Failure mode - calls fail fast without executing.
    Open = 1,
    /// Testing recovery - a single probe call is allowed through.
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            2 => CircuitState::HalfOpen,
            // Default to the safest state
            _ => CircuitState::Open,
        }
    }
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker parameters, fixed at construction and exposed read-only for
/// diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long an open circuit waits before admitting its probe.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: defaults::CIRCUIT_FAILURE_THRESHOLD,
            cooldown: Duration::from_secs(defaults::CIRCUIT_COOLDOWN_SECONDS),
        }
    }
}

/// Serializable point-in-time view for the health surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerSnapshot {
    pub key: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub total_successes: u64,
}

/// Core circuit breaker with atomic state management.
///
/// Callers gate on [`is_open`](CircuitBreaker::is_open) before invoking
/// the protected operation and report the outcome through
/// [`record_success`](CircuitBreaker::record_success) /
/// [`record_failure`](CircuitBreaker::record_failure). The breaker itself
/// never runs operations; that separation keeps recording decisions (one
/// failure per logical invocation, not per retry) in the caller's hands.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Breaker key, `component.operation`, for logging and diagnostics.
    key: String,

    config: CircuitBreakerConfig,

    /// Current circuit state (atomic for lock-free reads).
    state: AtomicU8,

    /// Consecutive failures while Closed; reset on any success.
    consecutive_failures: AtomicU32,

    total_failures: AtomicU64,
    total_successes: AtomicU64,

    /// When the circuit last opened, for cooldown calculations.
    opened_at: Mutex<Option<Instant>>,

    /// Claimed by the single half-open probe; released when the probe
    /// outcome is recorded.
    probe_in_flight: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(key: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let key = key.into();
        info!(
            breaker = %key,
            failure_threshold = config.failure_threshold,
            cooldown_seconds = config.cooldown.as_secs(),
            "🛡️ Circuit breaker initialized"
        );

        Self {
            key,
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            total_failures: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            opened_at: Mutex::new(None),
            probe_in_flight: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Configuration is read-only after construction.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Whether calls should currently be rejected.
    ///
    /// Closed always answers `false`. Open answers `true` until the
    /// cooldown elapses, at which point the circuit moves to Half-Open
    /// and exactly one caller receives `false` (the probe); concurrent
    /// callers keep seeing `true` until the probe's outcome is recorded.
    pub fn is_open(&self) -> bool {
        match self.state() {
            CircuitState::Closed => false,
            CircuitState::Open => {
                if !self.cooldown_elapsed() {
                    return true;
                }
                self.transition_to_half_open();
                !self.claim_probe()
            }
            CircuitState::HalfOpen => !self.claim_probe(),
        }
    }

    /// Resets the consecutive-failure count; a half-open probe success
    /// closes the circuit.
    pub fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Release);
        if self.state() == CircuitState::HalfOpen {
            self.probe_in_flight.store(false, Ordering::Release);
            self.transition_to_closed();
        }
        // a late success against an Open circuit does not close it; the
        // probe path is the only way back
    }

    /// Records one failure. While Closed, reaching the threshold opens
    /// the circuit; a half-open probe failure re-opens it for a full
    /// cooldown window.
    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        match self.state() {
            CircuitState::HalfOpen => {
                self.probe_in_flight.store(false, Ordering::Release);
                self.consecutive_failures.fetch_add(1, Ordering::AcqRel);
                self.transition_to_open("probe failed");
            }
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.transition_to_open("failure threshold reached");
                }
            }
            CircuitState::Open => {
                // already open; late failures neither extend nor restart
                // the cooldown window
                self.consecutive_failures.fetch_add(1, Ordering::AcqRel);
            }
        }
    }

    /// Operational override: open the circuit regardless of counts.
    pub fn force_open(&self) {
        warn!(breaker = %self.key, "🚨 Circuit breaker forced open");
        self.probe_in_flight.store(false, Ordering::Release);
        self.transition_to_open("forced open");
    }

    /// Operational override: close the circuit and clear failure state.
    pub fn force_closed(&self) {
        warn!(breaker = %self.key, "Circuit breaker forced closed");
        self.consecutive_failures.store(0, Ordering::Release);
        self.probe_in_flight.store(false, Ordering::Release);
        self.transition_to_closed();
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        CircuitBreakerSnapshot {
            key: self.key.clone(),
            state: self.state(),
            consecutive_failures: self.consecutive_failures.load(Ordering::Acquire),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
        }
    }

    fn cooldown_elapsed(&self) -> bool {
        match *self.opened_at.lock() {
            Some(opened) => opened.elapsed() >= self.config.cooldown,
            None => true,
        }
    }

    fn claim_probe(&self) -> bool {
        self.probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn transition_to_half_open(&self) {
        if self
            .state
            .compare_exchange(
                CircuitState::Open as u8,
                CircuitState::HalfOpen as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            info!(breaker = %self.key, "🟡 Circuit breaker half-open, admitting one probe");
        }
    }

    fn transition_to_open(&self, reason: &str) {
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        *self.opened_at.lock() = Some(Instant::now());
        warn!(
            breaker = %self.key,
            reason,
            consecutive_failures = self.consecutive_failures.load(Ordering::Acquire),
            "🔴 Circuit breaker opened"
        );
    }

    fn transition_to_closed(&self) {
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        *self.opened_at.lock() = None;
        info!(breaker = %self.key, "🟢 Circuit breaker closed");
    }
}
