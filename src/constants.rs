//! # System Constants
//!
//! Protocol identifiers, wire error codes, and default operational
//! boundaries for the relay core. Values here are part of the public
//! contract with embedding front-ends; changing them is a breaking change.

/// Protocol tag expected in every request envelope.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Message returned verbatim on admission rejection. Front-ends key their
/// retry-later behavior off this exact string.
pub const ADMISSION_REJECTED_MESSAGE: &str = "too many concurrent requests — retry shortly";

/// Sentinel rendered into cache keys when an optional qualifier is absent,
/// so qualified and unqualified lookups can never collide.
pub const KEY_QUALIFIER_SENTINEL: &str = "-";

/// Built-in method names routed by the dispatcher.
pub mod methods {
    pub const TOOLS_CALL: &str = "tools/call";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const SYSTEM_HEALTH: &str = "system/health";
}

/// Wire error codes, JSON-RPC numbering convention.
pub mod error_codes {
    /// Malformed or unsupported request envelope.
    pub const INVALID_ENVELOPE: i64 = -32600;
    /// Unknown method or unknown tool name.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Admission limit reached; explicitly retriable.
    pub const ADMISSION_REJECTED: i64 = -32001;
    /// Everything else that escapes a handler.
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Default operational boundaries, overridable through configuration.
pub mod defaults {
    pub const MAX_CONCURRENT_REQUESTS: usize = 10;
    pub const RETRY_MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
    pub const RETRY_MAX_DELAY_MS: u64 = 10_000;
    pub const OPERATION_TIMEOUT_SECONDS: u64 = 30;
    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
    pub const CIRCUIT_COOLDOWN_SECONDS: u64 = 30;
    pub const CACHE_TTL_SECONDS: u64 = 300;
    pub const CACHE_SWEEP_INTERVAL_SECONDS: u64 = 60;
}
