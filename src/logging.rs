//! # Structured Logging
//!
//! Environment-aware logging initialization: compact console output for
//! development and test, JSON output for staging and production. Safe to
//! call more than once; the first caller wins and later calls are no-ops.

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::detect_environment;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// `RUST_LOG` takes precedence; otherwise the default level is derived
/// from the detected environment. If the embedding application already
/// installed a global subscriber this quietly defers to it.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let log_level = default_log_level(&environment);
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let json_output = matches!(environment.as_str(), "production" | "staging");
        let result = if json_output {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json()
                        .with_filter(filter),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .compact()
                        .with_filter(filter),
                )
                .try_init()
        };

        if result.is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                json_output,
                "🔧 STRUCTURED LOGGING: Initialized"
            );
        }
    });
}

/// Log one handled request with its terminal disposition.
pub fn log_request_handled(
    method: &str,
    request_id: &str,
    status: &str,
    duration_ms: u64,
    error_code: Option<i64>,
) {
    tracing::info!(
        method = %method,
        request_id = %request_id,
        status = %status,
        duration_ms,
        error_code,
        timestamp = %Utc::now().to_rfc3339(),
        "📨 REQUEST_HANDLED"
    );
}

/// Default log level based on environment.
fn default_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        "staging" => "info".to_string(),
        _ => "debug".to_string(),
    }
}
