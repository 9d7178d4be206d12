//! Structured logging configuration.
//!
//! Library crates log through the `log` facade; the subscriber installed here
//! picks those records up through tracing-subscriber's `tracing-log` bridge.

use studio_tournament::TournamentError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Operations slower than this are logged at warn level
pub const SLOW_OPERATION_MS: u64 = 1000;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var. Output goes to
/// stderr so command output on stdout stays machine-readable.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Structured logging initialized");
}

/// Log how long a command took
///
/// # Arguments
///
/// * `operation` - Command name
/// * `duration_ms` - Duration in milliseconds
/// * `metadata` - Additional metadata, such as the competition ID
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > SLOW_OPERATION_MS {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}

/// Log a rejected operation with its typed error
///
/// # Arguments
///
/// * `operation` - Command name
/// * `error` - Error returned by the tournament manager
pub fn log_rejection(operation: &str, error: &TournamentError) {
    tracing::warn!(
        operation = operation,
        retryable = error.is_retryable(),
        "REJECTED: {}",
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_performance() {
        // Just ensure it doesn't panic without a subscriber
        log_performance("generate", 40, Some("competition=1"));
        log_performance("generate", 2500, None);
    }

    #[test]
    fn test_log_rejection() {
        log_rejection("record", &TournamentError::IncompleteScoreData);
        log_rejection("generate", &TournamentError::GenerationInProgress(4));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
