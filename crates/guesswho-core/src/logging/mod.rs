//! Structured logging with `tracing`.
//!
//! [`init_subscriber`] installs the process-wide subscriber once at startup.
//! Before that, [`bootstrap_subscriber`] covers the settings load so warnings
//! about rejected values still reach stderr.
//! `RUST_LOG` takes precedence over the configured level. Tests use
//! [`capture_logs`] to assert on emitted events.

pub mod test_utils;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Output format for the stderr log writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Initialize the global tracing subscriber writing to stderr.
///
/// Subsequent calls are no-ops.
pub fn init_subscriber(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init fails if a global subscriber is already set
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Subscriber for events emitted before settings are loaded.
///
/// Filters with `RUST_LOG`, falling back to `warn`. Install it scoped with
/// [`tracing::subscriber::with_default`] so [`init_subscriber`] can still
/// set the global one afterwards.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_does_not_panic() {
        init_subscriber("warn", LogFormat::Compact);
        init_subscriber("debug", LogFormat::Json);
    }

    #[test]
    fn bootstrap_subscriber_passes_warnings() {
        let enabled = tracing::subscriber::with_default(bootstrap_subscriber(), || {
            tracing::enabled!(tracing::Level::WARN)
        });
        assert!(enabled);
    }

    #[test]
    fn log_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
        let back: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(back, LogFormat::Compact);
    }
}
