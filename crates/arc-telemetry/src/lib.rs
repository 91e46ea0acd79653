//! # arc-telemetry
//!
//! `tracing` subscriber setup shared by both binaries.
//!
//! Output always goes to stderr: under CGI, stdout carries the HTTP response
//! and must not be interleaved with log lines. `RUST_LOG` takes precedence
//! over the configured level.

#![deny(unsafe_code)]

pub mod test_utils;

use arc_settings::{LogFormat, LoggingSettings};
use tracing_subscriber::EnvFilter;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Subscriber configuration.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default filter directive (e.g. `"info"` or `"info,arc_bridge=debug"`).
    pub level: String,
    /// Line format.
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

impl From<&LoggingSettings> for TelemetryConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            format: settings.format,
        }
    }
}

impl TelemetryConfig {
    /// Build the env filter: `RUST_LOG` if set and valid, else `level`,
    /// else `info`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber. Subsequent calls are no-ops.
pub fn init_subscriber(config: &TelemetryConfig) {
    let filter = config.env_filter();

    // try_init fails only when a global subscriber is already set
    let _ = match config.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .try_init(),
    };
}

/// Run `f` with a temporary stderr subscriber at `warn`.
///
/// For work that happens before configuration is known, such as loading
/// the settings that configure [`init_subscriber`].
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}
