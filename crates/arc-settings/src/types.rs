//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a settings file may contain any subset of fields. Missing fields take
//! the compiled default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings type for the ARC bridge and log saver.
///
/// ```json
/// {
///   "bridge": { "port": 8999, "tcpHost": "localhost", "tcpPort": 8998 },
///   "logSaver": { "logDir": "/home/ddmlab/arc-game-logs" },
///   "logging": { "level": "info", "format": "compact" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcSettings {
    /// WebSocket-to-TCP bridge settings.
    pub bridge: BridgeSettings,
    /// Log saver settings.
    pub log_saver: LogSaverSettings,
    /// Logging output settings.
    pub logging: LoggingSettings,
}

/// Settings for the WebSocket-to-TCP bridge process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Interface the WebSocket listener binds to.
    pub host: String,
    /// WebSocket listener port.
    pub port: u16,
    /// Backend TCP host every session connects to.
    pub tcp_host: String,
    /// Backend TCP port.
    pub tcp_port: u16,
    /// Maximum concurrent sessions. `None` means unlimited.
    pub max_sessions: Option<usize>,
    /// Timeout for the outbound TCP connect, in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum size of a single inbound WebSocket message, in bytes.
    pub max_message_size: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8999,
            tcp_host: "localhost".into(),
            tcp_port: 8998,
            max_sessions: None,
            connect_timeout_secs: 10,
            max_message_size: 16 * 1024 * 1024,
        }
    }
}

/// Settings for the game log saver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogSaverSettings {
    /// Directory that receives one JSON file per saved log.
    pub log_dir: PathBuf,
    /// Interface for the standalone HTTP server (`serve` mode).
    pub http_host: String,
    /// Port for the standalone HTTP server (`serve` mode).
    pub http_port: u16,
    /// Maximum accepted request body in `serve` mode, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LogSaverSettings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/home/ddmlab/arc-game-logs"),
            http_host: "0.0.0.0".into(),
            http_port: 8997,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter, overridden by `RUST_LOG`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_defaults_match_legacy_ports() {
        let s = BridgeSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8999);
        assert_eq!(s.tcp_host, "localhost");
        assert_eq!(s.tcp_port, 8998);
        assert!(s.max_sessions.is_none());
    }

    #[test]
    fn log_saver_default_dir() {
        let s = LogSaverSettings::default();
        assert_eq!(s.log_dir, PathBuf::from("/home/ddmlab/arc-game-logs"));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ArcSettings::default()).unwrap();
        assert_eq!(json["bridge"]["tcpPort"], 8998);
        assert!(json["logSaver"]["logDir"].is_string());
        assert_eq!(json["logging"]["format"], "compact");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: ArcSettings = serde_json::from_str(r#"{"bridge":{"tcpPort":7000}}"#).unwrap();
        assert_eq!(s.bridge.tcp_port, 7000);
        assert_eq!(s.bridge.port, 8999);
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn log_format_parses_lowercase() {
        let f: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(f, LogFormat::Json);
    }
}
