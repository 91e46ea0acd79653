//! Bridge configuration.

use std::time::Duration;

use arc_settings::BridgeSettings;
use serde::{Deserialize, Serialize};

/// Configuration for one bridge process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Interface to bind the WebSocket listener on (default `"0.0.0.0"`).
    pub host: String,
    /// WebSocket listener port (default `8999`, `0` auto-assigns).
    pub port: u16,
    /// Backend TCP host (default `"localhost"`).
    pub tcp_host: String,
    /// Backend TCP port (default `8998`).
    pub tcp_port: u16,
    /// Maximum concurrent sessions; `None` is unlimited.
    pub max_sessions: Option<usize>,
    /// Outbound TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::from(&BridgeSettings::default())
    }
}

impl From<&BridgeSettings> for BridgeConfig {
    fn from(s: &BridgeSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            tcp_host: s.tcp_host.clone(),
            tcp_port: s.tcp_port,
            max_sessions: s.max_sessions,
            connect_timeout_secs: s.connect_timeout_secs,
            max_message_size: s.max_message_size,
        }
    }
}

impl BridgeConfig {
    /// `host:port` of the WebSocket listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `host:port` of the backend TCP server.
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.tcp_host, self.tcp_port)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
