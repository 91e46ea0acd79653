//! # ws-tcp-bridge
//!
//! Accepts WebSocket clients and relays each one to its own connection on
//! the game's TCP server until either side closes.

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use arc_bridge::{BridgeConfig, BridgeServer};
use arc_telemetry::TelemetryConfig;
use clap::Parser;
use tracing::info;

/// WebSocket-to-TCP bridge.
#[derive(Parser, Debug)]
#[command(name = "ws-tcp-bridge", about = "Relay WebSocket clients to a line-oriented TCP server")]
struct Cli {
    /// Interface to accept WebSocket clients on.
    #[arg(long)]
    host: Option<String>,

    /// WebSocket port (0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Backend TCP host.
    #[arg(long)]
    tcp_host: Option<String>,

    /// Backend TCP port.
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Maximum concurrent sessions.
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Backend connect timeout in seconds.
    #[arg(long)]
    connect_timeout_secs: Option<u64>,

    /// Log filter directive (`RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Flags take precedence over settings.
    fn apply(&self, config: &mut BridgeConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(tcp_host) = &self.tcp_host {
            config.tcp_host.clone_from(tcp_host);
        }
        if let Some(tcp_port) = self.tcp_port {
            config.tcp_port = tcp_port;
        }
        if self.max_sessions.is_some() {
            config.max_sessions = self.max_sessions;
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = arc_telemetry::with_bootstrap_logging(arc_settings::load_settings)
        .context("failed to load settings")?;

    let mut telemetry = TelemetryConfig::from(&settings.logging);
    if let Some(level) = &cli.log_level {
        telemetry.level.clone_from(level);
    }
    arc_telemetry::init_subscriber(&telemetry);

    let mut config = BridgeConfig::from(&settings.bridge);
    cli.apply(&mut config);

    let server = BridgeServer::new(config);
    let (addr, handle) = server
        .listen()
        .await
        .context("failed to start websocket listener")?;
    info!(%addr, tcp_target = %server.config().tcp_addr(), "websocket bridge ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    server.shutdown();
    handle.await.context("bridge server task failed")?;
    info!("shutdown complete");
    Ok(())
}
