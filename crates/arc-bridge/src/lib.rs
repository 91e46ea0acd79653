//! # arc-bridge
//!
//! Relays between browser WebSocket clients and a line-oriented TCP game
//! server. Every WebSocket session gets its own TCP connection:
//!
//! - WebSocket → TCP: text and binary payloads are written verbatim.
//! - TCP → WebSocket: each newline-terminated line becomes one text message.
//!
//! When either side closes, the other is closed too. [`BridgeServer`] serves
//! the upgrade on every path alongside `GET /health`.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod registry;
pub mod server;
pub mod session;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use registry::{SessionGuard, SessionId, SessionRegistry};
pub use server::BridgeServer;
pub use session::{PumpEnd, PumpReport, TcpTarget, pump_tcp_to_ws, pump_ws_to_tcp, run_session};
