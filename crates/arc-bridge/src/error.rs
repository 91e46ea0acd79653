//! Bridge error types.
//!
//! Every error is terminal for the session it occurs in; none are retried.

use std::string::FromUtf8Error;
use std::time::Duration;

/// Errors raised while serving or running a bridge session.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The WebSocket listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backend TCP server refused or reset the connection attempt.
    #[error("failed to connect to tcp server {addr}: {source}")]
    Connect {
        /// Backend address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backend TCP server did not accept in time.
    #[error("timed out connecting to tcp server {addr} after {timeout:?}")]
    ConnectTimeout {
        /// Backend address.
        addr: String,
        /// Configured timeout.
        timeout: Duration,
    },

    /// Read or write on an established TCP stream failed.
    #[error("tcp i/o error: {0}")]
    Tcp(#[from] std::io::Error),

    /// Receiving from or sending to the WebSocket failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A line from the TCP server was not valid UTF-8.
    #[error("invalid utf-8 from tcp server: {0}")]
    Decode(#[from] FromUtf8Error),
}

impl BridgeError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::Connect { .. } => "connect",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Tcp(_) => "tcp_io",
            Self::WebSocket(_) => "websocket",
            Self::Decode(_) => "decode",
        }
    }
}

/// Result alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
