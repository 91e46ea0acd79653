//! # arc-logsaver
//!
//! Saves game session logs posted by the ARC web client.
//!
//! One POST carries one JSON object; it is written, pretty-printed, to
//! `<player>_<session>_<YYYYMMDD_HHMMSS>_<count>.json` in the log directory.
//! Every response is JSON (except the empty preflight) and carries
//! permissive CORS headers.
//!
//! - [`cgi`]: run once per request under a CGI host
//! - [`http`]: standalone axum server with the same semantics

#![deny(unsafe_code)]

pub mod cgi;
pub mod error;
pub mod handler;
pub mod http;
pub mod record;
pub mod store;

pub use error::{Result, SaveError};
pub use handler::{CORS_HEADERS, LogResponse, LogSaver};
pub use record::{LogRecord, sanitize_player_name};
pub use store::{LogStore, SavedLog};
