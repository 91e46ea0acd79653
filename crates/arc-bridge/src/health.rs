//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::registry::SessionRegistry;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"shutting_down"` once shutdown has begun.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Sessions currently bridged.
    pub active_sessions: usize,
    /// Sessions admitted since startup.
    pub total_sessions: u64,
    /// Age in seconds of the longest-running live session, if any.
    pub oldest_session_secs: Option<u64>,
    /// Backend `host:port`.
    pub tcp_target: String,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, sessions: &SessionRegistry, tcp_target: &str) -> HealthResponse {
    let status = if sessions.is_shutting_down() {
        "shutting_down"
    } else {
        "ok"
    };
    HealthResponse {
        status: status.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions: sessions.active_count(),
        total_sessions: sessions.total_started(),
        oldest_session_secs: sessions
            .oldest_started_at()
            .map(|started| started.elapsed().as_secs()),
        tcp_target: tcp_target.into(),
    }
}
