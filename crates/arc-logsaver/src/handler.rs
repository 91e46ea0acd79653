//! Request handling shared by the CGI and HTTP front ends.

use axum::http::{Method, StatusCode};
use chrono::{Local, NaiveDateTime};
use serde_json::json;
use tracing::warn;

use crate::error::{Result, SaveError};
use crate::record::LogRecord;
use crate::store::{LogStore, SavedLog};

/// Headers sent with every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// A transport-independent response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Response body (empty for preflight).
    pub body: String,
}

impl LogResponse {
    /// 200 preflight response with no body.
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/plain",
            body: String::new(),
        }
    }

    /// 200 `{"status":"success","message":...}`.
    pub fn saved(saved: &SavedLog) -> Self {
        Self::json(StatusCode::OK, "success", &saved.message())
    }

    /// `{"status":"error","message":...}` with the error's status.
    pub fn error(err: &SaveError) -> Self {
        Self::json(err.status(), "error", &err.to_string())
    }

    fn json(status: StatusCode, outcome: &str, message: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: json!({ "status": outcome, "message": message }).to_string(),
        }
    }

    /// All headers for this response, `Content-Type` first.
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        std::iter::once(("Content-Type", self.content_type)).chain(CORS_HEADERS)
    }
}

/// Stateless save handler.
#[derive(Clone, Debug)]
pub struct LogSaver {
    store: LogStore,
}

impl LogSaver {
    /// Create a handler writing into `store`.
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Handle one request, stamping files with the current local time.
    pub fn handle(&self, method: &Method, body: &[u8]) -> LogResponse {
        self.handle_at(method, body, Local::now().naive_local())
    }

    /// Handle one request with an explicit timestamp.
    pub fn handle_at(&self, method: &Method, body: &[u8], now: NaiveDateTime) -> LogResponse {
        if *method == Method::OPTIONS {
            return LogResponse::preflight();
        }
        if *method != Method::POST {
            return LogResponse::error(&SaveError::MethodNotAllowed);
        }

        match self.save(body, now) {
            Ok(saved) => LogResponse::saved(&saved),
            Err(err) => {
                warn!(kind = err.error_kind(), error = %err, "log save failed");
                LogResponse::error(&err)
            }
        }
    }

    fn save(&self, body: &[u8], now: NaiveDateTime) -> Result<SavedLog> {
        let record = LogRecord::from_slice(body)?;
        self.store.save(&record, now)
    }
}
