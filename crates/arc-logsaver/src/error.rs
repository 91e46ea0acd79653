//! Log saver error types.
//!
//! The `Display` text of each variant is exactly what the client receives in
//! the `message` field of the JSON error body.

use axum::http::StatusCode;

/// Errors produced while handling a save request.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Any method other than POST or OPTIONS.
    #[error("Only POST is allowed")]
    MethodNotAllowed,

    /// POST with a zero-length body.
    #[error("Empty request body")]
    EmptyBody,

    /// The body exceeds the configured size limit.
    #[error("Request body too large (limit {limit} bytes)")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The body is not valid JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// Creating the log directory or writing the file failed.
    #[error("File write error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else. The detail is echoed to the client.
    #[error("Server error: {0}")]
    Unexpected(String),
}

impl SaveError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::EmptyBody | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Io(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "method_not_allowed",
            Self::EmptyBody => "empty_body",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::InvalidJson(_) => "invalid_json",
            Self::Io(_) => "io",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

/// Result alias for log saver operations.
pub type Result<T> = std::result::Result<T, SaveError>;
