//! Standalone HTTP front end for hosts without CGI.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::SaveError;
use crate::handler::{LogResponse, LogSaver};

impl IntoResponse for LogResponse {
    fn into_response(self) -> Response {
        let headers: Vec<(HeaderName, HeaderValue)> = self
            .headers()
            .filter_map(|(name, value)| {
                Some((
                    HeaderName::from_bytes(name.as_bytes()).ok()?,
                    HeaderValue::from_static(value),
                ))
            })
            .collect();

        let mut response = (self.status, self.body).into_response();
        for (name, value) in headers {
            let _ = response.headers_mut().insert(name, value);
        }
        response
    }
}

#[derive(Clone)]
struct AppState {
    saver: Arc<LogSaver>,
    max_body_bytes: usize,
}

/// Router serving the save handler on every path and method.
///
/// Bodies over `max_body_bytes` get a JSON 413 carrying the CORS headers.
pub fn router(saver: Arc<LogSaver>, max_body_bytes: usize) -> Router {
    Router::new()
        .fallback(save_handler)
        .with_state(AppState {
            saver,
            max_body_bytes,
        })
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    saver: Arc<LogSaver>,
    max_body_bytes: usize,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, dir = %saver.store().dir().display(), "log saver listening");
    }
    axum::serve(listener, router(saver, max_body_bytes))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn save_handler(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> LogResponse {
    let body = match body {
        Ok(body) => body,
        // only POST reads the body
        Err(_) if method != Method::POST => Bytes::new(),
        Err(rejection) => {
            let err = body_error(&rejection, state.max_body_bytes);
            warn!(kind = err.error_kind(), error = %rejection, "request body rejected");
            return LogResponse::error(&err);
        }
    };

    let saver = state.saver;
    // file I/O stays off the async workers
    match tokio::task::spawn_blocking(move || saver.handle(&method, &body)).await {
        Ok(response) => response,
        Err(err) => LogResponse::error(&SaveError::Unexpected(err.to_string())),
    }
}

fn body_error(rejection: &BytesRejection, limit: usize) -> SaveError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        SaveError::PayloadTooLarge { limit }
    } else {
        SaveError::Unexpected(rejection.body_text())
    }
}
