//! CGI front end: request metadata from the environment, body on stdin,
//! response on stdout.

use std::io::{self, Read, Write};

use axum::http::Method;
use chrono::{Local, NaiveDateTime};

use crate::error::SaveError;
use crate::handler::{LogResponse, LogSaver};

/// The CGI variables this handler reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CgiEnv {
    /// `REQUEST_METHOD`. Defaults to `GET` when unset.
    pub method: String,
    /// Raw `CONTENT_LENGTH`, if set.
    pub content_length: Option<String>,
}

impl CgiEnv {
    /// Read from the process environment.
    pub fn from_process_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            method: lookup("REQUEST_METHOD").unwrap_or_else(|| "GET".into()),
            content_length: lookup("CONTENT_LENGTH"),
        }
    }

    /// Parsed `CONTENT_LENGTH`; absent or blank means zero.
    pub fn content_length(&self) -> Result<usize, SaveError> {
        match self.content_length.as_deref().map(str::trim) {
            None | Some("") => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| SaveError::Unexpected(format!("invalid CONTENT_LENGTH {raw:?}"))),
        }
    }

    fn request_method(&self) -> Option<Method> {
        Method::from_bytes(self.method.trim().as_bytes()).ok()
    }
}

/// Handle one CGI request and write the response to `stdout`.
pub fn run<R: Read, W: Write>(saver: &LogSaver, env: &CgiEnv, stdin: R, stdout: W) -> io::Result<()> {
    let response = respond_at(saver, env, stdin, Local::now().naive_local());
    write_response(&response, stdout)
}

/// Build the response for one CGI request.
///
/// The body is only read for POST, and never past `CONTENT_LENGTH`.
pub fn respond_at<R: Read>(
    saver: &LogSaver,
    env: &CgiEnv,
    stdin: R,
    now: NaiveDateTime,
) -> LogResponse {
    let Some(method) = env.request_method() else {
        return LogResponse::error(&SaveError::MethodNotAllowed);
    };
    if method != Method::POST {
        return saver.handle_at(&method, &[], now);
    }

    let length = match env.content_length() {
        Ok(length) => length,
        Err(err) => return LogResponse::error(&err),
    };

    let mut body = Vec::with_capacity(length);
    if let Err(err) = stdin.take(length as u64).read_to_end(&mut body) {
        return LogResponse::error(&SaveError::Unexpected(format!(
            "failed to read request body: {err}"
        )));
    }

    saver.handle_at(&Method::POST, &body, now)
}

/// Serialize `response` in CGI form: `Status:` line, headers, blank line, body.
pub fn write_response<W: Write>(response: &LogResponse, mut out: W) -> io::Result<()> {
    writeln!(
        out,
        "Status: {} {}",
        response.status.as_u16(),
        response.status.canonical_reason().unwrap_or("")
    )?;
    for (name, value) in response.headers() {
        writeln!(out, "{name}: {value}")?;
    }
    writeln!(out)?;
    if !response.body.is_empty() {
        writeln!(out, "{}", response.body)?;
    }
    out.flush()
}
