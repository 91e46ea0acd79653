//! Settings loading: compiled defaults, then an optional JSON file, then
//! `ARC_*` environment variables.
//!
//! The file is merged over the defaults key by key. Nested objects merge
//! recursively, arrays and scalars replace, and `null` leaves the default in
//! place.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::{ArcSettings, LogFormat};

/// Env var that points at an explicit settings file.
pub const SETTINGS_PATH_ENV: &str = "ARC_SETTINGS";

/// Resolve the settings file path: `$ARC_SETTINGS`, else `~/.arc/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os(SETTINGS_PATH_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(explicit);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".arc").join("settings.json")
}

/// Load settings from the default path with process env overrides.
pub fn load_settings() -> Result<ArcSettings> {
    load_settings_with(&settings_path(), |name| std::env::var(name).ok())
}

/// Load settings from `path`, applying overrides read through `env`.
///
/// A missing file yields the defaults. A file with invalid JSON is an error.
pub fn load_settings_with<F>(path: &Path, env: F) -> Result<ArcSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(ArcSettings::default())?;

    let merged = if path.exists() {
        debug!(path = %path.display(), "loading settings file");
        let raw = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&raw)?;
        merge_json(defaults, user)
    } else {
        debug!(path = %path.display(), "no settings file, using defaults");
        defaults
    };

    let mut settings: ArcSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    Ok(settings)
}

/// Merge `overlay` into `base`.
pub fn merge_json(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                let next = match base_map.remove(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => value,
                };
                let _ = base_map.insert(key, next);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `ARC_*` overrides. Values that fail to parse are logged and ignored.
pub fn apply_env_overrides<F>(settings: &mut ArcSettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup: env };

    // ── Bridge ──────────────────────────────────────────────────────
    if let Some(v) = env.string("ARC_WS_HOST") {
        settings.bridge.host = v;
    }
    if let Some(v) = env.parsed("ARC_WS_PORT", parse_port) {
        settings.bridge.port = v;
    }
    if let Some(v) = env.string("ARC_TCP_HOST") {
        settings.bridge.tcp_host = v;
    }
    if let Some(v) = env.parsed("ARC_TCP_PORT", parse_port) {
        settings.bridge.tcp_port = v;
    }
    if let Some(v) = env.parsed("ARC_MAX_SESSIONS", |s| parse_usize_range(s, 1, 100_000)) {
        settings.bridge.max_sessions = Some(v);
    }
    if let Some(v) = env.parsed("ARC_CONNECT_TIMEOUT_SECS", |s| parse_u64_range(s, 1, 3_600)) {
        settings.bridge.connect_timeout_secs = v;
    }

    // ── Log saver ───────────────────────────────────────────────────
    if let Some(v) = env.string("ARC_LOG_DIR") {
        settings.log_saver.log_dir = PathBuf::from(v);
    }
    if let Some(v) = env.parsed("ARC_HTTP_PORT", parse_port) {
        settings.log_saver.http_port = v;
    }
    if let Some(v) = env.parsed("ARC_MAX_BODY_BYTES", |s| {
        parse_usize_range(s, 1024, 1_073_741_824)
    }) {
        settings.log_saver.max_body_bytes = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("ARC_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("ARC_LOG_FORMAT", parse_log_format) {
        settings.logging.format = v;
    }
}

// ── Pure parsers ────────────────────────────────────────────────────────────

/// Parse a non-zero TCP port.
pub fn parse_port(val: &str) -> Option<u16> {
    val.trim().parse::<u16>().ok().filter(|p| *p != 0)
}

/// Parse a `u64` within `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a `usize` within `min..=max`.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse `compact` or `json` (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.trim().to_ascii_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.string(name)?;
        let parsed = parse(&raw);
        if parsed.is_none() {
            warn!(key = name, value = %raw, "invalid env override, ignoring");
        }
        parsed
    }
}
