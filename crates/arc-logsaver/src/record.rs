//! The posted game log and the file name derived from it.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::error::{Result, SaveError};

const UNKNOWN: &str = "unknown";

/// Timestamp layout used in file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A parsed log payload.
///
/// The payload is kept as-is (key order included) and written back out
/// unchanged; only `sessionId`, `playerName` and `totalMessages` are read.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    payload: Map<String, Value>,
}

impl LogRecord {
    /// Parse a request body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Err(SaveError::EmptyBody);
        }
        match serde_json::from_slice(body).map_err(SaveError::InvalidJson)? {
            Value::Object(payload) => Ok(Self { payload }),
            other => Err(SaveError::Unexpected(format!(
                "log payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// `sessionId`, or `"unknown"`.
    pub fn session_id(&self) -> String {
        self.text_field("sessionId").unwrap_or_else(|| UNKNOWN.into())
    }

    /// `playerName`, or `"unknown"`.
    pub fn player_name(&self) -> String {
        self.text_field("playerName").unwrap_or_else(|| UNKNOWN.into())
    }

    /// `totalMessages`, or `"0"`.
    pub fn total_messages(&self) -> String {
        self.text_field("totalMessages").unwrap_or_else(|| "0".into())
    }

    /// `<safe_name>_<sessionId>_<YYYYMMDD_HHMMSS>_<totalMessages>.json`
    pub fn file_name(&self, timestamp: NaiveDateTime) -> String {
        format!(
            "{}_{}_{}_{}.json",
            sanitize_player_name(&self.player_name()),
            self.session_id(),
            timestamp.format(TIMESTAMP_FORMAT),
            self.total_messages()
        )
    }

    /// Pretty-printed payload, two-space indent, non-ASCII kept verbatim.
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.payload)
    }

    /// The raw payload.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    // Strings are taken verbatim, other scalars use their JSON text. An
    // explicit null counts as absent.
    fn text_field(&self, key: &str) -> Option<String> {
        match self.payload.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Replace every character that is not alphanumeric, `-` or `_` with `_`.
pub fn sanitize_player_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn sanitize_replaces_disallowed_chars() {
        assert_eq!(sanitize_player_name("Al!ce"), "Al_ce");
        assert_eq!(sanitize_player_name("a b/c.d"), "a_b_c_d");
        assert_eq!(sanitize_player_name("team-1_x"), "team-1_x");
        assert_eq!(sanitize_player_name(""), "");
    }

    #[test]
    fn sanitize_keeps_unicode_letters() {
        assert_eq!(sanitize_player_name("Zoë"), "Zoë");
        assert_eq!(sanitize_player_name("名前!"), "名前_");
    }

    #[test]
    fn file_name_from_fields() {
        let record = LogRecord::from_slice(
            br#"{"sessionId":"s1","playerName":"Al!ce","totalMessages":3}"#,
        )
        .unwrap();
        assert_eq!(record.file_name(at(9, 5, 7)), "Al_ce_s1_20260314_090507_3.json");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let record = LogRecord::from_slice(br#"{"events":[]}"#).unwrap();
        assert_eq!(record.session_id(), "unknown");
        assert_eq!(record.player_name(), "unknown");
        assert_eq!(record.total_messages(), "0");
        assert_eq!(
            record.file_name(at(23, 59, 59)),
            "unknown_unknown_20260314_235959_0.json"
        );
    }

    #[test]
    fn null_fields_use_defaults() {
        let record =
            LogRecord::from_slice(br#"{"playerName":null,"totalMessages":null}"#).unwrap();
        assert_eq!(record.player_name(), "unknown");
        assert_eq!(record.total_messages(), "0");
    }

    #[test]
    fn numeric_session_id_uses_json_text() {
        let record = LogRecord::from_slice(br#"{"sessionId":42}"#).unwrap();
        assert_eq!(record.session_id(), "42");
    }

    #[test]
    fn empty_body_rejected() {
        assert!(matches!(LogRecord::from_slice(b""), Err(SaveError::EmptyBody)));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = LogRecord::from_slice(b"{bad").unwrap_err();
        assert!(matches!(err, SaveError::InvalidJson(_)));
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[test]
    fn non_object_is_unexpected() {
        let err = LogRecord::from_slice(b"[1,2]").unwrap_err();
        assert!(matches!(err, SaveError::Unexpected(_)));
        assert!(err.to_string().contains("got array"));
    }

    #[test]
    fn pretty_json_preserves_key_order() {
        let record =
            LogRecord::from_slice(r#"{"zeta":1,"alpha":"é","sessionId":"s"}"#.as_bytes()).unwrap();
        let text = String::from_utf8(record.to_pretty_json().unwrap()).unwrap();
        assert_eq!(text, "{\n  \"zeta\": 1,\n  \"alpha\": \"é\",\n  \"sessionId\": \"s\"\n}");
    }

    #[test]
    fn large_numbers_keep_their_digits() {
        let body = br#"{"seed":123456789012345678901234567890,"ratio":1.50,"tiny":1e-400,"totalMessages":18446744073709551616}"#;
        let record = LogRecord::from_slice(body).unwrap();
        let text = String::from_utf8(record.to_pretty_json().unwrap()).unwrap();
        assert!(text.contains("\"seed\": 123456789012345678901234567890"), "{text}");
        assert!(text.contains("\"ratio\": 1.50"), "{text}");
        assert!(text.contains("\"tiny\": 1e-400"), "{text}");
        assert_eq!(record.total_messages(), "18446744073709551616");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sanitize_keeps_length_and_allowed_chars(name in any::<String>()) {
                let safe = sanitize_player_name(&name);
                prop_assert_eq!(safe.chars().count(), name.chars().count());
                for (orig, kept) in name.chars().zip(safe.chars()) {
                    prop_assert!(kept.is_alphanumeric() || kept == '-' || kept == '_');
                    if orig.is_alphanumeric() || orig == '-' || orig == '_' {
                        prop_assert_eq!(orig, kept);
                    } else {
                        prop_assert_eq!(kept, '_');
                    }
                }
            }

            #[test]
            fn file_name_never_contains_separators(name in any::<String>()) {
                let mut payload = Map::new();
                let _ = payload.insert("playerName".into(), Value::String(name));
                let record = LogRecord { payload };
                let file = record.file_name(at(0, 0, 0));
                prop_assert!(!file.contains('/') && !file.contains('\\'));
                prop_assert_eq!(file.matches('.').count(), 1);
                prop_assert!(file.ends_with("_unknown_20260314_000000_0.json"));
            }
        }
    }
}
