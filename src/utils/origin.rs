//! Origin-field parsing
//!
//! Callers pass "origin" either as a bare URL string or as a
//! JSON-encoded `{"url": "..."}` envelope. When the input parses as
//! JSON, only a non-empty string `url` field is substituted; any other
//! parsed shape yields no origin at all. Inputs that are not JSON are
//! used verbatim.

use serde_json::Value;

/// Extract the effective origin URL from a raw origin field
pub fn parse_origin(origin: Option<&str>) -> Option<String> {
    let raw = origin?;
    match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => parsed
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        // Not JSON at all: a bare URL string, use it unchanged
        Err(_) => Some(raw.to_string()),
    }
}
