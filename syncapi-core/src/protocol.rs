//! Paths and body conventions of the daemon's HTTP surface
//!
//! The v2 API answers with JSON envelopes; the legacy API embeds its token
//! in an HTML page. A rejected token is signalled by a literal body rather
//! than a status code.

/// Body the daemon returns for a call made with an expired or unknown token
pub const INVALID_REQUEST_SENTINEL: &str = "\r\ninvalid request";

pub const V2_TOKEN_PATH: &[&str] = &["api", "v2", "token"];
pub const V2_FOLDERS_PATH: &[&str] = &["api", "v2", "folders"];
pub const V2_SECRET_PATH: &[&str] = &["api", "v2", "secret"];
pub const V2_EVENTS_PATH: &[&str] = &["api", "v2", "events"];

pub const LEGACY_INDEX_PATH: &[&str] = &["gui", "en", "index.html"];
pub const LEGACY_TOKEN_PATH: &[&str] = &["gui", "token.html"];
/// Generic action endpoint, `/gui/`
pub const LEGACY_ACTION_PATH: &[&str] = &["gui", ""];

/// Whether a response body is the daemon's invalid-session signal
pub fn is_invalid_session(body: &str) -> bool {
    body == INVALID_REQUEST_SENTINEL
}

/// Parsed response body: JSON when the body is JSON, otherwise the raw text
/// as a JSON string.
pub fn decode_body(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_exact() {
        assert!(is_invalid_session("\r\ninvalid request"));
        assert!(!is_invalid_session("invalid request"));
        assert!(!is_invalid_session("\r\ninvalid request\r\n"));
        assert!(!is_invalid_session(r#"{"folders":[]}"#));
    }

    #[test]
    fn test_decode_body_falls_back_to_text() {
        assert_eq!(decode_body(r#"{"folders":[]}"#), serde_json::json!({"folders": []}));
        assert_eq!(decode_body("OK"), serde_json::Value::String("OK".to_string()));
    }
}
