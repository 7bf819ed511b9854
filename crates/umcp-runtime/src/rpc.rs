//! JSON-RPC 2.0 envelope handling.
//!
//! The request `id` is kept in its raw lexical form from arrival to
//! response: `"abc"` keeps its quotes, `42`, `-7` and `3.14` keep their
//! digits, `null` stays the literal `null`. Responses splice the raw text
//! back in rather than round-tripping through a parsed value, so the id a
//! client sent is the id it gets back, bit for bit.

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Parsed request envelope, borrowing `params` and `id` from the body.
///
/// An absent `id` marks a notification: the envelope is still validated
/// and routed, but no response bytes are emitted for it.
#[derive(Debug, Deserialize)]
pub struct Request<'a> {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(borrow, default)]
    pub params: Option<&'a RawValue>,
    #[serde(borrow, default)]
    pub id: Option<&'a RawValue>,
}

impl<'a> Request<'a> {
    pub fn parse(body: &'a str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id in its raw lexical form, or `null` when absent.
    pub fn request_id(&self) -> RequestId {
        match self.id {
            Some(raw) => RequestId::from_raw(raw),
            None => RequestId::null(),
        }
    }
}

/// A request id captured as raw JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn null() -> Self {
        RequestId("null".to_string())
    }

    pub fn from_raw(raw: &RawValue) -> Self {
        RequestId(raw.get().trim().to_string())
    }

    /// Raw JSON text of the id, suitable for splicing into an envelope.
    pub fn as_raw(&self) -> &str {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == "null"
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a success envelope. Fails only if `result` cannot serialize.
pub fn success<T: serde::Serialize>(id: &RequestId, result: &T) -> Result<String, serde_json::Error> {
    let result = serde_json::to_string(result)?;
    Ok(format!(
        r#"{{"jsonrpc":"{}","result":{},"id":{}}}"#,
        JSONRPC_VERSION,
        result,
        id.as_raw()
    ))
}

/// Build an error envelope with the preserved id.
pub fn error(id: &RequestId, code: i64, message: &str) -> String {
    format!(
        r#"{{"jsonrpc":"{}","error":{{"code":{},"message":{}}},"id":{}}}"#,
        JSONRPC_VERSION,
        code,
        json_string(message),
        id.as_raw()
    )
}

/// Build an error envelope carrying an additional data payload.
pub fn error_with_data(id: &RequestId, code: i64, message: &str, data: &Value) -> String {
    format!(
        r#"{{"jsonrpc":"{}","error":{{"code":{},"message":{},"data":{}}},"id":{}}}"#,
        JSONRPC_VERSION,
        code,
        json_string(message),
        data,
        id.as_raw()
    )
}

fn json_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// Extract the raw `id` token from an envelope without a full JSON parse.
///
/// Scans the top level of the object, skipping over strings and nested
/// containers, so an `"id"` key inside `params` is never picked up. Used
/// where an id-bearing envelope must be synthesized for a body the router
/// has not parsed (pause mode, oversize replacement for unparseable input).
/// Returns `RequestId::null()` when no top-level id is present.
pub fn peek_id(body: &str) -> RequestId {
    match scan_top_level_value(body, "id") {
        Some(raw) => RequestId(raw.trim().to_string()),
        None => RequestId::null(),
    }
}

fn scan_top_level_value<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let bytes = body.as_bytes();
    let mut i = skip_ws(bytes, 0);
    if i >= bytes.len() || bytes[i] != b'{' {
        return None;
    }
    i += 1;

    loop {
        i = skip_ws(bytes, i);
        match *bytes.get(i)? {
            b'}' => return None,
            b',' => {
                i += 1;
                continue;
            }
            b'"' => {}
            _ => return None,
        }

        let (name, after_key) = scan_string(bytes, i)?;
        i = skip_ws(bytes, after_key);
        if bytes.get(i) != Some(&b':') {
            return None;
        }
        i = skip_ws(bytes, i + 1);

        let value_start = i;
        let value_end = scan_value(bytes, i)?;
        if name == key.as_bytes() {
            return std::str::from_utf8(&bytes[value_start..value_end]).ok();
        }
        i = value_end;
    }
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    i
}

/// Scan a JSON string starting at the opening quote. Returns the raw
/// content (with escapes intact) and the index past the closing quote.
fn scan_string(bytes: &[u8], start: usize) -> Option<(&[u8], usize)> {
    debug_assert_eq!(bytes.get(start), Some(&b'"'));
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some((&bytes[start + 1..i], i + 1)),
            _ => i += 1,
        }
    }
    None
}

/// Scan past one JSON value starting at `start`, returning the index just
/// past its end.
fn scan_value(bytes: &[u8], start: usize) -> Option<usize> {
    match *bytes.get(start)? {
        b'"' => scan_string(bytes, start).map(|(_, end)| end),
        b'{' | b'[' => {
            let mut depth = 0usize;
            let mut i = start;
            while i < bytes.len() {
                match bytes[i] {
                    b'"' => {
                        let (_, end) = scan_string(bytes, i)?;
                        i = end;
                        continue;
                    }
                    b'{' | b'[' => depth += 1,
                    b'}' | b']' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(i + 1);
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            None
        }
        _ => {
            // Scalar: number, true, false, null.
            let mut i = start;
            while i < bytes.len() && !matches!(bytes[i], b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r') {
                i += 1;
            }
            (i > start).then_some(i)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_basic_request() {
        let body = r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#;
        let req = Request::parse(body).unwrap();
        assert_eq!(req.method.as_deref(), Some("tools/list"));
        assert!(!req.is_notification());
        assert_eq!(req.request_id().as_raw(), "1");
    }

    #[test]
    fn test_parse_notification() {
        let body = r#"{"jsonrpc":"2.0","method":"tools/list"}"#;
        let req = Request::parse(body).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn test_id_lexical_forms_preserved() {
        for raw in [r#""abc""#, "42", "-7", "3.14", "null"] {
            let body = format!(r#"{{"jsonrpc":"2.0","method":"m","id":{}}}"#, raw);
            let req = Request::parse(&body).unwrap();
            assert_eq!(req.request_id().as_raw(), raw);
        }
    }

    #[test]
    fn test_success_envelope_shape() {
        let id = RequestId::from_raw(
            serde_json::from_str::<Box<RawValue>>("7").unwrap().as_ref(),
        );
        let env = success(&id, &json!({"ok": true})).unwrap();
        assert_eq!(env, r#"{"jsonrpc":"2.0","result":{"ok":true},"id":7}"#);
    }

    #[test]
    fn test_error_envelope_shape() {
        let id = RequestId::null();
        let env = error(&id, PARSE_ERROR, "Parse error: bad input");
        assert_eq!(
            env,
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error: bad input"},"id":null}"#
        );
    }

    #[test]
    fn test_error_envelope_escapes_message() {
        let id = RequestId::null();
        let env = error(&id, INTERNAL_ERROR, "quote \" and \\ backslash");
        let parsed: Value = serde_json::from_str(&env).unwrap();
        assert_eq!(parsed["error"]["message"], "quote \" and \\ backslash");
    }

    #[test]
    fn test_error_with_data() {
        let id = RequestId::null();
        let env = error_with_data(&id, INVALID_PARAMS, "bad", &json!({"param": "x"}));
        let parsed: Value = serde_json::from_str(&env).unwrap();
        assert_eq!(parsed["error"]["data"]["param"], "x");
    }

    #[test]
    fn test_peek_id_string() {
        let body = r#"{"jsonrpc":"2.0","method":"m","id":"x-1"}"#;
        assert_eq!(peek_id(body).as_raw(), r#""x-1""#);
    }

    #[test]
    fn test_peek_id_number_and_null() {
        assert_eq!(peek_id(r#"{"id":42,"method":"m"}"#).as_raw(), "42");
        assert_eq!(peek_id(r#"{"method":"m","id":null}"#).as_raw(), "null");
        assert_eq!(peek_id(r#"{"method":"m","id":3.14}"#).as_raw(), "3.14");
    }

    #[test]
    fn test_peek_id_ignores_nested_id() {
        let body = r#"{"method":"tools/call","params":{"id":99,"name":"t"},"id":7}"#;
        assert_eq!(peek_id(body).as_raw(), "7");
    }

    #[test]
    fn test_peek_id_missing_or_malformed() {
        assert_eq!(peek_id(r#"{"method":"m"}"#).as_raw(), "null");
        assert_eq!(peek_id("not-json").as_raw(), "null");
        assert_eq!(peek_id("").as_raw(), "null");
    }

    #[test]
    fn test_peek_id_key_inside_string_value() {
        let body = r#"{"method":"m","note":"has \"id\": 5 inside","id":8}"#;
        assert_eq!(peek_id(body).as_raw(), "8");
    }
}
