//! API-key generation and bearer-token checking.

use rand::RngCore;

/// Prefix identifying umcp-issued keys.
pub const API_KEY_PREFIX: &str = "umcp_";

const API_KEY_BYTES: usize = 24;

/// Generate a fresh API key: `umcp_` followed by 48 lowercase hex chars.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

/// Check an `Authorization` header value against the configured key.
/// The token comparison is constant-shape: it examines every byte
/// position regardless of where the first mismatch falls.
pub fn check_bearer(header: Option<&str>, expected: &str) -> bool {
    match header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => constant_time_eq(token.as_bytes(), expected.as_bytes()),
        None => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
