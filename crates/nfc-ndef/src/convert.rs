//! Byte, base64 and string coercions used at the host boundary

use base64::{Engine as _, engine::general_purpose::STANDARD};

pub fn bytes_to_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

pub fn base64_to_bytes(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}

/// Standard alphabet, padding only at the end, length a multiple of 4
///
/// Intentionally permissive: a literal string like `"abcd"` passes too.
pub fn looks_like_base64(s: &str) -> bool {
    if s.is_empty() || s.len() % 4 != 0 {
        return false;
    }

    let body = s.trim_end_matches('=');
    if s.len() - body.len() > 2 {
        return false;
    }

    body.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/')
}

/// A string payload is taken as already encoded bytes when it looks like
/// base64 and decodes, otherwise it is literal text
pub fn coerce_string_payload(s: &str) -> Vec<u8> {
    if looks_like_base64(s) {
        if let Ok(bytes) = base64_to_bytes(s) {
            return bytes;
        }
    }

    s.as_bytes().to_vec()
}
