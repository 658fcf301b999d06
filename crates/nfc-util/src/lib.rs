pub mod result_ext;

pub use result_ext::ResultExt;

/// Uppercase hex, the format tag identifiers are reported in
pub fn hex_upper(bytes: impl AsRef<[u8]>) -> String {
    hex::encode_upper(bytes)
}

/// Truncate a byte slice for log output, keeping the first `max` bytes as hex
pub fn hex_preview(bytes: &[u8], max: usize) -> String {
    if bytes.len() <= max {
        return hex::encode(bytes);
    }

    format!("{}..(+{} bytes)", hex::encode(&bytes[..max]), bytes.len() - max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_upper() {
        assert_eq!(hex_upper([0x04, 0xa2, 0x2b, 0xff]), "04A22BFF");
        assert_eq!(hex_upper([]), "");
    }

    #[test]
    fn test_hex_preview() {
        assert_eq!(hex_preview(&[0xde, 0xad], 4), "dead");
        assert_eq!(hex_preview(&[0xde, 0xad, 0xbe, 0xef, 0x01], 2), "dead..(+3 bytes)");
    }
}
