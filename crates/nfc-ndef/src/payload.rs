//! Well-Known Text (`T`) and URI (`U`) payload codec
//!
//! Decoding never fails: tags in the wild are not always compliant, so every
//! decode path ends in a byte preserving Latin-1 mapping.

use tracing::debug;

/// Language code written when the caller does not pick one
pub const DEFAULT_LANGUAGE: &str = "en";

const STATUS_UTF16: u8 = 0x80;
const LANGUAGE_LENGTH_MASK: u8 = 0x3F;

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NdefPayload {
    Text(TextPayload),
    Uri(String),
    Data(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct TextPayload {
    pub format: TextPayloadFormat,
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum TextPayloadFormat {
    Utf8,
    Utf16,
}

/// URI prefix codes as defined in NFC Forum RTD URI specification
pub const URI_PREFIXES: &[&str] = &[
    "",                           // 0x00 - no prepending
    "http://www.",                // 0x01
    "https://www.",               // 0x02
    "http://",                    // 0x03
    "https://",                   // 0x04
    "tel:",                       // 0x05
    "mailto:",                    // 0x06
    "ftp://anonymous:anonymous@", // 0x07
    "ftp://ftp.",                 // 0x08
    "ftps://",                    // 0x09
    "sftp://",                    // 0x0A
    "smb://",                     // 0x0B
    "nfs://",                     // 0x0C
    "ftp://",                     // 0x0D
    "dav://",                     // 0x0E
    "news:",                      // 0x0F
    "telnet://",                  // 0x10
    "imap:",                      // 0x11
    "rtsp://",                    // 0x12
    "urn:",                       // 0x13
    "pop:",                       // 0x14
    "sip:",                       // 0x15
    "sips:",                      // 0x16
    "tftp:",                      // 0x17
    "btspp://",                   // 0x18
    "btl2cap://",                 // 0x19
    "btgoep://",                  // 0x1A
    "tcpobex://",                 // 0x1B
    "irdaobex://",                // 0x1C
    "file://",                    // 0x1D
    "urn:epc:id:",                // 0x1E
    "urn:epc:tag:",               // 0x1F
    "urn:epc:pat:",               // 0x20
    "urn:epc:raw:",               // 0x21
    "urn:epc:",                   // 0x22
    "urn:nfc:",                   // 0x23
];

/// Encode a Well-Known Text payload, always UTF-8
///
/// The language code must fit the 6 bit length field (63 bytes), longer codes
/// are the caller's responsibility.
pub fn encode_text(text: &str, language: &str) -> Vec<u8> {
    let language = language.as_bytes();
    let status = (language.len() as u8) & LANGUAGE_LENGTH_MASK;

    let mut payload = Vec::with_capacity(1 + language.len() + text.len());
    payload.push(status);
    payload.extend_from_slice(language);
    payload.extend_from_slice(text.as_bytes());
    payload
}

pub fn decode_text(bytes: &[u8]) -> String {
    decode_text_payload(bytes).text
}

/// Decode a Well-Known Text payload including its language and encoding
pub fn decode_text_payload(bytes: &[u8]) -> TextPayload {
    let Some((&status, rest)) = bytes.split_first() else {
        return TextPayload {
            format: TextPayloadFormat::Utf8,
            language: String::new(),
            text: String::new(),
        };
    };

    let is_utf16 = status & STATUS_UTF16 != 0;
    let language_length = (status & LANGUAGE_LENGTH_MASK) as usize;

    let language = match rest.get(..language_length) {
        Some(language) if is_language_code(language) => language,
        _ => {
            debug!("text payload has an invalid language code, decoding it as plain text");
            return TextPayload {
                format: TextPayloadFormat::Utf8,
                language: String::new(),
                text: utf8_or_latin1(bytes),
            };
        }
    };

    let text = &rest[language_length..];
    let text = if is_utf16 {
        decode_utf16(text).unwrap_or_else(|| latin1(text))
    } else {
        utf8_or_latin1(text)
    };

    TextPayload {
        format: if is_utf16 { TextPayloadFormat::Utf16 } else { TextPayloadFormat::Utf8 },
        language: latin1(language),
        text,
    }
}

/// Encode a URI payload, `prefix_code` is written as is and the URI is not abbreviated
pub fn encode_uri(uri: &str, prefix_code: u8) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + uri.len());
    payload.push(prefix_code);
    payload.extend_from_slice(uri.as_bytes());
    payload
}

pub fn decode_uri(bytes: &[u8]) -> String {
    let Some((&prefix_code, rest)) = bytes.split_first() else {
        return String::new();
    };

    let prefix = URI_PREFIXES.get(prefix_code as usize).copied().unwrap_or_default();

    let mut uri = String::from(prefix);
    uri.push_str(&utf8_or_latin1(rest));
    uri
}

/// Best effort string for any record type
pub fn decode_generic(type_: &str, bytes: &[u8]) -> String {
    match type_ {
        "T" => decode_text(bytes),
        "U" => decode_uri(bytes),
        _ => utf8_or_latin1(bytes),
    }
}

impl NdefPayload {
    pub fn decode(type_: &[u8], bytes: &[u8]) -> Self {
        match type_ {
            b"T" => Self::Text(decode_text_payload(bytes)),
            b"U" => Self::Uri(decode_uri(bytes)),
            _ => Self::Data(bytes.to_vec()),
        }
    }
}

pub(crate) fn utf8_or_latin1(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => latin1(bytes),
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

fn is_language_code(bytes: &[u8]) -> bool {
    bytes.iter().all(|byte| byte.is_ascii_alphabetic() || *byte == b'-')
}

/// UTF-16 with optional byte order mark, big endian without one
fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }

    let (little_endian, bytes) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };

    let units = bytes.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });

    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_text_hi() {
        assert_eq!(encode_text("Hi", "en"), vec![0x02, b'e', b'n', b'H', b'i']);
    }

    #[test]
    fn decode_text_with_language() {
        let payload = decode_text_payload(&[0x05, b'e', b'n', b'-', b'U', b'S', b'h', b'e', b'y']);
        assert_eq!(payload.language, "en-US");
        assert_eq!(payload.text, "hey");
        assert_eq!(payload.format, TextPayloadFormat::Utf8);
    }

    #[test]
    fn decode_text_utf16() {
        let mut bytes = vec![0x80 | 0x02, b'e', b'n'];
        for unit in "héllo".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }

        let payload = decode_text_payload(&bytes);
        assert_eq!(payload.format, TextPayloadFormat::Utf16);
        assert_eq!(payload.text, "héllo");
    }

    #[test]
    fn decode_text_utf16_little_endian_bom() {
        let mut bytes = vec![0x80 | 0x02, b'e', b'n', 0xFF, 0xFE];
        for unit in "ok".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }

        assert_eq!(decode_text(&bytes), "ok");
    }

    #[test]
    fn decode_text_language_overflow_falls_back_to_whole_payload() {
        // status says 63 bytes of language, only 4 follow
        let bytes = [0x3F, b'a', b'b', b'c', b'd'];
        assert_eq!(decode_text(&bytes), "?abcd");
    }

    #[test]
    fn decode_text_non_letter_language_falls_back_to_whole_payload() {
        let bytes = b"\x02e1hello";
        assert_eq!(decode_text(bytes), "\u{2}e1hello");
    }

    #[test]
    fn decode_text_invalid_utf8_uses_latin1() {
        let bytes = [0x02, b'e', b'n', 0xE9, 0x74, 0xE9];
        assert_eq!(decode_text(&bytes), "été");
    }

    #[test]
    fn decode_text_empty() {
        assert_eq!(decode_text(&[]), "");
        assert_eq!(decode_text(&[0x00]), "");
    }

    #[test]
    fn uri_without_compression() {
        let encoded = encode_uri("https://example.com", 0);
        assert_eq!(encoded[0], 0x00);
        assert_eq!(&encoded[1..], b"https://example.com");
        assert_eq!(decode_uri(&encoded), "https://example.com");
    }

    #[test]
    fn uri_prefix_expansion() {
        assert_eq!(URI_PREFIXES.len(), 36);
        assert_eq!(decode_uri(b"\x04example.com"), "https://example.com");
        assert_eq!(decode_uri(b"\x01example.com"), "http://www.example.com");
        assert_eq!(decode_uri(b"\x23ndef"), "urn:nfc:ndef");
    }

    #[test]
    fn uri_out_of_range_prefix_is_empty() {
        assert_eq!(decode_uri(b"\x24example.com"), "example.com");
        assert_eq!(decode_uri(b"\xFFx"), "x");
        assert_eq!(decode_uri(&[]), "");
    }

    #[test]
    fn decode_generic_dispatch() {
        assert_eq!(decode_generic("T", &encode_text("hello", "en")), "hello");
        assert_eq!(decode_generic("U", b"\x03a.io"), "http://a.io");
        assert_eq!(decode_generic("application/json", b"{}"), "{}");
        assert_eq!(decode_generic("X", &[0xFF]), "\u{FF}");
    }

    #[test]
    fn payload_decode_by_type() {
        assert_eq!(
            NdefPayload::decode(b"U", b"\x02a.io"),
            NdefPayload::Uri("https://www.a.io".into())
        );
        assert_eq!(NdefPayload::decode(b"x", &[1, 2]), NdefPayload::Data(vec![1, 2]));
    }

    proptest! {
        #[test]
        fn text_round_trip(text in "[ -~]{0,64}", language in "[A-Za-z-]{1,63}") {
            prop_assert_eq!(decode_text(&encode_text(&text, &language)), text);
        }

        #[test]
        fn uri_round_trip(uri in ".{0,64}") {
            prop_assert_eq!(decode_uri(&encode_uri(&uri, 0)), uri);
        }

        #[test]
        fn decoders_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..96)) {
            let _ = decode_text_payload(&bytes);
            let _ = decode_uri(&bytes);
            let _ = decode_generic("Q", &bytes);
        }
    }
}
