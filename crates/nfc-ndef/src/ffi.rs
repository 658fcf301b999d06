use crate::{payload, record::NdefRecord};

#[uniffi::export]
fn ndef_decode_text(payload: Vec<u8>) -> String {
    payload::decode_text(&payload)
}

#[uniffi::export]
fn ndef_decode_uri(payload: Vec<u8>) -> String {
    payload::decode_uri(&payload)
}

#[uniffi::export]
fn ndef_decode_record_string(record: NdefRecord) -> String {
    record.payload_string()
}

#[uniffi::export]
fn ndef_text_record(text: String, language: Option<String>) -> NdefRecord {
    let language = language.as_deref().unwrap_or(payload::DEFAULT_LANGUAGE);
    NdefRecord::text(&text, language)
}

#[uniffi::export]
fn ndef_uri_record(uri: String) -> NdefRecord {
    NdefRecord::uri(&uri)
}
