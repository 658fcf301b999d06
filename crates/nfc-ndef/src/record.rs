use crate::{
    ndef_type::NdefType,
    payload::{self, NdefPayload},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Record)]
pub struct NdefRecord {
    pub type_name_format: NdefType,
    pub type_: Vec<u8>,
    pub id: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl NdefRecord {
    pub fn new(type_name_format: NdefType, type_: impl Into<Vec<u8>>, payload: Vec<u8>) -> Self {
        Self { type_name_format, type_: type_.into(), id: None, payload }
    }

    pub fn text(text: &str, language: &str) -> Self {
        Self::new(NdefType::WellKnown, b"T".to_vec(), payload::encode_text(text, language))
    }

    pub fn uri(uri: &str) -> Self {
        Self::new(NdefType::WellKnown, b"U".to_vec(), payload::encode_uri(uri, 0))
    }

    /// The record type as a string, invalid UTF-8 is replaced
    pub fn type_string(&self) -> String {
        String::from_utf8_lossy(&self.type_).into_owned()
    }

    /// Interpret the payload, only Well-Known Text and URI are decoded
    pub fn decoded_payload(&self) -> NdefPayload {
        if self.type_name_format != NdefType::WellKnown {
            return NdefPayload::Data(self.payload.clone());
        }

        NdefPayload::decode(&self.type_, &self.payload)
    }

    /// Human readable payload, never fails
    pub fn payload_string(&self) -> String {
        payload::decode_generic(&self.type_string(), &self.payload)
    }
}
