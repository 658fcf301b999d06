//! Scan and write options as sent by the host, and their validation

use nfc_ndef::{
    NdefRecord, NdefType,
    convert::coerce_string_payload,
    payload::{encode_text, encode_uri},
};
use nfc_util::ResultExt as _;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{manager::NfcManagerError, reader::ModeRequest};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanOptions {
    /// One of `auto`, `full`, `compat` (or `limited`), `ndef`, wins over the legacy flags
    pub mode: Option<String>,
    pub force_full: Option<bool>,
    pub force_compat: Option<bool>,
    #[serde(rename = "forceNDEF", alias = "forceNdef")]
    pub force_ndef: Option<bool>,
}

impl ScanOptions {
    pub fn from_json(json: &str) -> Result<Self, NfcManagerError> {
        from_json_object(json)
    }

    /// The mode override these options ask for, `None` keeps the current mode
    pub fn mode_request(&self) -> Result<Option<ModeRequest>, NfcManagerError> {
        if let Some(mode) = &self.mode {
            let request = mode
                .trim()
                .parse::<ModeRequest>()
                .map_err(|_| NfcManagerError::InvalidScanMode(mode.clone()))?;

            return Ok(Some(request));
        }

        let request = if self.force_full == Some(true) {
            Some(ModeRequest::Full)
        } else if self.force_compat == Some(true) {
            Some(ModeRequest::Compat)
        } else if self.force_ndef == Some(true) {
            Some(ModeRequest::Ndef)
        } else {
            None
        };

        Ok(request)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct WriteOptions {
    #[serde(default)]
    pub records: Vec<WriteRecordInput>,
    /// Write string payloads as their UTF-8 bytes, no Text/URI framing
    #[serde(default)]
    pub raw_mode: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
pub struct WriteRecordInput {
    #[serde(default, rename = "type")]
    pub record_type: Option<String>,
    #[serde(default)]
    pub payload: Option<PayloadInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Enum)]
#[serde(from = "RawPayload")]
pub enum PayloadInput {
    Text { text: String },
    Bytes { bytes: Vec<u8> },
    /// Numbers from a JSON array, must each fit in a byte
    Numbers { numbers: Vec<i64> },
    /// Anything else the host sent, described by its JSON kind
    Unsupported { kind: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Text(String),
    Numbers(Vec<i64>),
    Other(Value),
}

impl From<RawPayload> for PayloadInput {
    fn from(raw: RawPayload) -> Self {
        match raw {
            RawPayload::Text(text) => Self::Text { text },
            RawPayload::Numbers(numbers) => Self::Numbers { numbers },
            RawPayload::Other(value) => Self::Unsupported { kind: json_kind(&value).to_string() },
        }
    }
}

/// Options always arrive as a JSON object, serde alone would also accept `[]`
pub(crate) fn from_json_object<T: DeserializeOwned>(json: &str) -> Result<T, NfcManagerError> {
    let value: Value = serde_json::from_str(json).map_err_str(NfcManagerError::InvalidJson)?;
    if !value.is_object() {
        let kind = json_kind(&value);
        return Err(NfcManagerError::InvalidJson(format!("expected an object, got {kind}")));
    }

    serde_json::from_value(value).map_err_str(NfcManagerError::InvalidJson)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl WriteOptions {
    pub fn from_json(json: &str) -> Result<Self, NfcManagerError> {
        from_json_object(json)
    }

    /// Validate and encode every record, `language` is used for Text records
    pub fn into_records(self, language: &str) -> Result<Vec<NdefRecord>, NfcManagerError> {
        if self.records.is_empty() {
            return Err(NfcManagerError::EmptyMessage);
        }

        let raw_mode = self.raw_mode.unwrap_or(false);
        self.records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_record(index as u32, raw_mode, language))
            .collect()
    }
}

impl WriteRecordInput {
    fn into_record(
        self,
        index: u32,
        raw_mode: bool,
        language: &str,
    ) -> Result<NdefRecord, NfcManagerError> {
        let missing =
            |field: &str| NfcManagerError::MissingRecordField { index, field: field.to_string() };

        let record_type = self.record_type.ok_or_else(|| missing("type"))?;
        let payload = self.payload.ok_or_else(|| missing("payload"))?;
        let payload = payload.into_bytes(&record_type, raw_mode, language)?;

        let tnf = NdefType::infer_from_type(&record_type);
        Ok(NdefRecord::new(tnf, record_type.into_bytes(), payload))
    }
}

impl PayloadInput {
    pub fn into_bytes(
        self,
        record_type: &str,
        raw_mode: bool,
        language: &str,
    ) -> Result<Vec<u8>, NfcManagerError> {
        match self {
            Self::Text { text } if raw_mode => Ok(text.into_bytes()),
            Self::Text { text } => Ok(match record_type {
                "T" => encode_text(&text, language),
                "U" => encode_uri(&text, 0),
                _ => coerce_string_payload(&text),
            }),
            Self::Bytes { bytes } => Ok(bytes),
            Self::Numbers { numbers } => numbers
                .into_iter()
                .map(u8::try_from)
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| {
                    NfcManagerError::UnsupportedPayloadType("numbers outside 0-255".to_string())
                }),
            Self::Unsupported { kind } => Err(NfcManagerError::UnsupportedPayloadType(kind)),
        }
    }
}
