//! Events delivered to the host application

use nfc_ndef::{NdefRecord, convert::bytes_to_base64};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::tag::TagDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NfcEvent {
    TagDetected { records: Vec<NdefRecord>, tag_info: Option<TagDescriptor> },
    WriteSucceeded,
    Error { message: String },
}

/// A record the way it crosses the JSON boundary, payload in base64
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(rename = "type")]
    pub record_type: String,
    pub payload: String,
}

impl From<&NdefRecord> for WireRecord {
    fn from(record: &NdefRecord) -> Self {
        Self { record_type: record.type_string(), payload: bytes_to_base64(&record.payload) }
    }
}

impl NfcEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::TagDetected { .. } => "tagDetected",
            Self::WriteSucceeded => "writeSucceeded",
            Self::Error { .. } => "error",
        }
    }

    /// Event body for hosts that speak JSON
    pub fn to_json(&self) -> Value {
        match self {
            Self::TagDetected { records, tag_info } => {
                let records = records.iter().map(WireRecord::from).collect::<Vec<_>>();
                let mut body = json!({ "records": records });

                if let Some(tag_info) = tag_info {
                    body["tagInfo"] = json!(tag_info);
                }

                body
            }
            Self::WriteSucceeded => json!({}),
            Self::Error { message } => json!({ "message": message }),
        }
    }
}

#[uniffi::export]
fn nfc_event_name(event: NfcEvent) -> String {
    event.name().to_string()
}

#[uniffi::export]
fn nfc_event_json(event: NfcEvent) -> String {
    event.to_json().to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tag::TagTechnology;

    #[test]
    fn tag_detected_json() {
        let event = NfcEvent::TagDetected {
            records: vec![NdefRecord::text("Hi", "en")],
            tag_info: Some(TagDescriptor::from_technology(&TagTechnology::MiFare {
                identifier: vec![0x04, 0xA2],
            })),
        };

        assert_eq!(event.name(), "tagDetected");
        assert_eq!(
            event.to_json(),
            json!({
                "records": [{ "type": "T", "payload": "AmVuSGk=" }],
                "tagInfo": { "uid": "04A2", "techTypes": ["MiFare"], "type": "MIFARE" },
            })
        );
    }

    #[test]
    fn tag_detected_without_info() {
        let event = NfcEvent::TagDetected { records: vec![], tag_info: None };
        assert_eq!(event.to_json(), json!({ "records": [] }));
    }

    #[test]
    fn error_and_write_json() {
        assert_eq!(
            NfcEvent::error("Tag is read-only.").to_json(),
            json!({ "message": "Tag is read-only." })
        );
        assert_eq!(NfcEvent::WriteSucceeded.to_json(), json!({}));
        assert_eq!(nfc_event_name(NfcEvent::WriteSucceeded), "writeSucceeded");
    }

    #[test]
    fn wire_record_round_trips_through_serde() {
        let wire = WireRecord::from(&NdefRecord::uri("https://a.io"));
        let text = serde_json::to_string(&wire).unwrap();
        assert_eq!(serde_json::from_str::<WireRecord>(&text).unwrap(), wire);
    }
}
