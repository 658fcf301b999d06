//! Android tag dispatch
//!
//! Android hands the app a tag per discovery intent instead of running a
//! session, so the only state here is whether a write is armed.

use nfc_macros::impl_default_for;
use nfc_ndef::{NdefRecord, NdefType, encode_message, parse_message};
use nfc_util::{hex_preview, hex_upper};
use tracing::{debug, warn};

use crate::{event::NfcEvent, tag::TagDescriptor};

/// What the platform layer saw when a tag was discovered
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct AndroidTagIntent {
    pub identifier: Vec<u8>,
    /// Fully qualified technology class names, e.g. `android.nfc.tech.NfcA`
    pub tech_list: Vec<String>,
    pub ndef_message: Option<Vec<u8>>,
    pub max_size: Option<u32>,
    pub is_writable: Option<bool>,
    pub tag_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum AndroidTagAction {
    /// The tag was reported to listeners
    Reported,
    /// Write this serialized message to the tag, then call `android_write_finished`
    Write { message: Vec<u8> },
}

#[derive(Debug)]
pub struct AndroidDispatcher {
    pending_write: Option<Vec<u8>>,
}

impl_default_for!(AndroidDispatcher);

impl AndroidDispatcher {
    pub fn new() -> Self {
        Self { pending_write: None }
    }

    pub fn has_pending_write(&self) -> bool {
        self.pending_write.is_some()
    }

    /// Arm a write for the next discovered tag
    pub fn begin_write(&mut self, records: &[NdefRecord]) -> Result<(), nfc_ndef::NdefError> {
        let message = encode_message(records)?;
        debug!("armed write of {}", hex_preview(&message, 16));

        if self.pending_write.replace(message).is_some() {
            debug!("replaced a pending write");
        }

        Ok(())
    }

    /// Returns false when there was nothing to cancel
    pub fn cancel_write(&mut self) -> bool {
        self.pending_write.take().is_some()
    }

    pub fn tag_discovered(
        &mut self,
        intent: AndroidTagIntent,
    ) -> (AndroidTagAction, Option<NfcEvent>) {
        if let Some(message) = &self.pending_write {
            debug!("tag {} discovered with a write pending", hex_upper(&intent.identifier));
            return (AndroidTagAction::Write { message: message.clone() }, None);
        }

        let records = match intent.ndef_message.as_deref() {
            Some(bytes) => parse_message(bytes).unwrap_or_else(|error| {
                warn!("unable to parse NDEF message ({error}), reporting an empty tag");
                Vec::new()
            }),
            None => Vec::new(),
        };

        // a formatted but blank tag carries a single empty record
        let records = records
            .into_iter()
            .filter(|record| record.type_name_format != NdefType::Empty)
            .collect();

        let tag_info = Some(descriptor(intent));
        (AndroidTagAction::Reported, Some(NfcEvent::TagDetected { records, tag_info }))
    }

    pub fn write_finished(&mut self, error: Option<String>) -> NfcEvent {
        if self.pending_write.take().is_none() {
            warn!("write finished without a pending write");
        }

        match error {
            None => NfcEvent::WriteSucceeded,
            Some(error) => NfcEvent::error(format!("Failed to write NDEF message: {error}")),
        }
    }
}

fn descriptor(intent: AndroidTagIntent) -> TagDescriptor {
    let tech_types = intent
        .tech_list
        .iter()
        .map(|tech| tech.rsplit('.').next().unwrap_or(tech).to_string())
        .collect();

    TagDescriptor {
        uid: hex_upper(&intent.identifier),
        tech_types,
        max_size: intent.max_size,
        is_writable: intent.is_writable,
        tag_type: intent.tag_type,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn intent(ndef_message: Option<Vec<u8>>) -> AndroidTagIntent {
        AndroidTagIntent {
            identifier: vec![0x04, 0x1F],
            tech_list: vec!["android.nfc.tech.NfcA".into(), "android.nfc.tech.Ndef".into()],
            ndef_message,
            max_size: Some(137),
            is_writable: Some(true),
            tag_type: Some("org.nfcforum.ndef.type2".into()),
        }
    }

    #[test]
    fn reports_parsed_records() {
        let mut dispatcher = AndroidDispatcher::new();
        let message = encode_message(&[NdefRecord::uri("https://a.io")]).unwrap();

        let (action, event) = dispatcher.tag_discovered(intent(Some(message)));
        assert_eq!(action, AndroidTagAction::Reported);

        let Some(NfcEvent::TagDetected { records, tag_info: Some(info) }) = event else {
            panic!("unexpected event {event:?}");
        };

        assert_eq!(records, vec![NdefRecord::uri("https://a.io")]);
        assert_eq!(info.uid, "041F");
        assert_eq!(info.tech_types, vec!["NfcA", "Ndef"]);
        assert_eq!(info.max_size, Some(137));
        assert_eq!(info.is_writable, Some(true));
    }

    #[test]
    fn blank_and_garbled_tags_report_no_records() {
        let mut dispatcher = AndroidDispatcher::new();

        for message in [None, Some(vec![0xD0, 0x00, 0x00]), Some(vec![0xD1, 0x01])] {
            let (_, event) = dispatcher.tag_discovered(intent(message));
            let Some(NfcEvent::TagDetected { records, .. }) = event else {
                panic!("unexpected event {event:?}");
            };
            assert!(records.is_empty());
        }
    }

    #[test]
    fn pending_write_takes_the_tag() {
        let mut dispatcher = AndroidDispatcher::new();
        let records = vec![NdefRecord::text("hi", "en")];
        dispatcher.begin_write(&records).unwrap();

        let (action, event) = dispatcher.tag_discovered(intent(None));
        assert_eq!(action, AndroidTagAction::Write { message: encode_message(&records).unwrap() });
        assert_eq!(event, None);

        assert_eq!(dispatcher.write_finished(None), NfcEvent::WriteSucceeded);
        assert!(!dispatcher.has_pending_write());
    }

    #[test]
    fn write_failure_and_cancel() {
        let mut dispatcher = AndroidDispatcher::new();
        assert!(!dispatcher.cancel_write());

        dispatcher.begin_write(&[NdefRecord::text("hi", "en")]).unwrap();
        assert_eq!(
            dispatcher.write_finished(Some("IOException".into())),
            NfcEvent::error("Failed to write NDEF message: IOException")
        );

        dispatcher.begin_write(&[NdefRecord::text("hi", "en")]).unwrap();
        assert!(dispatcher.cancel_write());
        assert!(!dispatcher.has_pending_write());
    }
}
