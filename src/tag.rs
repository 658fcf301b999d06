//! Tag identity and descriptor reported alongside read records

use nfc_util::hex_upper;
use serde::Serialize;

use crate::{reader::ReaderMode, session::NdefStatus};

/// Reason attached to fallback descriptors once the full reader was refused
pub const MISSING_ENTITLEMENT: &str = "missing-entitlement";

#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum TagTechnology {
    Iso7816 { identifier: Vec<u8> },
    MiFare { identifier: Vec<u8> },
    FeliCa { current_idm: Vec<u8> },
    Iso15693 { identifier: Vec<u8> },
    Unknown,
}

impl TagTechnology {
    pub fn identifier(&self) -> &[u8] {
        match self {
            Self::Iso7816 { identifier }
            | Self::MiFare { identifier }
            | Self::Iso15693 { identifier } => identifier,
            Self::FeliCa { current_idm } => current_idm,
            Self::Unknown => &[],
        }
    }

    pub const fn tech_name(&self) -> &'static str {
        match self {
            Self::Iso7816 { .. } => "ISO7816",
            Self::MiFare { .. } => "MiFare",
            Self::FeliCa { .. } => "FeliCa",
            Self::Iso15693 { .. } => "ISO15693",
            Self::Unknown => "Unknown",
        }
    }

    pub const fn type_label(&self) -> Option<&'static str> {
        match self {
            Self::Iso7816 { .. } => Some("ISO 7816"),
            Self::MiFare { .. } => Some("MIFARE"),
            Self::FeliCa { .. } => Some("FeliCa"),
            Self::Iso15693 { .. } => Some("ISO 15693"),
            Self::Unknown => None,
        }
    }

    /// Whether the NDEF status of this kind of tag can be queried
    pub const fn supports_ndef_query(&self) -> bool {
        matches!(self, Self::MiFare { .. } | Self::FeliCa { .. } | Self::Iso15693 { .. })
    }
}

/// A tag found by a polling session, `tag_id` is the host's handle for it
#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Record)]
pub struct DetectedTag {
    pub tag_id: u64,
    pub technology: TagTechnology,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct TagDescriptor {
    /// Uppercase hex, empty when no tag identity is known
    pub uid: String,
    pub tech_types: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_writable: Option<bool>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_mode: Option<ReaderMode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TagDescriptor {
    pub fn from_technology(technology: &TagTechnology) -> Self {
        Self {
            uid: hex_upper(technology.identifier()),
            tech_types: vec![technology.tech_name().to_string()],
            tag_type: technology.type_label().map(str::to_string),
            ..Default::default()
        }
    }

    /// Descriptor sent with the notice that the reader is running below full capability
    pub fn fallback(mode: ReaderMode, reason: Option<String>) -> Self {
        Self { fallback: Some(true), fallback_mode: Some(mode), reason, ..Default::default() }
    }

    pub fn merge_ndef_status(&mut self, status: NdefStatus, capacity: u32) {
        self.max_size = Some(capacity);
        self.is_writable = Some(status == NdefStatus::ReadWrite);
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback == Some(true)
    }
}
