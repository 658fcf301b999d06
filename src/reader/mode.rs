use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};

use crate::session::PollingTarget;

/// Reader capability, ordered from most to least capable
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    IntoStaticStr,
    uniffi::Enum,
)]
pub enum ReaderMode {
    /// Raw tag session polling every supported technology
    #[serde(rename = "full")]
    #[strum(serialize = "full")]
    FullTag,

    /// Raw tag session polling ISO 14443 only
    #[serde(rename = "compat")]
    #[strum(serialize = "compat")]
    LimitedTag,

    /// NDEF only session, no tag identity or capacity
    #[serde(rename = "ndef")]
    #[strum(serialize = "ndef")]
    NdefFallback,
}

impl ReaderMode {
    /// The next mode down, `None` once there is nothing left to try
    pub const fn downgrade(self) -> Option<Self> {
        match self {
            Self::FullTag => Some(Self::LimitedTag),
            Self::LimitedTag => Some(Self::NdefFallback),
            Self::NdefFallback => None,
        }
    }

    /// Technologies polled by a raw tag session, `None` for the NDEF only session
    pub fn polling_targets(self) -> Option<Vec<PollingTarget>> {
        match self {
            Self::FullTag => Some(vec![
                PollingTarget::Iso14443,
                PollingTarget::Iso15693,
                PollingTarget::Iso18092,
            ]),
            Self::LimitedTag => Some(vec![PollingTarget::Iso14443]),
            Self::NdefFallback => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// What the host asked for when starting a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, uniffi::Enum)]
#[strum(ascii_case_insensitive)]
pub enum ModeRequest {
    #[strum(serialize = "auto")]
    Auto,

    #[strum(serialize = "full")]
    Full,

    #[strum(serialize = "compat", serialize = "limited")]
    Compat,

    #[strum(serialize = "ndef")]
    Ndef,
}
