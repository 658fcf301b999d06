use std::time::Duration;

use serde::Deserialize;

use crate::{manager::NfcManagerError, options::from_json_object};

/// Tunables for the session controllers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(default, rename_all = "camelCase")]
pub struct NfcConfig {
    /// Delay before restarting in a lower mode after an entitlement failure
    pub entitlement_restart_delay_ms: u64,
    /// Delay before restarting after the system reported it was busy
    pub busy_restart_delay_ms: u64,
    /// Delay before polling again when several tags were in the field
    pub multi_tag_repoll_delay_ms: u64,
    /// Consecutive busy restarts allowed before giving up, unbounded when unset
    pub max_busy_restarts: Option<u32>,
    /// Language code for Well-Known Text records built from plain strings
    pub text_language: String,
}

impl Default for NfcConfig {
    fn default() -> Self {
        Self {
            entitlement_restart_delay_ms: 250,
            busy_restart_delay_ms: 350,
            multi_tag_repoll_delay_ms: 500,
            max_busy_restarts: None,
            text_language: nfc_ndef::payload::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl NfcConfig {
    pub fn from_json(json: &str) -> Result<Self, NfcManagerError> {
        from_json_object(json)
    }

    pub fn entitlement_restart_delay(&self) -> Duration {
        Duration::from_millis(self.entitlement_restart_delay_ms)
    }

    pub fn busy_restart_delay(&self) -> Duration {
        Duration::from_millis(self.busy_restart_delay_ms)
    }

    pub fn multi_tag_repoll_delay(&self) -> Duration {
        Duration::from_millis(self.multi_tag_repoll_delay_ms)
    }
}

#[uniffi::export]
fn nfc_config_from_json(json: String) -> Result<NfcConfig, NfcManagerError> {
    NfcConfig::from_json(&json)
}
