//! Native session vocabulary shared by the reader and writer controllers
//!
//! The host reports native callbacks as [`SessionEvent`]s, controllers answer
//! with [`Effect`]s which the manager executes. Nothing in here talks to a
//! real NFC stack.

use std::time::Duration;

use nfc_macros::impl_display_via;
use nfc_ndef::NdefRecord;

use crate::{event::NfcEvent, tag::DetectedTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum SessionRole {
    Reader,
    Writer,
}

impl SessionRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
        }
    }
}

impl_display_via!(SessionRole, as_str);

/// Identifies one native session, ids are never reused within a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Record)]
pub struct SessionHandle {
    pub role: SessionRole,
    pub id: u64,
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.role, self.id)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SessionIds {
    role: SessionRole,
    next: u64,
}

impl SessionIds {
    pub fn new(role: SessionRole) -> Self {
        Self { role, next: 1 }
    }

    pub fn next_handle(&mut self) -> SessionHandle {
        let id = self.next;
        self.next += 1;
        SessionHandle { role: self.role, id }
    }

    pub fn next_token(&mut self) -> TimerToken {
        let token = TimerToken(self.next);
        self.next += 1;
        token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum PollingTarget {
    Iso14443,
    Iso15693,
    Iso18092,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum NdefStatus {
    NotSupported,
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NdefStatusOutcome {
    Queried { status: NdefStatus, capacity: u32 },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum NdefReadOutcome {
    /// An empty list means the tag has no NDEF content
    Read { records: Vec<NdefRecord> },
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum SessionErrorCode {
    UserCanceled,
    SessionTimeout,
    /// A one-shot NDEF session ended normally after its first read
    FirstNdefTagRead,
    SystemBusy,
    SecurityViolation,
    UnsupportedFeature,
    Other { code: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Record)]
pub struct SessionError {
    pub code: SessionErrorCode,
    pub message: String,
}

/// How a controller should react to a session ending on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Invalidation {
    Cancelled,
    Finished,
    MissingEntitlement,
    SystemBusy,
    Fatal,
}

impl SessionError {
    pub fn new(code: SessionErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub(crate) fn classify(&self) -> Invalidation {
        let message = self.message.to_ascii_lowercase();

        match self.code {
            SessionErrorCode::UserCanceled => Invalidation::Cancelled,
            SessionErrorCode::FirstNdefTagRead => Invalidation::Finished,
            SessionErrorCode::SecurityViolation => Invalidation::MissingEntitlement,
            _ if message.contains("entitlement") => Invalidation::MissingEntitlement,
            SessionErrorCode::SystemBusy => Invalidation::SystemBusy,
            _ if message.contains("busy") || message.contains("resource unavailable") => {
                Invalidation::SystemBusy
            }
            _ => Invalidation::Fatal,
        }
    }
}

/// Native callbacks, each tagged with the session it belongs to
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum SessionEvent {
    SessionBecameActive { session: SessionHandle },
    TagsDetected { session: SessionHandle, tags: Vec<DetectedTag> },
    TagConnected { session: SessionHandle, error: Option<String> },
    NdefStatusQueried { session: SessionHandle, outcome: NdefStatusOutcome },
    NdefRead { session: SessionHandle, outcome: NdefReadOutcome },
    NdefMessagesDetected { session: SessionHandle, messages: Vec<Vec<NdefRecord>> },
    NdefWritten { session: SessionHandle, error: Option<String> },
    SessionInvalidated { session: SessionHandle, error: SessionError },
}

impl SessionEvent {
    pub fn session(&self) -> SessionHandle {
        match self {
            Self::SessionBecameActive { session }
            | Self::TagsDetected { session, .. }
            | Self::TagConnected { session, .. }
            | Self::NdefStatusQueried { session, .. }
            | Self::NdefRead { session, .. }
            | Self::NdefMessagesDetected { session, .. }
            | Self::NdefWritten { session, .. }
            | Self::SessionInvalidated { session, .. } => *session,
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::SessionBecameActive { .. } => "session_became_active",
            Self::TagsDetected { .. } => "tags_detected",
            Self::TagConnected { .. } => "tag_connected",
            Self::NdefStatusQueried { .. } => "ndef_status_queried",
            Self::NdefRead { .. } => "ndef_read",
            Self::NdefMessagesDetected { .. } => "ndef_messages_detected",
            Self::NdefWritten { .. } => "ndef_written",
            Self::SessionInvalidated { .. } => "session_invalidated",
        }
    }
}

/// Calls into the native NFC stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    BeginTagSession { session: SessionHandle, polling: Vec<PollingTarget> },
    BeginNdefSession { session: SessionHandle },
    BeginWriteSession { session: SessionHandle },
    Invalidate { session: SessionHandle, message: Option<String> },
    RestartPolling { session: SessionHandle },
    Connect { session: SessionHandle, tag_id: u64 },
    QueryNdefStatus { session: SessionHandle, tag_id: u64 },
    ReadNdef { session: SessionHandle, tag_id: u64 },
    WriteNdef { session: SessionHandle, tag_id: u64, records: Vec<NdefRecord> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("timer#{_0}")]
pub struct TimerToken(pub(crate) u64);

/// Everything a controller asks its executor to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Native(SessionCommand),
    Schedule { token: TimerToken, delay: Duration },
    CancelTimer { token: TimerToken },
    Emit(NfcEvent),
}

pub type Effects = Vec<Effect>;
