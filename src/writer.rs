//! Writer mode state machine, one NDEF message written to one tag

use nfc_ndef::NdefRecord;
use tracing::{debug, info, warn};

use crate::{
    config::NfcConfig,
    event::NfcEvent,
    session::{
        Effect, Effects, Invalidation, NdefStatus, NdefStatusOutcome, SessionCommand,
        SessionError, SessionEvent, SessionHandle, SessionIds, SessionRole, TimerToken,
    },
    tag::DetectedTag,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Starting,
    Polling,
    Connecting { tag_id: u64 },
    QueryingStatus { tag_id: u64 },
    Writing,
}

#[derive(Debug, Clone, Copy)]
struct WriterSession {
    handle: SessionHandle,
    phase: Phase,
}

#[derive(Debug)]
pub struct WriterController {
    config: NfcConfig,
    message: Option<Vec<NdefRecord>>,
    session: Option<WriterSession>,
    repoll: Option<TimerToken>,
    ids: SessionIds,
}

impl WriterController {
    pub fn new(config: NfcConfig) -> Self {
        Self {
            config,
            message: None,
            session: None,
            repoll: None,
            ids: SessionIds::new(SessionRole::Writer),
        }
    }

    pub fn active_session(&self) -> Option<SessionHandle> {
        self.session.map(|session| session.handle)
    }

    pub fn has_pending_message(&self) -> bool {
        self.message.is_some()
    }

    /// Replace any running write with a new session for `records`
    pub fn start_writing(&mut self, records: Vec<NdefRecord>) -> Effects {
        let mut effects = self.teardown();

        let handle = self.ids.next_handle();
        debug!("beginning write session {handle} with {} records", records.len());

        self.message = Some(records);
        self.session = Some(WriterSession { handle, phase: Phase::Starting });
        effects.push(Effect::Native(SessionCommand::BeginWriteSession { session: handle }));
        effects
    }

    pub fn cancel_writing(&mut self) -> Effects {
        self.message = None;
        self.teardown()
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> Effects {
        let handle = event.session();
        let Some(session) = self.session.filter(|session| session.handle == handle) else {
            debug!("ignoring {} for inactive session {handle}", event.name());
            return Vec::new();
        };

        match (session.phase, event) {
            (Phase::Starting, SessionEvent::SessionBecameActive { .. }) => {
                self.set_phase(Phase::Polling);
                Vec::new()
            }

            (Phase::Starting | Phase::Polling, SessionEvent::TagsDetected { tags, .. }) => {
                self.tags_detected(handle, tags)
            }

            (Phase::Connecting { tag_id }, SessionEvent::TagConnected { error, .. }) => {
                if let Some(error) = error {
                    return self.fail(format!("Connection error: {error}"));
                }

                self.set_phase(Phase::QueryingStatus { tag_id });
                vec![Effect::Native(SessionCommand::QueryNdefStatus { session: handle, tag_id })]
            }

            (Phase::QueryingStatus { tag_id }, SessionEvent::NdefStatusQueried { outcome, .. }) => {
                self.ndef_status_queried(handle, tag_id, outcome)
            }

            (Phase::Writing, SessionEvent::NdefWritten { error: Some(error), .. }) => {
                self.fail(format!("Failed to write NDEF message: {error}"))
            }

            (Phase::Writing, SessionEvent::NdefWritten { error: None, .. }) => {
                info!("NDEF message written");

                let mut effects = self.teardown();
                effects.push(Effect::Emit(NfcEvent::WriteSucceeded));
                effects
            }

            (_, SessionEvent::SessionInvalidated { error, .. }) => self.session_invalidated(error),

            (phase, event) => {
                warn!("writer ignoring {} while {phase:?}", event.name());
                Vec::new()
            }
        }
    }

    pub fn timer_fired(&mut self, token: TimerToken) -> Effects {
        if self.repoll != Some(token) {
            debug!("ignoring stale {token}");
            return Vec::new();
        }

        self.repoll = None;
        let Some(session) = self.session else { return Vec::new() };

        self.set_phase(Phase::Polling);
        vec![Effect::Native(SessionCommand::RestartPolling { session: session.handle })]
    }

    // private
    fn set_phase(&mut self, phase: Phase) {
        if let Some(session) = self.session.as_mut() {
            session.phase = phase;
        }
    }

    fn cancel_repoll(&mut self, effects: &mut Effects) {
        if let Some(token) = self.repoll.take() {
            effects.push(Effect::CancelTimer { token });
        }
    }

    fn teardown(&mut self) -> Effects {
        let mut effects = Vec::new();
        self.cancel_repoll(&mut effects);

        if let Some(session) = self.session.take() {
            effects.push(Effect::Native(SessionCommand::Invalidate {
                session: session.handle,
                message: None,
            }));
        }

        effects
    }

    fn fail(&mut self, message: String) -> Effects {
        warn!("write failed: {message}");

        let mut effects = Vec::new();
        self.cancel_repoll(&mut effects);
        self.message = None;

        if let Some(session) = self.session.take() {
            effects.push(Effect::Native(SessionCommand::Invalidate {
                session: session.handle,
                message: Some(message.clone()),
            }));
        }

        effects.push(Effect::Emit(NfcEvent::Error { message }));
        effects
    }

    fn tags_detected(&mut self, handle: SessionHandle, tags: Vec<DetectedTag>) -> Effects {
        let mut effects = Vec::new();

        match tags.as_slice() {
            [] => debug!("tag detection reported no tags"),
            [tag] => {
                self.set_phase(Phase::Connecting { tag_id: tag.tag_id });
                effects.push(Effect::Native(SessionCommand::Connect {
                    session: handle,
                    tag_id: tag.tag_id,
                }));
            }
            tags => {
                info!("{} tags in the field, polling again", tags.len());
                self.set_phase(Phase::Polling);
                self.cancel_repoll(&mut effects);

                let token = self.ids.next_token();
                self.repoll = Some(token);
                let delay = self.config.multi_tag_repoll_delay();
                effects.push(Effect::Schedule { token, delay });
            }
        }

        effects
    }

    fn ndef_status_queried(
        &mut self,
        handle: SessionHandle,
        tag_id: u64,
        outcome: NdefStatusOutcome,
    ) -> Effects {
        let status = match outcome {
            NdefStatusOutcome::Queried { status, capacity } => {
                debug!("tag status {status:?}, capacity {capacity}");
                status
            }
            NdefStatusOutcome::Failed { message } => {
                return self.fail(format!("Failed to query tag: {message}"));
            }
        };

        match status {
            NdefStatus::NotSupported => self.fail("Tag is not NDEF compliant.".to_string()),
            NdefStatus::ReadOnly => self.fail("Tag is read-only.".to_string()),
            NdefStatus::ReadWrite => match self.message.take() {
                None => self.fail("No NDEF message to write.".to_string()),
                Some(records) => {
                    self.set_phase(Phase::Writing);
                    let command = SessionCommand::WriteNdef { session: handle, tag_id, records };
                    vec![Effect::Native(command)]
                }
            },
        }
    }

    fn session_invalidated(&mut self, error: SessionError) -> Effects {
        let mut effects = Vec::new();
        self.cancel_repoll(&mut effects);
        self.session = None;
        self.message = None;

        match error.classify() {
            Invalidation::Cancelled | Invalidation::Finished => {
                debug!("write session ended: {}", error.message);
            }
            _ => {
                warn!("write session invalidated: {}", error.message);
                effects.push(Effect::Emit(NfcEvent::error(error.message)));
            }
        }

        effects
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{session::SessionErrorCode, tag::TagTechnology};

    fn records() -> Vec<NdefRecord> {
        vec![NdefRecord::text("hello", "en")]
    }

    fn tag(tag_id: u64) -> DetectedTag {
        DetectedTag { tag_id, technology: TagTechnology::Iso15693 { identifier: vec![0xE0, 0x04] } }
    }

    /// Start a write and walk it up to the status query
    fn connected() -> (WriterController, SessionHandle) {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let session = writer.active_session().unwrap();

        writer.handle_event(SessionEvent::SessionBecameActive { session });
        writer.handle_event(SessionEvent::TagsDetected { session, tags: vec![tag(5)] });
        let effects = writer.handle_event(SessionEvent::TagConnected { session, error: None });
        assert_eq!(
            effects,
            vec![Effect::Native(SessionCommand::QueryNdefStatus { session, tag_id: 5 })]
        );

        (writer, session)
    }

    fn status(session: SessionHandle, status: NdefStatus) -> SessionEvent {
        SessionEvent::NdefStatusQueried {
            session,
            outcome: NdefStatusOutcome::Queried { status, capacity: 256 },
        }
    }

    fn fails_with(effects: &[Effect], session: SessionHandle, message: &str) {
        assert_eq!(
            effects,
            &[
                Effect::Native(SessionCommand::Invalidate {
                    session,
                    message: Some(message.to_string())
                }),
                Effect::Emit(NfcEvent::error(message)),
            ]
        );
    }

    #[test]
    fn successful_write() {
        let (mut writer, session) = connected();

        let effects = writer.handle_event(status(session, NdefStatus::ReadWrite));
        assert_eq!(
            effects,
            vec![Effect::Native(SessionCommand::WriteNdef {
                session,
                tag_id: 5,
                records: records(),
            })]
        );

        let effects = writer.handle_event(SessionEvent::NdefWritten { session, error: None });
        assert_eq!(
            effects,
            vec![
                Effect::Native(SessionCommand::Invalidate { session, message: None }),
                Effect::Emit(NfcEvent::WriteSucceeded),
            ]
        );
        assert_eq!(writer.active_session(), None);
    }

    #[test]
    fn read_only_tag() {
        let (mut writer, session) = connected();
        let effects = writer.handle_event(status(session, NdefStatus::ReadOnly));
        fails_with(&effects, session, "Tag is read-only.");
        assert!(!writer.has_pending_message());
    }

    #[test]
    fn not_ndef_compliant() {
        let (mut writer, session) = connected();
        let effects = writer.handle_event(status(session, NdefStatus::NotSupported));
        fails_with(&effects, session, "Tag is not NDEF compliant.");
    }

    #[test]
    fn write_error() {
        let (mut writer, session) = connected();
        writer.handle_event(status(session, NdefStatus::ReadWrite));

        let effects = writer.handle_event(SessionEvent::NdefWritten {
            session,
            error: Some("Tag response error".into()),
        });
        fails_with(&effects, session, "Failed to write NDEF message: Tag response error");
    }

    #[test]
    fn connection_error() {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let session = writer.active_session().unwrap();
        writer.handle_event(SessionEvent::TagsDetected { session, tags: vec![tag(1)] });

        let effects =
            writer.handle_event(SessionEvent::TagConnected { session, error: Some("lost".into()) });
        fails_with(&effects, session, "Connection error: lost");
    }

    #[test]
    fn multiple_tags_repoll() {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let session = writer.active_session().unwrap();

        let effects = writer
            .handle_event(SessionEvent::TagsDetected { session, tags: vec![tag(1), tag(2)] });
        let [Effect::Schedule { token, delay }] = effects.as_slice() else {
            panic!("unexpected effects {effects:?}");
        };
        assert_eq!(*delay, Duration::from_millis(500));

        let effects = writer.timer_fired(*token);
        assert_eq!(effects, vec![Effect::Native(SessionCommand::RestartPolling { session })]);

        let effects =
            writer.handle_event(SessionEvent::TagsDetected { session, tags: vec![tag(2)] });
        assert_eq!(effects, vec![Effect::Native(SessionCommand::Connect { session, tag_id: 2 })]);
    }

    #[test]
    fn restart_replaces_previous_session() {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let first = writer.active_session().unwrap();

        let effects = writer.start_writing(vec![NdefRecord::uri("https://a.io")]);
        let second = writer.active_session().unwrap();

        assert_eq!(
            effects,
            vec![
                Effect::Native(SessionCommand::Invalidate { session: first, message: None }),
                Effect::Native(SessionCommand::BeginWriteSession { session: second }),
            ]
        );

        // events for the first session no longer count
        let effects = writer
            .handle_event(SessionEvent::TagsDetected { session: first, tags: vec![tag(1)] });
        assert_eq!(effects, vec![]);
    }

    #[test]
    fn cancel_drops_message() {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let session = writer.active_session().unwrap();

        let effects = writer.cancel_writing();
        assert_eq!(
            effects,
            vec![Effect::Native(SessionCommand::Invalidate { session, message: None })]
        );
        assert!(!writer.has_pending_message());
        assert_eq!(writer.active_session(), None);
    }

    #[test]
    fn user_cancel_is_silent() {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let session = writer.active_session().unwrap();

        let effects = writer.handle_event(SessionEvent::SessionInvalidated {
            session,
            error: SessionError::new(SessionErrorCode::UserCanceled, "Session invalidated by user"),
        });

        assert_eq!(effects, vec![]);
        assert!(!writer.has_pending_message());
    }

    #[test]
    fn timeout_is_an_error() {
        let mut writer = WriterController::new(NfcConfig::default());
        writer.start_writing(records());
        let session = writer.active_session().unwrap();

        let effects = writer.handle_event(SessionEvent::SessionInvalidated {
            session,
            error: SessionError::new(SessionErrorCode::SessionTimeout, "Session timeout"),
        });

        assert_eq!(effects, vec![Effect::Emit(NfcEvent::error("Session timeout"))]);
    }
}
