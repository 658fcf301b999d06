//! Reader mode state machine
//!
//! Drives at most one native read session at a time, falling back from the
//! full tag reader to a limited one and finally to an NDEF only session when
//! the platform refuses the more capable reader.

mod fallback;
pub mod mode;

use std::time::Duration;

use nfc_ndef::NdefRecord;
use tracing::{debug, info, warn};

use crate::{
    config::NfcConfig,
    event::NfcEvent,
    session::{
        Effect, Effects, Invalidation, NdefReadOutcome, NdefStatus, NdefStatusOutcome,
        SessionCommand, SessionError, SessionEvent, SessionHandle, SessionIds, SessionRole,
        TimerToken,
    },
    tag::{DetectedTag, MISSING_ENTITLEMENT, TagDescriptor},
};

use fallback::FallbackSignature;

pub use mode::{ModeRequest, ReaderMode};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Starting,
    Polling,
    Connecting { tag: DetectedTag },
    QueryingStatus { tag_id: u64, descriptor: TagDescriptor },
    Reading { descriptor: TagDescriptor },
}

#[derive(Debug, Clone)]
struct ReaderSession {
    handle: SessionHandle,
    phase: Phase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    Restart,
    Repoll { session: SessionHandle },
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    token: TimerToken,
    action: TimerAction,
}

#[derive(Debug)]
pub struct ReaderController {
    config: NfcConfig,
    mode: ReaderMode,
    entitlement_failed: bool,
    fallback: FallbackSignature,
    session: Option<ReaderSession>,
    pending: Option<PendingTimer>,
    ids: SessionIds,
    busy_restarts: u32,
}

impl ReaderController {
    pub fn new(config: NfcConfig) -> Self {
        Self {
            config,
            mode: ReaderMode::FullTag,
            entitlement_failed: false,
            fallback: FallbackSignature::default(),
            session: None,
            pending: None,
            ids: SessionIds::new(SessionRole::Reader),
            busy_restarts: 0,
        }
    }

    pub fn mode(&self) -> ReaderMode {
        self.mode
    }

    pub fn entitlement_failed(&self) -> bool {
        self.entitlement_failed
    }

    pub fn active_session(&self) -> Option<SessionHandle> {
        self.session.as_ref().map(|session| session.handle)
    }

    pub fn has_pending_timer(&self) -> bool {
        self.pending.is_some()
    }

    /// Apply a mode override from the host, resets the fallback notice
    pub fn set_mode(&mut self, request: ModeRequest) {
        let mode = match request {
            ModeRequest::Full => {
                self.entitlement_failed = false;
                ReaderMode::FullTag
            }
            ModeRequest::Compat => ReaderMode::LimitedTag,
            ModeRequest::Ndef => ReaderMode::NdefFallback,
            // never climbs back above what the platform already refused
            ModeRequest::Auto if self.entitlement_failed => self.mode.max(ReaderMode::LimitedTag),
            ModeRequest::Auto => ReaderMode::FullTag,
        };

        debug!("reader mode {request} -> {mode}");
        self.mode = mode;
        self.fallback.clear();
    }

    /// Tear down whatever is running and begin a fresh session in the current mode
    pub fn start_scanning(&mut self) -> Effects {
        let mut effects = self.teardown();
        self.busy_restarts = 0;
        self.begin(&mut effects);
        effects
    }

    pub fn cancel_scanning(&mut self) -> Effects {
        let effects = self.teardown();
        self.fallback.clear();
        effects
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> Effects {
        let handle = event.session();
        if self.active_session() != Some(handle) {
            debug!("ignoring {} for inactive session {handle}", event.name());
            return Vec::new();
        }

        match event {
            SessionEvent::SessionBecameActive { .. } => self.session_became_active(),
            SessionEvent::TagsDetected { tags, .. } => self.tags_detected(tags),
            SessionEvent::TagConnected { error, .. } => self.tag_connected(error),
            SessionEvent::NdefStatusQueried { outcome, .. } => self.ndef_status_queried(outcome),
            SessionEvent::NdefRead { outcome, .. } => self.ndef_read(outcome),
            SessionEvent::NdefMessagesDetected { messages, .. } => {
                self.ndef_messages_detected(messages)
            }
            SessionEvent::NdefWritten { .. } => {
                warn!("reader session {handle} got a write completion, ignoring");
                Vec::new()
            }
            SessionEvent::SessionInvalidated { error, .. } => self.session_invalidated(error),
        }
    }

    pub fn timer_fired(&mut self, token: TimerToken) -> Effects {
        let Some(pending) = self.pending.filter(|pending| pending.token == token) else {
            debug!("ignoring stale {token}");
            return Vec::new();
        };

        self.pending = None;
        let mut effects = Vec::new();

        match pending.action {
            TimerAction::Restart => {
                if let Some(session) = self.session.take() {
                    effects.push(invalidate(session.handle, None));
                }

                info!("restarting reader in {} mode", self.mode);
                self.begin(&mut effects);
            }

            TimerAction::Repoll { session } => {
                let Some(current) = self.session.as_mut().filter(|s| s.handle == session) else {
                    debug!("re-poll for {session} no longer needed");
                    return effects;
                };

                current.phase = Phase::Polling;
                effects.push(Effect::Native(SessionCommand::RestartPolling { session }));
            }
        }

        effects
    }

    // private
    fn begin(&mut self, effects: &mut Effects) {
        if self.mode != ReaderMode::FullTag {
            self.notify_fallback(effects);
        }

        let handle = self.ids.next_handle();
        let command = match self.mode.polling_targets() {
            Some(polling) => SessionCommand::BeginTagSession { session: handle, polling },
            None => SessionCommand::BeginNdefSession { session: handle },
        };

        debug!("beginning reader session {handle} in {} mode", self.mode);
        self.session = Some(ReaderSession { handle, phase: Phase::Starting });
        effects.push(Effect::Native(command));
    }

    /// Cancels the pending timer before ending the session
    fn teardown(&mut self) -> Effects {
        let mut effects = Vec::new();

        if let Some(pending) = self.pending.take() {
            effects.push(Effect::CancelTimer { token: pending.token });
        }

        if let Some(session) = self.session.take() {
            effects.push(invalidate(session.handle, None));
        }

        effects
    }

    fn reason(&self) -> Option<String> {
        self.entitlement_failed.then(|| MISSING_ENTITLEMENT.to_string())
    }

    fn notify_fallback(&mut self, effects: &mut Effects) {
        let reason = self.reason();
        if !self.fallback.should_notify(self.mode, reason.as_deref()) {
            return;
        }

        info!("reader running in {} mode (reason: {reason:?})", self.mode);
        let tag_info = TagDescriptor::fallback(self.mode, reason);
        let notice = NfcEvent::TagDetected { records: Vec::new(), tag_info: Some(tag_info) };
        effects.push(Effect::Emit(notice));
    }

    fn schedule(&mut self, action: TimerAction, delay: Duration, effects: &mut Effects) {
        if let Some(previous) = self.pending.take() {
            effects.push(Effect::CancelTimer { token: previous.token });
        }

        let token = self.ids.next_token();
        self.pending = Some(PendingTimer { token, action });
        effects.push(Effect::Schedule { token, delay });
    }

    fn cancel_repoll(&mut self, effects: &mut Effects) {
        let repoll = self.pending.take_if(|p| matches!(p.action, TimerAction::Repoll { .. }));
        if let Some(pending) = repoll {
            effects.push(Effect::CancelTimer { token: pending.token });
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(session) = self.session.as_mut() {
            session.phase = phase;
        }
    }

    /// Takes the phase out of the live session when `expected` matches, leaving it `Polling`
    fn take_phase(&mut self, expected: fn(&Phase) -> bool) -> Option<(SessionHandle, Phase)> {
        let session = self.session.as_mut().filter(|session| expected(&session.phase))?;
        let phase = std::mem::replace(&mut session.phase, Phase::Polling);
        Some((session.handle, phase))
    }

    fn end_session(&mut self, message: Option<String>, effects: &mut Effects) {
        self.cancel_repoll(effects);
        if let Some(session) = self.session.take() {
            effects.push(invalidate(session.handle, message));
        }
    }

    fn finish(&mut self, records: Vec<NdefRecord>, descriptor: TagDescriptor) -> Effects {
        let mut effects = Vec::new();
        self.end_session(None, &mut effects);

        info!("tag read with {} records", records.len());
        effects.push(Effect::Emit(NfcEvent::TagDetected { records, tag_info: Some(descriptor) }));
        effects
    }

    fn fail(&mut self, message: String) -> Effects {
        warn!("reader failed: {message}");

        let mut effects = Vec::new();
        self.end_session(Some(message.clone()), &mut effects);
        effects.push(Effect::Emit(NfcEvent::Error { message }));
        effects
    }

    fn session_became_active(&mut self) -> Effects {
        let mut effects = Vec::new();
        self.busy_restarts = 0;

        if let Some(session) = self.session.as_mut()
            && session.phase == Phase::Starting
        {
            session.phase = Phase::Polling;
        }

        if self.mode != ReaderMode::FullTag {
            self.notify_fallback(&mut effects);
        }

        effects
    }

    fn tags_detected(&mut self, mut tags: Vec<DetectedTag>) -> Effects {
        let mut effects = Vec::new();
        let Some(handle) = self
            .session
            .as_ref()
            .filter(|session| matches!(session.phase, Phase::Starting | Phase::Polling))
            .map(|session| session.handle)
        else {
            warn!("tags detected while a tag is being handled, ignoring");
            return effects;
        };

        match tags.len() {
            0 => debug!("tag detection reported no tags"),
            1 => {
                let tag = tags.remove(0);
                debug!("connecting to {} tag {}", tag.technology.tech_name(), tag.tag_id);

                // a re-poll landing now would drop the connection
                self.cancel_repoll(&mut effects);

                let tag_id = tag.tag_id;
                effects.push(Effect::Native(SessionCommand::Connect { session: handle, tag_id }));
                self.set_phase(Phase::Connecting { tag });
            }
            count => {
                info!("{count} tags in the field, polling again");
                let delay = self.config.multi_tag_repoll_delay();
                self.schedule(TimerAction::Repoll { session: handle }, delay, &mut effects);
            }
        }

        effects
    }

    fn tag_connected(&mut self, error: Option<String>) -> Effects {
        let Some((handle, Phase::Connecting { tag })) =
            self.take_phase(|phase| matches!(phase, Phase::Connecting { .. }))
        else {
            warn!("unexpected tag connection, ignoring");
            return Vec::new();
        };

        if let Some(error) = error {
            return self.fail(format!("Connection error: {error}"));
        }

        let descriptor = TagDescriptor::from_technology(&tag.technology);
        if !tag.technology.supports_ndef_query() {
            debug!("{} tag has no NDEF support", tag.technology.tech_name());
            return self.finish(Vec::new(), descriptor);
        }

        let tag_id = tag.tag_id;
        self.set_phase(Phase::QueryingStatus { tag_id, descriptor });
        vec![Effect::Native(SessionCommand::QueryNdefStatus { session: handle, tag_id })]
    }

    fn ndef_status_queried(&mut self, outcome: NdefStatusOutcome) -> Effects {
        let Some((handle, Phase::QueryingStatus { tag_id, mut descriptor })) =
            self.take_phase(|phase| matches!(phase, Phase::QueryingStatus { .. }))
        else {
            warn!("unexpected NDEF status, ignoring");
            return Vec::new();
        };

        let (status, capacity) = match outcome {
            NdefStatusOutcome::Queried { status, capacity } => (status, capacity),
            NdefStatusOutcome::Failed { message } => {
                return self.fail(format!("Failed to query NDEF status: {message}"));
            }
        };

        descriptor.merge_ndef_status(status, capacity);
        if status == NdefStatus::NotSupported {
            return self.finish(Vec::new(), descriptor);
        }

        self.set_phase(Phase::Reading { descriptor });
        vec![Effect::Native(SessionCommand::ReadNdef { session: handle, tag_id })]
    }

    fn ndef_read(&mut self, outcome: NdefReadOutcome) -> Effects {
        let Some((_, Phase::Reading { descriptor })) =
            self.take_phase(|phase| matches!(phase, Phase::Reading { .. }))
        else {
            warn!("unexpected NDEF read, ignoring");
            return Vec::new();
        };

        match outcome {
            NdefReadOutcome::Read { records } => self.finish(records, descriptor),
            NdefReadOutcome::Failed { message } => {
                warn!("reading NDEF message failed, reporting an empty tag: {message}");
                self.finish(Vec::new(), descriptor)
            }
        }
    }

    fn ndef_messages_detected(&mut self, messages: Vec<Vec<NdefRecord>>) -> Effects {
        let records = messages.into_iter().flatten().collect::<Vec<_>>();
        let descriptor = TagDescriptor::fallback(self.mode, self.reason());
        self.finish(records, descriptor)
    }

    fn session_invalidated(&mut self, error: SessionError) -> Effects {
        let mut effects = Vec::new();

        // the native side already ended it
        self.cancel_repoll(&mut effects);
        self.session = None;

        match error.classify() {
            Invalidation::Cancelled | Invalidation::Finished => {
                debug!("reader session ended: {}", error.message);
            }

            Invalidation::MissingEntitlement => match self.mode.downgrade() {
                Some(next) => {
                    let mode = self.mode;
                    warn!("{mode} reader unavailable ({}), falling back to {next}", error.message);
                    self.entitlement_failed = true;
                    self.mode = next;
                    self.notify_fallback(&mut effects);

                    let delay = self.config.entitlement_restart_delay();
                    self.schedule(TimerAction::Restart, delay, &mut effects);
                }
                None => effects.push(Effect::Emit(NfcEvent::error(error.message))),
            },

            Invalidation::SystemBusy => {
                let exhausted =
                    self.config.max_busy_restarts.is_some_and(|max| self.busy_restarts >= max);

                if exhausted {
                    warn!("giving up after {} busy restarts", self.busy_restarts);
                    effects.push(Effect::Emit(NfcEvent::error(error.message)));
                } else {
                    self.busy_restarts += 1;
                    info!("NFC system busy, restarting (attempt {})", self.busy_restarts);

                    let delay = self.config.busy_restart_delay();
                    self.schedule(TimerAction::Restart, delay, &mut effects);
                }
            }

            Invalidation::Fatal => {
                warn!("reader session invalidated: {}", error.message);
                effects.push(Effect::Emit(NfcEvent::error(error.message)));
            }
        }

        effects
    }
}

fn invalidate(session: SessionHandle, message: Option<String>) -> Effect {
    Effect::Native(SessionCommand::Invalidate { session, message })
}
