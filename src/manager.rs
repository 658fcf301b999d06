//! `RustNfcManager`, the object the host platform holds on to
//!
//! Controllers are locked only while they compute effects, the effects are
//! executed after the lock is released so driver calls may re-enter.

use std::sync::{Arc, Weak};

use flume::{Receiver, Sender};
use nfc_ndef::NdefRecord;
use nfc_tokio::DelayedTask;
use nfc_util::ResultExt as _;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    android::{AndroidDispatcher, AndroidTagAction, AndroidTagIntent},
    config::NfcConfig,
    event::NfcEvent,
    options::{ScanOptions, WriteOptions},
    reader::{ReaderController, ReaderMode},
    session::{
        Effect, Effects, PollingTarget, SessionCommand, SessionEvent, SessionHandle, SessionRole,
        TimerToken,
    },
    writer::WriterController,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum NfcPlatform {
    Ios,
    Android,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, uniffi::Error, thiserror::Error)]
pub enum NfcManagerError {
    #[error("invalid scan mode: {0}")]
    InvalidScanMode(String),

    #[error("no records to write")]
    EmptyMessage,

    #[error("record {index} is missing its {field}")]
    MissingRecordField { index: u32, field: String },

    #[error("unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    #[error("invalid options: {0}")]
    InvalidJson(String),

    #[error("{0} is not implemented on this platform")]
    Unimplemented(String),

    #[error("no pending write to cancel")]
    NoPendingWrite,

    #[error("unable to encode NDEF message: {0}")]
    Encoding(String),
}

pub type Error = NfcManagerError;

/// The platform NFC stack, implemented by the host
#[uniffi::export(callback_interface)]
pub trait NfcSessionDriver: Send + Sync + std::fmt::Debug + 'static {
    fn is_reading_available(&self) -> bool;

    fn begin_tag_session(&self, session: SessionHandle, polling: Vec<PollingTarget>);
    fn begin_ndef_session(&self, session: SessionHandle);
    fn begin_write_session(&self, session: SessionHandle);

    /// A message means the session failed and the platform should show it
    fn invalidate_session(&self, session: SessionHandle, error_message: Option<String>);
    fn restart_polling(&self, session: SessionHandle);

    fn connect(&self, session: SessionHandle, tag_id: u64);
    fn query_ndef_status(&self, session: SessionHandle, tag_id: u64);
    fn read_ndef(&self, session: SessionHandle, tag_id: u64);
    fn write_ndef(&self, session: SessionHandle, tag_id: u64, records: Vec<NdefRecord>);
}

#[uniffi::export(callback_interface)]
pub trait NfcEventListener: Send + Sync + std::fmt::Debug + 'static {
    fn on_event(&self, event: NfcEvent);
}

#[derive(Clone, Debug, uniffi::Object)]
pub struct RustNfcManager(Arc<Inner>);

#[derive(Debug)]
struct Inner {
    platform: NfcPlatform,
    config: NfcConfig,
    driver: Box<dyn NfcSessionDriver>,

    reader: Mutex<ReaderController>,
    writer: Mutex<WriterController>,
    android: Mutex<AndroidDispatcher>,

    reader_timer: DelayedTask<()>,
    writer_timer: DelayedTask<()>,

    events: Sender<NfcEvent>,
    event_receiver: Arc<Receiver<NfcEvent>>,
}

#[uniffi::export]
impl RustNfcManager {
    #[uniffi::constructor]
    pub fn new(
        driver: Box<dyn NfcSessionDriver>,
        platform: NfcPlatform,
        config: Option<NfcConfig>,
    ) -> Self {
        // timers may be scheduled from host threads outside any runtime
        if tokio::runtime::Handle::try_current().is_ok() {
            nfc_tokio::init();
        } else if let Err(error) = nfc_tokio::init_owned() {
            error!("unable to start the timer runtime: {error}");
        }

        let config = config.unwrap_or_default();
        let (sender, receiver) = flume::bounded(1000);

        Self(Arc::new(Inner {
            platform,
            driver,
            reader: Mutex::new(ReaderController::new(config.clone())),
            writer: Mutex::new(WriterController::new(config.clone())),
            android: Mutex::new(AndroidDispatcher::new()),
            reader_timer: DelayedTask::new("reader_timer"),
            writer_timer: DelayedTask::new("writer_timer"),
            config,
            events: sender,
            event_receiver: Arc::new(receiver),
        }))
    }

    #[uniffi::method]
    pub fn listen_for_events(&self, listener: Box<dyn NfcEventListener>) {
        let event_receiver = self.0.event_receiver.clone();

        std::thread::spawn(move || {
            while let Ok(event) = event_receiver.recv() {
                listener.on_event(event);
            }
        });
    }

    #[uniffi::method]
    pub fn is_supported(&self) -> bool {
        self.0.driver.is_reading_available()
    }

    #[uniffi::method]
    pub fn reader_mode(&self) -> ReaderMode {
        self.0.reader.lock().mode()
    }

    #[uniffi::method]
    pub fn start_scan(&self, options: Option<ScanOptions>) -> Result<(), Error> {
        let request = options.unwrap_or_default().mode_request()?;

        if self.0.platform == NfcPlatform::Android {
            debug!("android delivers tags through dispatch, nothing to start");
            return Ok(());
        }

        let effects = {
            let mut reader = self.0.reader.lock();
            if let Some(request) = request {
                reader.set_mode(request);
            }

            reader.start_scanning()
        };

        self.0.run(SessionRole::Reader, effects);
        Ok(())
    }

    #[uniffi::method]
    pub fn start_scan_json(&self, options: String) -> Result<(), Error> {
        let options = match options.trim() {
            "" => None,
            json => Some(ScanOptions::from_json(json)?),
        };

        self.start_scan(options)
    }

    #[uniffi::method]
    pub fn cancel_scan(&self) {
        if self.0.platform == NfcPlatform::Android {
            return;
        }

        let effects = self.0.reader.lock().cancel_scanning();
        self.0.run(SessionRole::Reader, effects);
    }

    #[uniffi::method]
    pub fn write_ndef(&self, options: WriteOptions) -> Result<(), Error> {
        let records = options.into_records(&self.0.config.text_language)?;
        info!("writing {} records", records.len());

        match self.0.platform {
            NfcPlatform::Ios => {
                let effects = self.0.writer.lock().start_writing(records);
                self.0.run(SessionRole::Writer, effects);
            }
            NfcPlatform::Android => {
                self.0
                    .android
                    .lock()
                    .begin_write(&records)
                    .map_err_str(Error::Encoding)?;
            }
        }

        Ok(())
    }

    #[uniffi::method]
    pub fn write_ndef_json(&self, options: String) -> Result<(), Error> {
        self.write_ndef(WriteOptions::from_json(&options)?)
    }

    #[uniffi::method]
    pub fn cancel_write(&self) {
        match self.0.platform {
            NfcPlatform::Ios => {
                let effects = self.0.writer.lock().cancel_writing();
                self.0.run(SessionRole::Writer, effects);
            }
            NfcPlatform::Android => {
                self.0.android.lock().cancel_write();
            }
        }
    }

    #[uniffi::method]
    pub fn cancel_write_android(&self) -> Result<(), Error> {
        if self.0.platform != NfcPlatform::Android {
            return Err(Error::Unimplemented("cancel_write_android".to_string()));
        }

        if !self.0.android.lock().cancel_write() {
            return Err(Error::NoPendingWrite);
        }

        Ok(())
    }

    /// Feed a native session callback back into the owning controller
    #[uniffi::method]
    pub fn handle_session_event(&self, event: SessionEvent) {
        let role = event.session().role;
        let effects = match role {
            SessionRole::Reader => self.0.reader.lock().handle_event(event),
            SessionRole::Writer => self.0.writer.lock().handle_event(event),
        };

        self.0.run(role, effects);
    }

    #[uniffi::method]
    pub fn android_tag_discovered(&self, intent: AndroidTagIntent) -> AndroidTagAction {
        let (action, event) = self.0.android.lock().tag_discovered(intent);
        if let Some(event) = event {
            self.0.emit(event);
        }

        action
    }

    #[uniffi::method]
    pub fn android_write_finished(&self, error: Option<String>) {
        let event = self.0.android.lock().write_finished(error);
        self.0.emit(event);
    }
}

impl Inner {
    fn timer(&self, role: SessionRole) -> &DelayedTask<()> {
        match role {
            SessionRole::Reader => &self.reader_timer,
            SessionRole::Writer => &self.writer_timer,
        }
    }

    fn run(self: &Arc<Self>, role: SessionRole, effects: Effects) {
        for effect in effects {
            match effect {
                Effect::Native(command) => self.execute(command),
                Effect::Schedule { token, delay } => {
                    let inner = Arc::downgrade(self);
                    self.timer(role).schedule(token.0, delay, fire(inner, role, token));
                }
                Effect::CancelTimer { token } => {
                    if self.timer(role).cancel(token.0) {
                        debug!("cancelled {role} {token}");
                    }
                }
                Effect::Emit(event) => self.emit(event),
            }
        }
    }

    fn timer_fired(self: &Arc<Self>, role: SessionRole, token: TimerToken) {
        let effects = match role {
            SessionRole::Reader => self.reader.lock().timer_fired(token),
            SessionRole::Writer => self.writer.lock().timer_fired(token),
        };

        self.run(role, effects);
    }

    fn execute(&self, command: SessionCommand) {
        let driver = &self.driver;

        match command {
            SessionCommand::BeginTagSession { session, polling } => {
                driver.begin_tag_session(session, polling)
            }
            SessionCommand::BeginNdefSession { session } => driver.begin_ndef_session(session),
            SessionCommand::BeginWriteSession { session } => driver.begin_write_session(session),
            SessionCommand::Invalidate { session, message } => {
                driver.invalidate_session(session, message)
            }
            SessionCommand::RestartPolling { session } => driver.restart_polling(session),
            SessionCommand::Connect { session, tag_id } => driver.connect(session, tag_id),
            SessionCommand::QueryNdefStatus { session, tag_id } => {
                driver.query_ndef_status(session, tag_id)
            }
            SessionCommand::ReadNdef { session, tag_id } => driver.read_ndef(session, tag_id),
            SessionCommand::WriteNdef { session, tag_id, records } => {
                driver.write_ndef(session, tag_id, records)
            }
        }
    }

    fn emit(&self, event: NfcEvent) {
        debug!("emitting {}", event.name());

        if let Err(error) = self.events.try_send(event) {
            warn!("dropping event, listener not keeping up: {error}");
        }
    }
}

async fn fire(inner: Weak<Inner>, role: SessionRole, token: TimerToken) {
    match inner.upgrade() {
        Some(inner) => inner.timer_fired(role, token),
        None => debug!("manager dropped before {token} fired"),
    }
}
