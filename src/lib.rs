pub(crate) mod logging;

pub mod android;
pub mod config;
pub mod event;
pub mod manager;
pub mod options;
pub mod reader;
pub mod session;
pub mod tag;
pub mod writer;

pub use nfc_ndef as ndef;

pub use config::NfcConfig;
pub use event::NfcEvent;
pub use manager::{NfcManagerError, NfcPlatform, RustNfcManager};

uniffi::setup_scaffolding!();

/// Install the tracing subscriber, `RUST_LOG` controls the filter
#[uniffi::export]
pub fn init_logging() {
    logging::init();
}
