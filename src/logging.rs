use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Install the global subscriber, `RUST_LOG` picks the filter (defaults to `info`)
///
/// Safe to call more than once, only the first call does anything.
pub fn init() {
    INIT.call_once(|| {
        if let Err(error) = tracing_log::LogTracer::init() {
            eprintln!("log bridge already installed: {error}");
        }

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::registry().with(filter).with(fmt::layer());

        if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("unable to set global tracing subscriber: {error}");
        }
    });
}
