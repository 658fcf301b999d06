mod abortable_task;
mod delayed_task;
pub mod task;

use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};

pub use abortable_task::AbortableTask;
pub use delayed_task::DelayedTask;

pub(crate) static TOKIO: OnceLock<Handle> = OnceLock::new();
static OWNED: OnceLock<Runtime> = OnceLock::new();

/// Remember the runtime of the calling context, must be called from inside a tokio runtime
pub fn init() {
    if is_tokio_initialized() {
        return;
    }

    let _ = TOKIO.set(Handle::current());
}

/// Start a small runtime owned by this crate, for hosts that do not run one
pub fn init_owned() -> std::io::Result<()> {
    if is_tokio_initialized() {
        return Ok(());
    }

    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("nfc-runtime")
        .enable_time()
        .build()?;

    let handle = runtime.handle().clone();
    if OWNED.set(runtime).is_ok() {
        let _ = TOKIO.set(handle);
    }

    Ok(())
}

pub fn is_tokio_initialized() -> bool {
    TOKIO.get().is_some()
}
