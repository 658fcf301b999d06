use core::future::Future;

use tokio::{runtime::Handle, task::JoinHandle};

use crate::TOKIO;

/// The runtime to spawn on, prefers the caller's runtime over the global one
fn handle() -> Handle {
    if let Ok(handle) = Handle::try_current() {
        return handle;
    }

    TOKIO.get().cloned().expect("tokio runtime not initialized, call nfc_tokio::init first")
}

pub fn spawn<T>(task: T) -> JoinHandle<T::Output>
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    handle().spawn(task)
}
