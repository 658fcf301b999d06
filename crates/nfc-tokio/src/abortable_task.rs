use std::future::Future;

use tokio::task::JoinHandle;

/// Owns a spawned task, dropping it aborts the task
#[derive(Debug)]
pub struct AbortableTask<T> {
    handle: JoinHandle<T>,
}

impl<T> AbortableTask<T>
where
    T: Send + 'static,
{
    pub fn spawn(fut: impl Future<Output = T> + Send + 'static) -> Self {
        Self { handle: crate::task::spawn(fut) }
    }
}

impl<T> AbortableTask<T> {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Drop for AbortableTask<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
