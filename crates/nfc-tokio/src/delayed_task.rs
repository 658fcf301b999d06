use std::{future::Future, sync::Arc, time::Duration};

use arc_swap::ArcSwapOption;
use tracing::debug;

use crate::abortable_task::AbortableTask;

/// A single pending future that runs after a delay
///
/// Every schedule carries an id from an increasing sequence. Scheduling
/// replaces (aborts) a pending future with a lower id and is itself dropped
/// if a higher id is already pending. Cancelling only aborts the future with
/// the given id.
#[derive(Debug)]
pub struct DelayedTask<T> {
    name: &'static str,
    pending: ArcSwapOption<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    id: u64,
    task: AbortableTask<T>,
}

impl<T> DelayedTask<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, pending: ArcSwapOption::from(None) }
    }

    /// Id of the pending future, if any
    pub fn pending_id(&self) -> Option<u64> {
        self.pending.load_full().map(|pending| pending.id)
    }

    /// Abort the pending future with `id`, returns true if it had not run yet
    pub fn cancel(&self, id: u64) -> bool {
        let previous = self.pending.rcu(|current| match current {
            Some(current) if current.id != id => Some(current.clone()),
            _ => None,
        });

        match previous {
            Some(previous) if previous.id == id => {
                let was_pending = !previous.task.is_finished();
                if was_pending {
                    debug!("[{}] cancelled #{id}", self.name);
                }

                was_pending
            }
            _ => {
                debug!("[{}] #{id} is not pending, nothing to cancel", self.name);
                false
            }
        }
    }
}

impl<T> DelayedTask<T>
where
    T: Send + 'static,
{
    pub fn schedule<F>(&self, id: u64, delay: Duration, fut: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let name = self.name;
        let task = AbortableTask::spawn(async move {
            debug!("[{name}] #{id} waiting {delay:?}");
            tokio::time::sleep(delay).await;
            debug!("[{name}] #{id} executing");
            fut.await
        });

        let scheduled = Arc::new(Pending { id, task });
        let previous = self.pending.rcu(|current| match current {
            Some(current) if current.id > id => Some(current.clone()),
            _ => Some(scheduled.clone()),
        });

        // whichever of the two is not stored is aborted when dropped here
        match previous {
            Some(previous) if previous.id > id => {
                debug!("[{name}] #{id} superseded by pending #{}", previous.id);
            }
            Some(previous) => debug!("[{name}] #{id} replaced pending #{}", previous.id),
            None => {}
        }
    }
}
