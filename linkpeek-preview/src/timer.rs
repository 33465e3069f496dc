//! Cancellable delayed callbacks.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// A callback waiting on the runtime.
///
/// The id lets the owner recognise a callback that already woke up before
/// [`cancel`](Self::cancel) reached it.
#[derive(Debug)]
pub(crate) struct ScheduledTask {
    id: u64,
    handle: AbortHandle,
}

impl ScheduledTask {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn cancel(self) {
        self.handle.abort();
    }
}

/// Runs `f` on `runtime` after `delay`.
pub(crate) fn schedule<F>(runtime: &Handle, id: u64, delay: Duration, f: F) -> ScheduledTask
where
    F: FnOnce() + Send + 'static,
{
    let handle = runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        f();
    });

    ScheduledTask {
        id,
        handle: handle.abort_handle(),
    }
}
