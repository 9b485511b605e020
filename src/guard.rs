//! Unmount flush guard — one last write when the editor goes away.
//!
//! DESIGN
//! ======
//! The guard is held by whatever owns the editor session. Dropping it (or
//! calling `flush`) fires exactly once: pending debounce work is cancelled,
//! the live slices are merged at that instant, and a single write is handed
//! to a detached task so teardown itself never blocks on I/O. That task
//! waits for any in-flight save, however long it keeps retrying, so the
//! teardown state is always the last write to land. The session is then
//! marked torn down and further `notify` calls are ignored.
//!
//! Documents without a store-issued id are never written here: a missing id
//! would create a stray duplicate and a placeholder id is a preview session.
//!
//! ERROR HANDLING
//! ==============
//! The flush runs after its caller is gone, so failures are logged and
//! broadcast as `SaveEvent::Failed`, never returned.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::document::IdKind;
use crate::merge::merge;
use crate::scheduler::AutosaveScheduler;

#[must_use = "dropping the guard immediately flushes and tears down the session"]
pub struct UnmountFlushGuard {
    scheduler: Option<AutosaveScheduler>,
}

impl UnmountFlushGuard {
    pub(crate) fn new(scheduler: AutosaveScheduler) -> Self {
        Self { scheduler: Some(scheduler) }
    }

    /// Fire now and return the background write, if one was started.
    pub fn flush(mut self) -> Option<JoinHandle<()>> {
        self.fire()
    }

    fn fire(&mut self) -> Option<JoinHandle<()>> {
        let scheduler = self.scheduler.take()?;
        scheduler.cancel_pending();

        let (base, slices) = scheduler.live_snapshot();
        let candidate = merge(&base, &slices, base.kind());
        scheduler.discard_session();

        match candidate.id_kind() {
            IdKind::Persisted => {}
            IdKind::Placeholder => {
                warn!(
                    document_id = candidate.id.as_deref().unwrap_or_default(),
                    "placeholder id at teardown; flush skipped"
                );
                return None;
            }
            IdKind::Missing => {
                warn!("document never saved; teardown flush skipped");
                return None;
            }
        }

        let Ok(handle) = Handle::try_current() else {
            warn!("no async runtime at teardown; pending changes dropped");
            return None;
        };
        debug!(document_id = candidate.id.as_deref().unwrap_or_default(), "teardown flush started");
        Some(handle.spawn(async move { scheduler.final_write(candidate).await }))
    }
}

impl Drop for UnmountFlushGuard {
    fn drop(&mut self) {
        let _ = self.fire();
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
