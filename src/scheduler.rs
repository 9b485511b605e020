//! Autosave scheduler — debounced, deduplicated writes for one editor session.
//!
//! DESIGN
//! ======
//! One scheduler per editor session. `notify` records the latest slices
//! synchronously and (re)arms a debounce timer. When the timer fires the
//! scheduler merges the slices over the current base document, compares the
//! fingerprint with the last saved one, and writes through the retry policy.
//! The saved document becomes the next merge base, so an id assigned by
//! `create` flows back into the session.
//!
//! State machine: `Idle → PendingDebounce → Saving → (Idle | Error)`, where
//! `Error` is reported to the error sink and then settles back to `Idle`.
//!
//! CONCURRENCY
//! ===========
//! At most one write per session is in flight. The write slot is a flag in
//! the session state; `SaveSlot` releases it on drop, so a panicking or
//! dropped save can never wedge the session. A debounce tick that finds the
//! slot taken sets `rerun` and a fresh debounce window starts once the
//! in-flight write settles. `force_save` waits for the slot instead.
//!
//! Debounce timers carry a generation number: a timer whose generation is
//! stale exits without saving, and once a timer has started its save it
//! removes its own handle so it is never aborted mid-write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::AutosaveConfig;
use crate::document::{CanonicalDocument, IdKind};
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::guard::UnmountFlushGuard;
use crate::merge::merge;
use crate::metrics::{SaveAttempt, SaveMetricsRecorder, SaveOutcomeKind, now_ms};
use crate::retry::RetryPolicy;
use crate::state::EditorSlices;
use crate::store::{CampaignStore, StoreError};

const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AutosaveError {
    /// Every attempt failed; `source` is the last store error, unmodified.
    #[error("autosave failed after {retries} retries: {source}")]
    WriteFailed {
        retries: u32,
        #[source]
        source: StoreError,
    },
    #[error("editor session already torn down")]
    TornDown,
    #[error("save task aborted: {0}")]
    TaskAborted(String),
}

impl AutosaveError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WriteFailed { .. } => "E_AUTOSAVE_FAILED",
            Self::TornDown => "E_SESSION_TORN_DOWN",
            Self::TaskAborted(_) => "E_SAVE_TASK_ABORTED",
        }
    }
}

/// Callback invoked with the terminal error once retries are exhausted.
pub type ErrorSink = Arc<dyn Fn(&AutosaveError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    PendingDebounce,
    Saving,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fingerprint equals the last saved one.
    Unchanged,
    /// The document carries a locally generated id.
    PlaceholderId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { document_id: String, created: bool, retries: u32 },
    Skipped(SkipReason),
}

/// Completion notifications broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Saved { document_id: String, saved_at_ms: i64 },
    Skipped(SkipReason),
    Failed { code: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveTrigger {
    Debounce,
    Force,
}

impl SaveTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Force => "force",
        }
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

struct Session {
    state: SaveState,
    /// Merge base: the last saved (or initially loaded) document.
    document: CanonicalDocument,
    /// Latest slices from the editor; read at merge time, never captured.
    slices: EditorSlices,
    last_saved: Fingerprint,
    last_saved_at_ms: Option<i64>,
    saving: bool,
    rerun: bool,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    torn_down: bool,
}

struct Inner {
    store: Arc<dyn CampaignStore>,
    config: AutosaveConfig,
    retry: RetryPolicy,
    metrics: Arc<SaveMetricsRecorder>,
    error_sink: Option<ErrorSink>,
    session: Mutex<Session>,
    settled: Notify,
    events: broadcast::Sender<SaveEvent>,
}

// =============================================================================
// BUILDER
// =============================================================================

pub struct AutosaveSchedulerBuilder {
    store: Arc<dyn CampaignStore>,
    document: CanonicalDocument,
    config: AutosaveConfig,
    metrics: Option<Arc<SaveMetricsRecorder>>,
    error_sink: Option<ErrorSink>,
}

impl AutosaveSchedulerBuilder {
    #[must_use]
    pub fn config(mut self, config: AutosaveConfig) -> Self {
        self.config = config;
        self
    }

    /// Record into `metrics` instead of the process-wide recorder.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<SaveMetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn error_sink(mut self, sink: impl Fn(&AutosaveError) + Send + Sync + 'static) -> Self {
        self.error_sink = Some(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn build(self) -> AutosaveScheduler {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(
            document_id = self.document.id.as_deref().unwrap_or("<new>"),
            enabled = self.config.enabled,
            delay_ms = u64::try_from(self.config.delay.as_millis()).unwrap_or(u64::MAX),
            max_retries = self.config.max_retries,
            "autosave scheduler configured"
        );
        AutosaveScheduler {
            inner: Arc::new(Inner {
                store: self.store,
                retry: RetryPolicy::from_config(&self.config),
                config: self.config,
                metrics: self.metrics.unwrap_or_else(SaveMetricsRecorder::global),
                error_sink: self.error_sink,
                session: Mutex::new(Session {
                    state: SaveState::Idle,
                    document: self.document,
                    slices: EditorSlices::default(),
                    last_saved: Fingerprint::sentinel(),
                    last_saved_at_ms: None,
                    saving: false,
                    rerun: false,
                    timer: None,
                    generation: 0,
                    torn_down: false,
                }),
                settled: Notify::new(),
                events,
            }),
        }
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Cheap-to-clone handle to one session's autosave engine.
///
/// Must be used from within a tokio runtime: `notify` spawns timer tasks.
#[derive(Clone)]
pub struct AutosaveScheduler {
    inner: Arc<Inner>,
}

impl AutosaveScheduler {
    #[must_use]
    pub fn builder(store: Arc<dyn CampaignStore>, document: CanonicalDocument) -> AutosaveSchedulerBuilder {
        AutosaveSchedulerBuilder {
            store,
            document,
            config: AutosaveConfig::default(),
            metrics: None,
            error_sink: None,
        }
    }

    #[must_use]
    pub fn new(store: Arc<dyn CampaignStore>, config: AutosaveConfig, document: CanonicalDocument) -> Self {
        Self::builder(store, document).config(config).build()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> SaveState {
        self.lock().state
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.lock().saving
    }

    /// Milliseconds since the Unix epoch of the last successful save.
    #[must_use]
    pub fn last_saved_at(&self) -> Option<i64> {
        self.lock().last_saved_at_ms
    }

    /// Current merge base (carries the store-assigned id after a create).
    #[must_use]
    pub fn document(&self) -> CanonicalDocument {
        self.lock().document.clone()
    }

    #[must_use]
    pub fn slices(&self) -> EditorSlices {
        self.lock().slices.clone()
    }

    #[must_use]
    pub fn config(&self) -> &AutosaveConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SaveEvent> {
        self.inner.events.subscribe()
    }

    /// Guard that flushes this session once when the editor is torn down.
    #[must_use]
    pub fn flush_guard(&self) -> UnmountFlushGuard {
        UnmountFlushGuard::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // notify / debounce
    // -------------------------------------------------------------------------

    /// Record the latest editor state and restart the debounce window.
    pub fn notify(&self, slices: EditorSlices) {
        let mut session = self.lock();
        if session.torn_down {
            debug!("notify after teardown ignored");
            return;
        }
        session.slices = slices;
        if !self.inner.config.enabled {
            return;
        }
        self.arm_timer(&mut session);
    }

    fn arm_timer(&self, session: &mut Session) {
        session.generation += 1;
        if let Some(timer) = session.timer.take() {
            timer.abort();
        }
        if !session.saving {
            session.state = SaveState::PendingDebounce;
        }

        let generation = session.generation;
        let delay = self.inner.config.delay;
        let scheduler = self.clone();
        session.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.on_debounce(generation).await;
        }));
    }

    async fn on_debounce(&self, generation: u64) {
        let slot = {
            let mut session = self.lock();
            if session.generation != generation || session.torn_down {
                return;
            }
            // From here on this task owns its save; nobody may abort it.
            session.timer = None;
            if session.saving {
                debug!("save in flight; coalescing into next debounce window");
                session.rerun = true;
                return;
            }
            self.take_slot(&mut session)
        };
        // Failures are already routed to the error sink and events.
        let _ = self.perform_save(slot, SaveTrigger::Debounce).await;
    }

    /// Forget the last saved fingerprint so the next save writes even if the
    /// digested fields are unchanged. For edits the fingerprint does not
    /// cover, such as game settings or form fields.
    pub fn mark_dirty(&self) {
        self.lock().last_saved = Fingerprint::sentinel();
    }

    /// Abort the pending debounce timer. An in-flight write is untouched.
    pub fn cancel_pending(&self) {
        let mut session = self.lock();
        session.generation += 1;
        if let Some(timer) = session.timer.take() {
            timer.abort();
            debug!("pending autosave cancelled");
        }
        if session.state == SaveState::PendingDebounce {
            session.state = SaveState::Idle;
        }
    }

    // -------------------------------------------------------------------------
    // force / wait
    // -------------------------------------------------------------------------

    /// Save now, skipping the debounce delay but never racing an in-flight
    /// write.
    ///
    /// # Errors
    ///
    /// Returns [`AutosaveError::WriteFailed`] once retries are exhausted and
    /// [`AutosaveError::TornDown`] after teardown.
    pub async fn force_save(&self) -> Result<SaveOutcome, AutosaveError> {
        if self.lock().torn_down {
            return Err(AutosaveError::TornDown);
        }
        self.cancel_pending();

        let slot = self.acquire_slot().await;
        if self.lock().torn_down {
            return Err(AutosaveError::TornDown);
        }

        // Spawned so that dropping this future never aborts the write.
        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.perform_save(slot, SaveTrigger::Force).await })
            .await
            .map_err(|e| AutosaveError::TaskAborted(e.to_string()))?
    }

    /// Wait until no save is in flight, polling up to `wait_timeout`.
    ///
    /// Returns `false` (and logs) if the bound elapsed first.
    pub async fn wait_for_save(&self) -> bool {
        let timeout = self.inner.config.wait_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_saving() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "timed out waiting for in-flight save; continuing"
                );
                return false;
            }
            tokio::time::sleep(self.inner.config.wait_poll).await;
        }
    }

    // -------------------------------------------------------------------------
    // write slot
    // -------------------------------------------------------------------------

    fn take_slot(&self, session: &mut Session) -> SaveSlot {
        session.saving = true;
        session.state = SaveState::Saving;
        SaveSlot { scheduler: self.clone() }
    }

    /// Wait for the in-flight write (if any) to settle, then take the slot.
    pub(crate) async fn acquire_slot(&self) -> SaveSlot {
        loop {
            let notified = {
                let mut session = self.lock();
                if !session.saving {
                    return self.take_slot(&mut session);
                }
                self.inner.settled.notified()
            };
            notified.await;
        }
    }

    fn release_slot(&self) {
        {
            let mut session = self.lock();
            session.saving = false;
            session.state = if session.timer.is_some() {
                SaveState::PendingDebounce
            } else {
                SaveState::Idle
            };
            if session.rerun {
                session.rerun = false;
                if !session.torn_down && self.inner.config.enabled {
                    self.arm_timer(&mut session);
                }
            }
        }
        self.inner.settled.notify_waiters();
    }

    // -------------------------------------------------------------------------
    // save
    // -------------------------------------------------------------------------

    async fn perform_save(&self, slot: SaveSlot, trigger: SaveTrigger) -> Result<SaveOutcome, AutosaveError> {
        let (base, slices, last_saved) = {
            let session = self.lock();
            (session.document.clone(), session.slices.clone(), session.last_saved.clone())
        };

        let candidate = merge(&base, &slices, base.kind());
        let candidate_fp = fingerprint(&candidate);
        if candidate_fp.matches(&last_saved) {
            debug!(trigger = trigger.as_str(), "no changes since last save; skipping");
            return Ok(self.skip(slot, SkipReason::Unchanged));
        }

        let id_kind = candidate.id_kind();
        if id_kind == IdKind::Placeholder {
            info!(
                trigger = trigger.as_str(),
                document_id = candidate.id.as_deref().unwrap_or_default(),
                "placeholder id; write skipped"
            );
            return Ok(self.skip(slot, SkipReason::PlaceholderId));
        }

        let started = Instant::now();
        let started_at_ms = now_ms();
        let store = self.inner.store.as_ref();
        let attempted = self
            .inner
            .retry
            .run_when(|| write(store, &candidate), StoreError::retryable)
            .await;
        let duration = started.elapsed();

        let outcome = if attempted.result.is_ok() { SaveOutcomeKind::Success } else { SaveOutcomeKind::Failure };
        self.inner.metrics.record(&SaveAttempt {
            fingerprint: candidate_fp,
            started_at_ms,
            duration,
            outcome,
            retry_count: attempted.retries,
        });

        match attempted.result {
            Ok(mut saved) => {
                if saved.id.is_none() {
                    saved.id.clone_from(&candidate.id);
                }
                let document_id = saved.id.clone().unwrap_or_default();
                // Fingerprint against the saved base so a freshly assigned id
                // does not trigger a redundant follow-up write.
                let saved_fp = fingerprint(&merge(&saved, &slices, saved.kind()));
                let saved_at_ms = now_ms();
                {
                    let mut session = self.lock();
                    session.document = saved;
                    session.last_saved = saved_fp;
                    session.last_saved_at_ms = Some(saved_at_ms);
                }
                info!(
                    trigger = trigger.as_str(),
                    %document_id,
                    created = id_kind == IdKind::Missing,
                    retries = attempted.retries,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "campaign saved"
                );
                self.emit(SaveEvent::Saved { document_id: document_id.clone(), saved_at_ms });
                drop(slot);
                Ok(SaveOutcome::Saved { document_id, created: id_kind == IdKind::Missing, retries: attempted.retries })
            }
            Err(source) => {
                let err = AutosaveError::WriteFailed { retries: attempted.retries, source };
                error!(trigger = trigger.as_str(), error = %err, "autosave failed");
                self.lock().state = SaveState::Error;
                if let Some(sink) = &self.inner.error_sink {
                    sink(&err);
                }
                self.emit(SaveEvent::Failed { code: err.error_code(), message: err.to_string() });
                drop(slot);
                Err(err)
            }
        }
    }

    fn skip(&self, slot: SaveSlot, reason: SkipReason) -> SaveOutcome {
        self.emit(SaveEvent::Skipped(reason));
        drop(slot);
        SaveOutcome::Skipped(reason)
    }

    fn emit(&self, event: SaveEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    // -------------------------------------------------------------------------
    // teardown support
    // -------------------------------------------------------------------------

    /// Base document and latest slices as they are right now.
    pub(crate) fn live_snapshot(&self) -> (CanonicalDocument, EditorSlices) {
        let session = self.lock();
        (session.document.clone(), session.slices.clone())
    }

    /// Drop session-owned state and refuse further notifications.
    pub(crate) fn discard_session(&self) {
        let mut session = self.lock();
        session.torn_down = true;
        session.rerun = false;
        session.slices = EditorSlices::default();
    }

    /// Single, un-retried write used by the teardown flush.
    ///
    /// Always waits for the in-flight save so the flush lands last.
    pub(crate) async fn final_write(&self, document: CanonicalDocument) {
        let wait = self.inner.config.wait_timeout;
        let acquire = self.acquire_slot();
        tokio::pin!(acquire);
        let slot = match tokio::time::timeout(wait, &mut acquire).await {
            Ok(slot) => slot,
            Err(_) => {
                warn!(
                    waited_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "in-flight save still running at teardown; flush keeps waiting"
                );
                acquire.await
            }
        };

        let started = Instant::now();
        let started_at_ms = now_ms();
        let result = write(self.inner.store.as_ref(), &document).await;
        let duration = started.elapsed();

        self.inner.metrics.record(&SaveAttempt {
            fingerprint: fingerprint(&document),
            started_at_ms,
            duration,
            outcome: if result.is_ok() { SaveOutcomeKind::Success } else { SaveOutcomeKind::Failure },
            retry_count: 0,
        });

        match result {
            Ok(saved) => {
                let document_id = saved.id.unwrap_or_default();
                info!(%document_id, "teardown flush saved");
                self.emit(SaveEvent::Saved { document_id, saved_at_ms: now_ms() });
            }
            Err(e) => {
                error!(error = %e, "teardown flush failed");
                self.emit(SaveEvent::Failed { code: e.error_code(), message: e.to_string() });
            }
        }
        drop(slot);
    }
}

/// Ownership of the session's single write slot. Released on drop.
pub(crate) struct SaveSlot {
    scheduler: AutosaveScheduler,
}

impl Drop for SaveSlot {
    fn drop(&mut self) {
        self.scheduler.release_slot();
    }
}

async fn write(store: &dyn CampaignStore, document: &CanonicalDocument) -> Result<CanonicalDocument, StoreError> {
    match document.id.as_deref() {
        Some(id) => store.update(id, document).await,
        None => store.create(document).await,
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
