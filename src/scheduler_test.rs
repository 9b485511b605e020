use std::time::Duration;

use super::*;
use crate::state::test_helpers::{FlakyStore, RecordingStore, persisted_document, slices_with_elements};

fn test_config() -> AutosaveConfig {
    AutosaveConfig::continuous().with_retry_base_delay(Duration::from_millis(10))
}

fn build(
    store: Arc<dyn CampaignStore>,
    document: CanonicalDocument,
    config: AutosaveConfig,
) -> (AutosaveScheduler, Arc<SaveMetricsRecorder>) {
    let metrics = Arc::new(SaveMetricsRecorder::new());
    let scheduler = AutosaveScheduler::builder(store, document)
        .config(config)
        .metrics(metrics.clone())
        .build();
    (scheduler, metrics)
}

fn element_count(document: &CanonicalDocument) -> usize {
    document
        .config
        .canvas_config
        .as_ref()
        .map_or(0, |canvas| canvas.elements.len())
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// =============================================================================
// DEBOUNCE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn rapid_changes_coalesce_into_one_write() {
    let store = Arc::new(RecordingStore::new());
    let (scheduler, metrics) = build(store.clone(), persisted_document(), test_config());

    for n in 1..=5 {
        scheduler.notify(slices_with_elements(n));
        sleep_ms(100).await;
    }
    assert_eq!(scheduler.state(), SaveState::PendingDebounce);
    assert_eq!(store.writes(), 0);

    sleep_ms(2_100).await;
    assert_eq!(store.writes(), 1);
    assert_eq!(element_count(&store.last_written().unwrap()), 5);
    assert_eq!(scheduler.state(), SaveState::Idle);
    assert!(scheduler.last_saved_at().is_some());
    assert_eq!(metrics.snapshot().successful_saves, 1);
}

#[tokio::test(start_paused = true)]
async fn unchanged_content_is_not_written_twice() {
    let store = Arc::new(RecordingStore::new());
    let (scheduler, metrics) = build(store.clone(), persisted_document(), test_config());
    let mut events = scheduler.subscribe();

    scheduler.notify(slices_with_elements(2));
    sleep_ms(2_100).await;
    assert_eq!(store.writes(), 1);

    scheduler.notify(slices_with_elements(2));
    sleep_ms(2_100).await;
    assert_eq!(store.writes(), 1);
    assert_eq!(metrics.snapshot().total_saves, 1);

    assert!(matches!(events.try_recv(), Ok(SaveEvent::Saved { .. })));
    assert_eq!(events.try_recv().ok(), Some(SaveEvent::Skipped(SkipReason::Unchanged)));
}

#[tokio::test(start_paused = true)]
async fn disabled_scheduler_only_saves_when_forced() {
    let store = Arc::new(RecordingStore::new());
    let (scheduler, _) = build(store.clone(), persisted_document(), test_config().disabled());

    scheduler.notify(slices_with_elements(1));
    sleep_ms(60_000).await;
    assert_eq!(store.writes(), 0);
    assert_eq!(scheduler.state(), SaveState::Idle);

    let outcome = scheduler.force_save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { created: false, .. }));
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn periodic_preset_waits_longer() {
    let store = Arc::new(RecordingStore::new());
    let (scheduler, _) = build(store.clone(), persisted_document(), AutosaveConfig::periodic());

    scheduler.notify(slices_with_elements(1));
    sleep_ms(2_100).await;
    assert_eq!(store.writes(), 0);
    sleep_ms(28_000).await;
    assert_eq!(store.writes(), 1);
}

// =============================================================================
// FORCE SAVE
// =============================================================================

#[tokio::test(start_paused = true)]
async fn force_save_cancels_pending_timer() {
    let store = Arc::new(RecordingStore::new());
    let (scheduler, _) = build(store.clone(), persisted_document(), test_config());
    let mut events = scheduler.subscribe();

    scheduler.notify(slices_with_elements(3));
    let outcome = scheduler.force_save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { retries: 0, .. }));
    assert_eq!(scheduler.state(), SaveState::Idle);

    sleep_ms(5_000).await;
    assert_eq!(store.writes(), 1);
    assert!(matches!(events.try_recv(), Ok(SaveEvent::Saved { .. })));
    // The cancelled timer never fired, so it never got to skip.
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn create_assigns_id_and_later_saves_update() {
    let store = Arc::new(RecordingStore::new());
    let draft = CanonicalDocument::draft("New campaign", "quiz");
    let (scheduler, _) = build(store.clone(), draft, test_config());

    scheduler.notify(slices_with_elements(1));
    let outcome = scheduler.force_save().await.unwrap();
    let SaveOutcome::Saved { document_id, created, .. } = outcome else {
        panic!("expected a write, got {outcome:?}");
    };
    assert!(created);
    assert_eq!(scheduler.document().id.as_deref(), Some(document_id.as_str()));
    assert_eq!(scheduler.document().id_kind(), IdKind::Persisted);

    // Same content after the id came back: nothing to do.
    assert_eq!(
        scheduler.force_save().await.unwrap(),
        SaveOutcome::Skipped(SkipReason::Unchanged)
    );

    scheduler.notify(slices_with_elements(2));
    sleep_ms(2_100).await;
    assert_eq!(store.creates.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.updates.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.last_written().unwrap().id.as_deref(), Some(document_id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn placeholder_id_is_never_written() {
    let store = Arc::new(RecordingStore::new());
    let mut document = persisted_document();
    document.id = Some("quick-preview-123".into());
    let (scheduler, metrics) = build(store.clone(), document, test_config());

    scheduler.notify(slices_with_elements(1));
    sleep_ms(2_100).await;
    assert_eq!(
        scheduler.force_save().await.unwrap(),
        SaveOutcome::Skipped(SkipReason::PlaceholderId)
    );
    assert_eq!(store.writes(), 0);
    assert_eq!(metrics.snapshot().total_saves, 0);
}

// =============================================================================
// OVERLAP
// =============================================================================

#[tokio::test(start_paused = true)]
async fn change_during_save_schedules_exactly_one_follow_up() {
    let store = Arc::new(RecordingStore::slow(Duration::from_secs(5)));
    let (scheduler, _) = build(store.clone(), persisted_document(), test_config());

    scheduler.notify(slices_with_elements(1));
    sleep_ms(2_500).await;
    assert_eq!(scheduler.state(), SaveState::Saving);

    scheduler.notify(slices_with_elements(3));
    assert_eq!(scheduler.state(), SaveState::Saving);

    sleep_ms(13_000).await;
    assert_eq!(store.writes(), 2);
    assert_eq!(store.max_concurrent(), 1);
    assert_eq!(element_count(&store.last_written().unwrap()), 3);
    assert_eq!(scheduler.state(), SaveState::Idle);
}

#[tokio::test(start_paused = true)]
async fn force_save_waits_for_in_flight_write() {
    let store = Arc::new(RecordingStore::slow(Duration::from_secs(1)));
    let (scheduler, _) = build(store.clone(), persisted_document(), test_config());

    scheduler.notify(slices_with_elements(1));
    sleep_ms(2_100).await;
    assert!(scheduler.is_saving());

    scheduler.notify(slices_with_elements(4));
    let outcome = scheduler.force_save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { .. }));
    assert_eq!(store.writes(), 2);
    assert_eq!(store.max_concurrent(), 1);
    assert_eq!(element_count(&store.last_written().unwrap()), 4);
}

#[tokio::test(start_paused = true)]
async fn wait_for_save_is_bounded() {
    let store = Arc::new(RecordingStore::slow(Duration::from_secs(10)));
    let config = test_config().with_wait_timeout(Duration::from_secs(1));
    let (scheduler, _) = build(store.clone(), persisted_document(), config);

    assert!(scheduler.wait_for_save().await);

    scheduler.notify(slices_with_elements(1));
    let background = scheduler.clone();
    let save = tokio::spawn(async move { background.force_save().await });
    sleep_ms(10).await;
    assert!(scheduler.is_saving());

    let started = Instant::now();
    assert!(!scheduler.wait_for_save().await);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(2));

    save.await.unwrap().unwrap();
    assert!(scheduler.wait_for_save().await);
}

// =============================================================================
// RETRY / ERRORS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn exhausted_retries_report_to_sink_and_recover() {
    let store = Arc::new(FlakyStore::new(3));
    let metrics = Arc::new(SaveMetricsRecorder::new());
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();
    let scheduler = AutosaveScheduler::builder(store.clone(), persisted_document())
        .config(test_config().with_max_retries(2))
        .metrics(metrics.clone())
        .error_sink(move |e: &AutosaveError| sink.lock().unwrap().push(e.error_code()))
        .build();

    scheduler.notify(slices_with_elements(1));
    let err = scheduler.force_save().await.unwrap_err();
    assert!(matches!(
        err,
        AutosaveError::WriteFailed { retries: 2, source: StoreError::Response { status: 503, .. } }
    ));
    assert_eq!(store.calls(), 3);
    assert_eq!(*reported.lock().unwrap(), vec!["E_AUTOSAVE_FAILED"]);
    assert_eq!(scheduler.state(), SaveState::Idle);
    assert!(scheduler.last_saved_at().is_none());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.failed_saves, 1);
    assert_eq!(snapshot.total_saves, 1);

    // A later save still goes through; failure did not mark content saved.
    let outcome = scheduler.force_save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { retries: 0, .. }));
    assert_eq!(metrics.snapshot().successful_saves, 1);
    assert_eq!(reported.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_within_budget_succeed() {
    let store = Arc::new(FlakyStore::new(2));
    let (scheduler, metrics) = build(store.clone(), persisted_document(), test_config());

    scheduler.notify(slices_with_elements(1));
    let outcome = scheduler.force_save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { retries: 2, .. }));
    assert_eq!(store.calls(), 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.total_saves, 1);
    assert_eq!(snapshot.successful_saves, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_debounced_save_emits_event() {
    let store = Arc::new(FlakyStore::new(10));
    let (scheduler, _) = build(store, persisted_document(), test_config().with_max_retries(1));
    let mut events = scheduler.subscribe();

    scheduler.notify(slices_with_elements(1));
    sleep_ms(2_500).await;
    let Ok(SaveEvent::Failed { code, .. }) = events.try_recv() else {
        panic!("expected a failure event");
    };
    assert_eq!(code, "E_AUTOSAVE_FAILED");
    assert_eq!(scheduler.state(), SaveState::Idle);
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(AutosaveError::TornDown.error_code(), "E_SESSION_TORN_DOWN");
    assert_eq!(AutosaveError::TaskAborted("x".into()).error_code(), "E_SAVE_TASK_ABORTED");
}

#[tokio::test(start_paused = true)]
async fn missing_remote_document_fails_without_retries() {
    let store = Arc::new(crate::store::MemoryStore::new());
    let (scheduler, metrics) = build(store.clone(), persisted_document(), test_config());

    scheduler.notify(slices_with_elements(1));
    let started = Instant::now();
    let err = scheduler.force_save().await.unwrap_err();

    assert!(matches!(err, AutosaveError::WriteFailed { retries: 0, source: StoreError::NotFound(_) }));
    assert_eq!(store.write_count(), 1);
    assert!(started.elapsed() < Duration::from_millis(10));
    assert_eq!(metrics.snapshot().failed_saves, 1);
}

#[tokio::test(start_paused = true)]
async fn mark_dirty_forces_write_for_undigested_edit() {
    use crate::game::{GameConfig, WheelConfig};

    let store = Arc::new(RecordingStore::new());
    let (scheduler, _) = build(store.clone(), persisted_document(), test_config());

    let mut slices = slices_with_elements(1);
    scheduler.notify(slices.clone());
    scheduler.force_save().await.unwrap();

    slices.game_config = Some(GameConfig::Wheel(WheelConfig { spin_duration_ms: Some(9000), ..Default::default() }));
    scheduler.notify(slices.clone());
    assert_eq!(
        scheduler.force_save().await.unwrap(),
        SaveOutcome::Skipped(SkipReason::Unchanged)
    );

    scheduler.mark_dirty();
    assert!(matches!(scheduler.force_save().await.unwrap(), SaveOutcome::Saved { .. }));
    assert_eq!(store.writes(), 2);
    assert_eq!(store.last_written().unwrap().game_config["wheel"]["spinDurationMs"], 9000);
}
