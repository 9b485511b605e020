use std::sync::Arc;

use campaign_autosave::document::{Background, CanvasElement};
use campaign_autosave::{
    AutosaveConfig, AutosaveScheduler, CampaignStore, CanonicalDocument, EditorSlices, HttpStore, MemoryStore,
    SaveMetricsRecorder, StoreConfig,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AutosaveConfig::from_env();
    let store: Arc<dyn CampaignStore> = match StoreConfig::from_env() {
        Ok(store_config) => match HttpStore::new(store_config) {
            Ok(http) => Arc::new(http),
            Err(e) => {
                tracing::error!(error = %e, "http store unavailable");
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::info!(reason = %e, "using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let scheduler = AutosaveScheduler::new(store, config, CanonicalDocument::draft("Demo campaign", "wheel"));
    let guard = scheduler.flush_guard();

    let mut slices = EditorSlices {
        name: Some("Demo campaign".into()),
        canvas_elements: Some(vec![CanvasElement::new("title", "text", 40.0, 32.0)]),
        canvas_background: Some(Background::color("#f4f1ea")),
        ..EditorSlices::default()
    };
    scheduler.notify(slices.clone());

    // The first save must create the document before the flush guard can
    // target it.
    match scheduler.force_save().await {
        Ok(outcome) => tracing::info!(?outcome, "initial save"),
        Err(e) => {
            tracing::error!(code = e.error_code(), error = %e, "initial save failed");
            std::process::exit(1);
        }
    }

    let mut logo = CanvasElement::new("logo", "image", 0.0, 0.0);
    logo.extra
        .insert("src".into(), serde_json::json!("https://cdn.example.com/logo.png"));
    if let Some(elements) = slices.canvas_elements.as_mut() {
        elements.push(logo);
    }
    scheduler.notify(slices);
    tokio::time::sleep(config.delay + config.wait_poll).await;
    scheduler.wait_for_save().await;

    if let Some(flush) = guard.flush() {
        if let Err(e) = flush.await {
            tracing::warn!(error = %e, "teardown flush task failed");
        }
    }

    let metrics = SaveMetricsRecorder::global().snapshot();
    tracing::info!(
        total = metrics.total_saves,
        successful = metrics.successful_saves,
        failed = metrics.failed_saves,
        average_ms = u64::try_from(metrics.average_save_time.as_millis()).unwrap_or(u64::MAX),
        "autosave demo finished"
    );
}
