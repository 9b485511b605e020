//! Save metrics — process-wide counters and timers for autosave.
//!
//! DESIGN
//! ======
//! Every save attempt (success or failure) is recorded once, after the
//! retry loop settles. Counters sit behind a `Mutex` because schedulers run
//! on a multi-threaded runtime; the lock is held only for the arithmetic.
//! Schedulers use the process-wide recorder by default; tests inject their
//! own so parallel tests do not share counters.

use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcomeKind {
    Success,
    Failure,
}

/// One settled write, ephemeral.
#[derive(Debug, Clone)]
pub struct SaveAttempt {
    pub fingerprint: Fingerprint,
    /// Milliseconds since the Unix epoch when the first attempt started.
    pub started_at_ms: i64,
    pub duration: Duration,
    pub outcome: SaveOutcomeKind,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveMetrics {
    pub total_saves: u64,
    pub successful_saves: u64,
    pub failed_saves: u64,
    /// Running mean over every recorded attempt.
    pub average_save_time: Duration,
    pub last_save_duration: Duration,
}

#[derive(Debug, Default)]
pub struct SaveMetricsRecorder {
    inner: Mutex<SaveMetrics>,
}

static GLOBAL: LazyLock<std::sync::Arc<SaveMetricsRecorder>> =
    LazyLock::new(|| std::sync::Arc::new(SaveMetricsRecorder::new()));

impl SaveMetricsRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide recorder.
    #[must_use]
    pub fn global() -> std::sync::Arc<SaveMetricsRecorder> {
        GLOBAL.clone()
    }

    pub fn record(&self, attempt: &SaveAttempt) {
        let mut m = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        m.total_saves += 1;
        match attempt.outcome {
            SaveOutcomeKind::Success => m.successful_saves += 1,
            SaveOutcomeKind::Failure => m.failed_saves += 1,
        }
        m.last_save_duration = attempt.duration;
        m.average_save_time = running_mean(m.average_save_time, attempt.duration, m.total_saves);
    }

    #[must_use]
    pub fn snapshot(&self) -> SaveMetrics {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = SaveMetrics::default();
    }
}

/// `mean + (sample - mean) / n`, in nanoseconds.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn running_mean(mean: Duration, sample: Duration, n: u64) -> Duration {
    let mean_ns = mean.as_nanos() as f64;
    let sample_ns = sample.as_nanos() as f64;
    let next = mean_ns + (sample_ns - mean_ns) / n as f64;
    Duration::from_nanos(next.max(0.0).round() as u64)
}

pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
