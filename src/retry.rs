//! Retry policy — bounded retries with exponential backoff.
//!
//! After failed attempt `n` (0-based) the policy sleeps `base * 2^n` before
//! trying again, for at most `max_retries` extra attempts. The last error is
//! returned unmodified. `run_when` stops early on errors a predicate marks
//! permanent. Optional jitter adds up to half of the nominal step,
//! so the delay sequence never decreases.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::config::AutosaveConfig;

/// Result of [`RetryPolicy::run`] plus how many retries it took.
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay, jitter: false }
    }

    #[must_use]
    pub fn from_config(config: &AutosaveConfig) -> Self {
        Self::new(config.max_retries, config.retry_base_delay).with_jitter(config.jitter)
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Nominal (jitter-free) delay after failed attempt `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    fn sleep_for(&self, attempt: u32) -> Duration {
        let step = self.delay_for(attempt);
        if !self.jitter {
            return step;
        }
        let half_ms = u64::try_from(step.as_millis() / 2).unwrap_or(u64::MAX);
        let extra = rand::rng().random_range(0..=half_ms);
        step.saturating_add(Duration::from_millis(extra))
    }

    /// Run `operation` until it succeeds or the retry budget is spent.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Attempted<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_when(operation, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but an error for which `should_retry`
    /// returns false is returned at once without spending the budget.
    pub async fn run_when<T, E, F, Fut, P>(&self, mut operation: F, should_retry: P) -> Attempted<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Attempted { result: Ok(value), retries: attempt },
                Err(e) if attempt < self.max_retries && should_retry(&e) => {
                    let delay = self.sleep_for(attempt);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "write failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Attempted { result: Err(e), retries: attempt },
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AutosaveConfig::default())
    }
}

/// Run `operation` with up to `max_retries` retries and exponential backoff.
///
/// # Errors
///
/// Returns the last error once every attempt has failed.
pub async fn with_retry<T, E, F, Fut>(operation: F, max_retries: u32, base_delay: Duration) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryPolicy::new(max_retries, base_delay)
        .run(operation)
        .await
        .result
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod tests;
