//! Autosave configuration.
//!
//! DESIGN
//! ======
//! There is one scheduler with a configurable delay. The two recognized
//! policies are presets of it: `continuous` (2s debounce after every change)
//! and `periodic` (30s, for hosts that only want coarse syncing). Values can
//! be overridden from environment variables; unparseable values fall back to
//! the preset's defaults.

use std::time::Duration;

pub const DEFAULT_CONTINUOUS_DELAY_MS: u64 = 2000;
pub const DEFAULT_PERIODIC_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 1000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_WAIT_POLL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosaveMode {
    Continuous,
    Periodic,
}

impl AutosaveMode {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("periodic") => Self::Periodic,
            _ => Self::Continuous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// When false, `notify` records state but never arms the debounce timer.
    pub enabled: bool,
    /// Quiet period after the last change before a save starts.
    pub delay: Duration,
    /// Additional attempts after the first failed write.
    pub max_retries: u32,
    /// First retry delay; doubles on every further retry.
    pub retry_base_delay: Duration,
    /// Add random jitter (at most half of each step) to retry delays.
    pub jitter: bool,
    /// Upper bound for `wait_for_save`.
    pub wait_timeout: Duration,
    /// Poll step for `wait_for_save`.
    pub wait_poll: Duration,
}

impl AutosaveConfig {
    /// Fine-grained autosave: 2s debounce, 3 retries.
    #[must_use]
    pub fn continuous() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_millis(DEFAULT_CONTINUOUS_DELAY_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            jitter: false,
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            wait_poll: Duration::from_millis(DEFAULT_WAIT_POLL_MS),
        }
    }

    /// Coarse periodic sync: 30s debounce, 3 retries.
    #[must_use]
    pub fn periodic() -> Self {
        Self { delay: Duration::from_millis(DEFAULT_PERIODIC_DELAY_MS), ..Self::continuous() }
    }

    #[must_use]
    pub fn for_mode(mode: AutosaveMode) -> Self {
        match mode {
            AutosaveMode::Continuous => Self::continuous(),
            AutosaveMode::Periodic => Self::periodic(),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_retry_base_delay(mut self, base: Duration) -> Self {
        self.retry_base_delay = base;
        self
    }

    #[must_use]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Build config from environment variables.
    ///
    /// - `AUTOSAVE_MODE`: `continuous` (default) or `periodic`; selects the preset
    /// - `AUTOSAVE_ENABLED`: `true`/`false`
    /// - `AUTOSAVE_DELAY_MS`
    /// - `AUTOSAVE_MAX_RETRIES`
    /// - `AUTOSAVE_RETRY_BASE_MS`
    /// - `AUTOSAVE_RETRY_JITTER`: `true`/`false`
    /// - `AUTOSAVE_WAIT_TIMEOUT_MS`
    /// - `AUTOSAVE_WAIT_POLL_MS`
    #[must_use]
    pub fn from_env() -> Self {
        let mode = AutosaveMode::parse(std::env::var("AUTOSAVE_MODE").ok().as_deref());
        let base = Self::for_mode(mode);

        Self {
            enabled: env_parse("AUTOSAVE_ENABLED", base.enabled),
            delay: env_duration_ms("AUTOSAVE_DELAY_MS", base.delay),
            max_retries: env_parse("AUTOSAVE_MAX_RETRIES", base.max_retries),
            retry_base_delay: env_duration_ms("AUTOSAVE_RETRY_BASE_MS", base.retry_base_delay),
            jitter: env_parse("AUTOSAVE_RETRY_JITTER", base.jitter),
            wait_timeout: env_duration_ms("AUTOSAVE_WAIT_TIMEOUT_MS", base.wait_timeout),
            wait_poll: env_duration_ms("AUTOSAVE_WAIT_POLL_MS", base.wait_poll),
        }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self::continuous()
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
