use super::*;

/// # Safety
/// Tests touching `AUTOSAVE_*` must not run concurrently with each other.
unsafe fn clear_autosave_env() {
    unsafe {
        std::env::remove_var("AUTOSAVE_MODE");
        std::env::remove_var("AUTOSAVE_ENABLED");
        std::env::remove_var("AUTOSAVE_DELAY_MS");
        std::env::remove_var("AUTOSAVE_MAX_RETRIES");
        std::env::remove_var("AUTOSAVE_RETRY_BASE_MS");
        std::env::remove_var("AUTOSAVE_RETRY_JITTER");
        std::env::remove_var("AUTOSAVE_WAIT_TIMEOUT_MS");
        std::env::remove_var("AUTOSAVE_WAIT_POLL_MS");
    }
}

#[test]
fn continuous_defaults() {
    let cfg = AutosaveConfig::continuous();
    assert!(cfg.enabled);
    assert_eq!(cfg.delay, Duration::from_millis(2000));
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.wait_timeout, Duration::from_secs(5));
    assert_eq!(cfg.wait_poll, Duration::from_millis(100));
    assert!(!cfg.jitter);
    assert_eq!(AutosaveConfig::default(), cfg);
}

#[test]
fn periodic_only_changes_delay() {
    let cfg = AutosaveConfig::periodic();
    assert_eq!(cfg.delay, Duration::from_millis(30_000));
    assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(cfg.retry_base_delay, AutosaveConfig::continuous().retry_base_delay);
}

#[test]
fn builders_override_fields() {
    let cfg = AutosaveConfig::continuous()
        .with_delay(Duration::from_millis(50))
        .with_max_retries(1)
        .with_retry_base_delay(Duration::from_millis(5))
        .with_wait_timeout(Duration::from_millis(300))
        .disabled();
    assert_eq!(cfg.delay, Duration::from_millis(50));
    assert_eq!(cfg.max_retries, 1);
    assert_eq!(cfg.retry_base_delay, Duration::from_millis(5));
    assert_eq!(cfg.wait_timeout, Duration::from_millis(300));
    assert!(!cfg.enabled);
}

#[test]
fn mode_parse_defaults_to_continuous() {
    assert_eq!(AutosaveMode::parse(None), AutosaveMode::Continuous);
    assert_eq!(AutosaveMode::parse(Some("periodic")), AutosaveMode::Periodic);
    assert_eq!(AutosaveMode::parse(Some("hourly")), AutosaveMode::Continuous);
}

#[test]
fn from_env_reads_overrides_and_ignores_garbage() {
    unsafe {
        clear_autosave_env();
        std::env::set_var("AUTOSAVE_MODE", "periodic");
        std::env::set_var("AUTOSAVE_MAX_RETRIES", "5");
        std::env::set_var("AUTOSAVE_RETRY_JITTER", "true");
        std::env::set_var("AUTOSAVE_WAIT_POLL_MS", "not-a-number");
        std::env::set_var("AUTOSAVE_ENABLED", "false");
    }

    let cfg = AutosaveConfig::from_env();
    assert_eq!(cfg.delay, Duration::from_millis(DEFAULT_PERIODIC_DELAY_MS));
    assert_eq!(cfg.max_retries, 5);
    assert!(cfg.jitter);
    assert!(!cfg.enabled);
    assert_eq!(cfg.wait_poll, Duration::from_millis(DEFAULT_WAIT_POLL_MS));

    unsafe {
        std::env::set_var("AUTOSAVE_DELAY_MS", "750");
    }
    assert_eq!(AutosaveConfig::from_env().delay, Duration::from_millis(750));

    unsafe { clear_autosave_env() };
}

#[test]
fn env_parse_missing_returns_default() {
    let val: u32 = env_parse("__AUTOSAVE_TEST_MISSING_KEY__", 42);
    assert_eq!(val, 42);
}
