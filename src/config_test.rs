use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__ARCHSKETCH_TEST_MISSING_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__ARCHSKETCH_TEST_EP_VALID__", "99") };
    let val: usize = env_parse("__ARCHSKETCH_TEST_EP_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__ARCHSKETCH_TEST_EP_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__ARCHSKETCH_TEST_EP_INVALID__", "soon") };
    let val: u64 = env_parse("__ARCHSKETCH_TEST_EP_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__ARCHSKETCH_TEST_EP_INVALID__") };
}

// =============================================================================
// SyncConfig / AppConfig
// =============================================================================

#[test]
fn sync_config_default_matches_constants() {
    let config = SyncConfig::default();
    assert_eq!(config.debounce_ms, DEFAULT_SYNC_DEBOUNCE_MS);
    assert_eq!(config.retries, DEFAULT_SYNC_RETRIES);
    assert_eq!(config.retry_base_ms, DEFAULT_SYNC_RETRY_BASE_MS);
}

#[test]
fn sync_config_from_env_reads_overrides() {
    unsafe {
        std::env::set_var("ARCHSKETCH_SYNC_DEBOUNCE_MS", "50");
        std::env::set_var("ARCHSKETCH_SYNC_RETRIES", "0");
        std::env::remove_var("ARCHSKETCH_SYNC_RETRY_BASE_MS");
    }
    let config = SyncConfig::from_env();
    assert_eq!(config.debounce_ms, 50);
    assert_eq!(config.retries, 1, "zero retries is raised to one attempt");
    assert_eq!(config.retry_base_ms, DEFAULT_SYNC_RETRY_BASE_MS);
    unsafe {
        std::env::remove_var("ARCHSKETCH_SYNC_DEBOUNCE_MS");
        std::env::remove_var("ARCHSKETCH_SYNC_RETRIES");
    }
}

#[test]
fn app_config_blank_values_fall_back() {
    unsafe {
        std::env::set_var("ARCHSKETCH_DATA_DIR", "  ");
        std::env::set_var("ARCHSKETCH_USER", "");
    }
    let config = AppConfig::from_env();
    assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    assert_eq!(config.user, DEFAULT_USER);
    unsafe {
        std::env::remove_var("ARCHSKETCH_DATA_DIR");
        std::env::remove_var("ARCHSKETCH_USER");
    }
}
