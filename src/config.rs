//! Settings loaded from environment variables.
//!
//! Every knob has a typed default; a missing or unparsable variable falls
//! back to it silently.

use std::path::PathBuf;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_SYNC_RETRIES: usize = 2;
pub const DEFAULT_SYNC_RETRY_BASE_MS: u64 = 200;
pub const DEFAULT_DATA_DIR: &str = ".archsketch";
pub const DEFAULT_USER: &str = "local";

/// Tuning knobs for the sync worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last edit before a write is issued, in milliseconds.
    pub debounce_ms: u64,
    /// Write attempts per flush, including the first one.
    pub retries: usize,
    /// Base delay in milliseconds for linear retry back-off.
    pub retry_base_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_SYNC_DEBOUNCE_MS,
            retries: DEFAULT_SYNC_RETRIES,
            retry_base_ms: DEFAULT_SYNC_RETRY_BASE_MS,
        }
    }
}

impl SyncConfig {
    /// Read `ARCHSKETCH_SYNC_DEBOUNCE_MS`, `ARCHSKETCH_SYNC_RETRIES` and
    /// `ARCHSKETCH_SYNC_RETRY_BASE_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            debounce_ms: env_parse("ARCHSKETCH_SYNC_DEBOUNCE_MS", DEFAULT_SYNC_DEBOUNCE_MS),
            // At least one attempt, or nothing would ever be written.
            retries: env_parse("ARCHSKETCH_SYNC_RETRIES", DEFAULT_SYNC_RETRIES).max(1),
            retry_base_ms: env_parse("ARCHSKETCH_SYNC_RETRY_BASE_MS", DEFAULT_SYNC_RETRY_BASE_MS),
        }
    }
}

/// Where local data lives and who is working on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub user: String,
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Read `ARCHSKETCH_DATA_DIR` and `ARCHSKETCH_USER` plus the sync settings.
    #[must_use]
    pub fn from_env() -> Self {
        let data_dir = std::env::var("ARCHSKETCH_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let user = std::env::var("ARCHSKETCH_USER")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());
        Self { data_dir: PathBuf::from(data_dir), user, sync: SyncConfig::from_env() }
    }
}

pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
