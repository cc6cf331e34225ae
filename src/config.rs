//! Studio configuration parsed from environment variables.
//!
//! LLM provider settings live in [`crate::llm::config`]; this module holds
//! the orchestration knobs (storage location, undo window, retry policy).

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = ".marketboost";
pub const DEFAULT_EXPORT_DIR: &str = "exports";
pub const DEFAULT_UNDO_WINDOW_MS: u64 = 7000;
pub const DEFAULT_IMAGE_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_IMAGE_RETRY_BASE_MS: u64 = 2000;
pub const DEFAULT_IMAGE_RETRY_FLAT_MS: u64 = 1000;
pub const DEFAULT_TOAST_MS: u64 = 3000;
pub const DEFAULT_TOAST_ACTION_MS: u64 = 7000;

/// Hard cap on images in the active set.
pub const MAX_IMAGES: usize = 8;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Retry policy for per-concept image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// First backoff after a rate-limit signal; doubles per attempt.
    pub rate_limit_base: Duration,
    /// Flat delay before the single retry allowed for other failures.
    pub flat_delay: Duration,
}

impl Default for ImageRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_IMAGE_RETRY_MAX_ATTEMPTS,
            rate_limit_base: Duration::from_millis(DEFAULT_IMAGE_RETRY_BASE_MS),
            flat_delay: Duration::from_millis(DEFAULT_IMAGE_RETRY_FLAT_MS),
        }
    }
}

impl ImageRetryPolicy {
    /// Backoff before the attempt following a rate-limited `attempt` (0-based).
    #[must_use]
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub undo_window: Duration,
    pub toast_duration: Duration,
    pub toast_action_duration: Duration,
    pub image_retry: ImageRetryPolicy,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            undo_window: Duration::from_millis(DEFAULT_UNDO_WINDOW_MS),
            toast_duration: Duration::from_millis(DEFAULT_TOAST_MS),
            toast_action_duration: Duration::from_millis(DEFAULT_TOAST_ACTION_MS),
            image_retry: ImageRetryPolicy::default(),
        }
    }
}

impl StudioConfig {
    /// Build studio config from environment variables.
    ///
    /// Optional:
    /// - `STUDIO_DATA_DIR`: default `.marketboost`
    /// - `STUDIO_EXPORT_DIR`: default `exports`
    /// - `UNDO_WINDOW_MS`: default 7000
    /// - `TOAST_MS` / `TOAST_ACTION_MS`: default 3000 / 7000
    /// - `IMAGE_RETRY_MAX_ATTEMPTS`: default 3
    /// - `IMAGE_RETRY_BASE_MS`: default 2000
    /// - `IMAGE_RETRY_FLAT_MS`: default 1000
    #[must_use]
    pub fn from_env() -> Self {
        let data_dir = std::env::var("STUDIO_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
        let export_dir = std::env::var("STUDIO_EXPORT_DIR").unwrap_or_else(|_| DEFAULT_EXPORT_DIR.to_string());
        Self {
            data_dir: PathBuf::from(data_dir),
            export_dir: PathBuf::from(export_dir),
            undo_window: Duration::from_millis(env_parse("UNDO_WINDOW_MS", DEFAULT_UNDO_WINDOW_MS)),
            toast_duration: Duration::from_millis(env_parse("TOAST_MS", DEFAULT_TOAST_MS)),
            toast_action_duration: Duration::from_millis(env_parse("TOAST_ACTION_MS", DEFAULT_TOAST_ACTION_MS)),
            image_retry: ImageRetryPolicy {
                max_attempts: env_parse("IMAGE_RETRY_MAX_ATTEMPTS", DEFAULT_IMAGE_RETRY_MAX_ATTEMPTS).max(1),
                rate_limit_base: Duration::from_millis(env_parse("IMAGE_RETRY_BASE_MS", DEFAULT_IMAGE_RETRY_BASE_MS)),
                flat_delay: Duration::from_millis(env_parse("IMAGE_RETRY_FLAT_MS", DEFAULT_IMAGE_RETRY_FLAT_MS)),
            },
        }
    }
}
