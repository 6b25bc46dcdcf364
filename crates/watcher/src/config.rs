//! Configuration types for the file watcher
//!
//! This module provides immutable configuration structures for controlling
//! the notify backend, debouncing and backend recovery.

use bundlewatch_core::config::SessionConfig;
use bundlewatch_core::request::NotifyRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable configuration for the file watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Debounce window in milliseconds (default: 30ms)
    pub debounce_ms: u64,
    /// Maximum number of raw notifications in flight (default: 4096)
    pub max_queue_size: usize,
    /// Use the polling backend with this interval instead of native events
    pub poll_interval: Option<Duration>,
    /// Polling backend compares file contents instead of modification times
    pub compare_contents: bool,
    /// Backend creation retries
    pub recovery: RecoveryConfig,
}

impl WatcherConfig {
    /// Create configuration from builder
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }

    /// Start from session settings
    pub fn from_settings(settings: &SessionConfig) -> WatcherConfigBuilder {
        Self::builder()
            .debounce_ms(settings.debounce_ms)
            .max_queue_size(settings.max_queue_size)
            .max_init_retries(settings.max_init_retries)
            .retry_delay_ms(settings.retry_delay_ms)
    }

    /// Get the debounce duration
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Whether the polling backend is selected
    pub fn uses_polling(&self) -> bool {
        self.poll_interval.is_some()
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        let settings = SessionConfig::default();
        Self {
            debounce_ms: settings.debounce_ms,
            max_queue_size: settings.max_queue_size,
            poll_interval: None,
            compare_contents: false,
            recovery: RecoveryConfig {
                max_init_retries: settings.max_init_retries,
                retry_delay_ms: settings.retry_delay_ms,
            },
        }
    }
}

/// Builder for WatcherConfig
#[derive(Debug, Default)]
pub struct WatcherConfigBuilder {
    config: WatcherConfig,
}

impl WatcherConfigBuilder {
    /// Set debounce window in milliseconds
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    /// Set maximum queue size
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.config.max_queue_size = size;
        self
    }

    /// Switch to the polling backend
    pub fn poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn compare_contents(mut self, compare: bool) -> Self {
        self.config.compare_contents = compare;
        self
    }

    /// Apply the backend knobs from a watch request
    pub fn notify(self, notify: Option<&NotifyRequest>) -> Self {
        match notify {
            Some(notify) => self
                .poll_interval(notify.poll_interval)
                .compare_contents(notify.compare_contents),
            None => self,
        }
    }

    /// Set maximum backend creation attempts
    pub fn max_init_retries(mut self, retries: u32) -> Self {
        self.config.recovery.max_init_retries = retries;
        self
    }

    /// Set delay between backend creation attempts
    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.recovery.retry_delay_ms = ms;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WatcherConfig {
        self.config
    }
}

/// Recovery configuration for backend initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Maximum attempts for backend initialization
    pub max_init_retries: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl RecoveryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_config_builder() {
        let config = WatcherConfig::builder()
            .debounce_ms(100)
            .max_queue_size(16)
            .poll_interval(Some(Duration::from_millis(250)))
            .compare_contents(true)
            .build();

        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.max_queue_size, 16);
        assert!(config.uses_polling());
        assert!(config.compare_contents);
        assert_eq!(config.debounce_duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_defaults_follow_session_settings() {
        let config = WatcherConfig::default();
        assert_eq!(config.debounce_ms, 30);
        assert_eq!(config.max_queue_size, 4096);
        assert_eq!(config.recovery.max_init_retries, 3);
        assert_eq!(config.recovery.retry_delay(), Duration::from_millis(100));
        assert!(!config.uses_polling());
    }

    #[test]
    fn test_from_settings() {
        let settings = SessionConfig {
            debounce_ms: 75,
            max_queue_size: 8,
            max_init_retries: 5,
            retry_delay_ms: 10,
        };
        let config = WatcherConfig::from_settings(&settings)
            .notify(Some(&NotifyRequest {
                poll_interval: Some(Duration::from_secs(1)),
                compare_contents: false,
            }))
            .build();

        assert_eq!(config.debounce_ms, 75);
        assert_eq!(config.debounce_duration(), Duration::from_millis(75));
        assert_eq!(config.max_queue_size, 8);
        assert_eq!(config.recovery.max_init_retries, 5);
        assert_eq!(config.poll_interval, Some(Duration::from_secs(1)));
    }
}
