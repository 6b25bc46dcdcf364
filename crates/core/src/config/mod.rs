//! Runtime settings for watch sessions
//!
//! These settings tune the session machinery itself (debounce window, queue
//! sizes, backend retries). They are separate from the bundler options a caller
//! passes to `watch()`, and can be loaded from a TOML file and/or environment
//! variables.

mod defaults;
mod loading;


use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use defaults::*;

/// Session tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Quiet period after the last relevant change before a rebuild is triggered
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Capacity of the channel between the notify backend and the session
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Attempts made to create the filesystem backend before giving up
    #[serde(default = "default_max_init_retries")]
    pub max_init_retries: u32,

    /// Delay between backend creation attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            max_queue_size: default_max_queue_size(),
            max_init_retries: default_max_init_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl SessionConfig {
    /// Debounce window as a duration
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delay between backend creation attempts as a duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(Error::config(
                "max_queue_size must be greater than 0".to_string(),
            ));
        }

        if self.max_init_retries == 0 {
            return Err(Error::config(
                "max_init_retries must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
