//! Settings loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;

use super::defaults::*;
use super::SessionConfig;

/// Helper to set a config default with consistent error mapping
fn set_config_default<T: Into<config::Value>>(
    builder: LibConfigBuilder<config::builder::DefaultState>,
    key: &str,
    value: T,
) -> Result<LibConfigBuilder<config::builder::DefaultState>> {
    builder
        .set_default(key, value)
        .map_err(|e| Error::config(format!("Failed to set {key} default: {e}")))
}

impl SessionConfig {
    /// Loads settings from a TOML file with environment variable overrides
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. The file at `path`, when it exists
    /// 3. Environment variables prefixed with `BUNDLEWATCH_`
    ///    (e.g. `BUNDLEWATCH_DEBOUNCE_MS=50`)
    pub fn from_file(path: &Path) -> Result<Self> {
        let builder = ConfigLib::builder();

        let builder = set_config_default(builder, "debounce_ms", default_debounce_ms() as i64)?;
        let builder = set_config_default(
            builder,
            "max_queue_size",
            default_max_queue_size() as i64,
        )?;
        let builder = set_config_default(
            builder,
            "max_init_retries",
            default_max_init_retries() as i64,
        )?;
        let mut builder =
            set_config_default(builder, "retry_delay_ms", default_retry_delay_ms() as i64)?;

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("BUNDLEWATCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build settings: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize settings: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse settings from a TOML string, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
