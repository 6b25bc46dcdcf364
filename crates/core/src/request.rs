//! Canonical, engine-ready build request
//!
//! A [`CanonicalRequest`] has every polymorphic user option resolved into a
//! single explicit shape. It is produced by [`crate::normalize::normalize`] and
//! reused unchanged for every rebuild of a session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::options::{ExternalFn, OnLogFn, Platform, StringOrRegex};
use crate::plugin::PluginDescriptor;

/// Virtual module ids are prefixed with this character and are never external
pub const VIRTUAL_MODULE_PREFIX: char = '\0';

/// Engine log verbosity, ordered from quietest to loudest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    Silent = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    /// Whether a message at `level` passes this threshold
    pub fn allows(&self, level: LogLevel) -> bool {
        level != LogLevel::Silent && level <= *self
    }
}

/// A diagnostic reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub code: Option<String>,
    pub message: String,
}

impl LogRecord {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Forwards engine diagnostics to the user's `on_log` callback
#[derive(Debug, Clone, PartialEq)]
pub struct LogHandler(OnLogFn);

impl LogHandler {
    pub(crate) fn new(on_log: OnLogFn) -> Self {
        Self(on_log)
    }

    pub fn log(&self, level: LogLevel, record: &LogRecord) {
        self.0.call(level, record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    pub name: Option<String>,
    pub import: String,
}

/// Decides whether a module id stays out of the bundle
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalMatcher {
    Function(ExternalFn),
    Patterns(Vec<StringOrRegex>),
}

impl ExternalMatcher {
    pub fn is_external(&self, id: &str, importer: Option<&str>, is_resolved: bool) -> bool {
        match self {
            Self::Function(f) => {
                if id.starts_with(VIRTUAL_MODULE_PREFIX) {
                    return false;
                }
                f.call(id, importer, is_resolved).unwrap_or(false)
            }
            Self::Patterns(patterns) => patterns.iter().any(|p| p.matches_exact(id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasItem {
    pub find: String,
    pub replacements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionAliasItem {
    pub target: String,
    pub replacements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    pub alias: Option<Vec<AliasItem>>,
    pub extension_alias: Option<Vec<ExtensionAliasItem>>,
    pub alias_fields: Option<Vec<Vec<String>>>,
    pub condition_names: Option<Vec<String>>,
    pub exports_fields: Option<Vec<Vec<String>>>,
    pub extensions: Option<Vec<String>>,
    pub main_fields: Option<Vec<String>>,
    pub main_files: Option<Vec<String>>,
    pub modules: Option<Vec<String>>,
    pub symlinks: Option<bool>,
    pub tsconfig_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectImport {
    /// `import { imported as alias } from 'from'`
    Named {
        alias: String,
        from: String,
        imported: String,
    },
    /// `import * as alias from 'from'`
    Namespace { alias: String, from: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentalRequest {
    pub strict_execution_order: Option<bool>,
    pub disable_live_bindings: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxRequest {
    pub runtime: String,
    pub import_source: Option<String>,
    pub pragma: Option<String>,
    pub pragma_frag: Option<String>,
    pub development: Option<bool>,
    pub refresh: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    pub poll_interval: Option<Duration>,
    pub compare_contents: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchRequest {
    pub skip_write: bool,
    pub include: Vec<StringOrRegex>,
    pub exclude: Vec<StringOrRegex>,
    pub notify: Option<NotifyRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    /// Absolute output directory
    pub dir: PathBuf,
}

/// Fully normalized request handed to the build engine
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    pub cwd: PathBuf,
    pub input: Vec<InputItem>,
    pub external: Option<ExternalMatcher>,
    pub resolve: Option<ResolveRequest>,
    pub platform: Option<Platform>,
    pub shim_missing_exports: Option<bool>,
    pub log_level: LogLevel,
    pub on_log: Option<LogHandler>,
    pub treeshake: Option<bool>,
    pub module_types: Option<Vec<(String, String)>>,
    pub define: Option<Vec<(String, String)>>,
    pub inject: Option<Vec<InjectImport>>,
    pub experimental: ExperimentalRequest,
    pub profiler_names: Option<bool>,
    pub jsx: Option<JsxRequest>,
    pub watch: Option<WatchRequest>,
    pub drop_labels: Option<Vec<String>>,
    /// `None` slots stand for plugins registered out-of-band
    pub plugins: Vec<Option<PluginDescriptor>>,
    pub output: OutputRequest,
}

impl CanonicalRequest {
    /// Watch settings, falling back to defaults when the user gave none
    pub fn watch_options(&self) -> WatchRequest {
        self.watch.clone().unwrap_or_default()
    }

    /// Deliver an engine diagnostic to `on_log` if it passes the log level
    pub fn report_log(&self, level: LogLevel, record: &LogRecord) {
        if !self.log_level.allows(level) {
            return;
        }
        if let Some(handler) = &self.on_log {
            handler.log(level, record);
        }
    }
}
