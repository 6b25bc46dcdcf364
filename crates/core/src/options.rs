//! User-facing bundler options
//!
//! These types mirror the loosely-typed configuration surface callers hand to
//! `watch()`. Every shape that can take more than one form is an enum; the
//! normalizer in [`crate::normalize`] resolves them into a
//! [`crate::request::CanonicalRequest`].

use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::plugin::{BuiltinPlugin, ParallelPlugin, Plugin};
use crate::request::{LogLevel, LogRecord};

/// Entry points: a plain list of paths or ordered `name -> path` pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOption {
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl Default for InputOption {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<&str> for InputOption {
    fn from(value: &str) -> Self {
        Self::List(vec![value.to_string()])
    }
}

impl From<String> for InputOption {
    fn from(value: String) -> Self {
        Self::List(vec![value])
    }
}

impl From<Vec<String>> for InputOption {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<(String, String)>> for InputOption {
    fn from(value: Vec<(String, String)>) -> Self {
        Self::Map(value)
    }
}

/// An exact string or a regular expression
#[derive(Debug, Clone)]
pub enum StringOrRegex {
    String(String),
    Regex(Regex),
}

impl StringOrRegex {
    /// Exact equality for strings, a regex search for patterns
    pub fn matches_exact(&self, value: &str) -> bool {
        match self {
            Self::String(s) => s == value,
            Self::Regex(re) => re.is_match(value),
        }
    }
}

impl PartialEq for StringOrRegex {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl From<&str> for StringOrRegex {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for StringOrRegex {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Regex> for StringOrRegex {
    fn from(value: Regex) -> Self {
        Self::Regex(value)
    }
}

/// A single string/regex or a list mixing both
#[derive(Debug, Clone, PartialEq)]
pub enum PatternsOption {
    Single(StringOrRegex),
    List(Vec<StringOrRegex>),
}

impl From<StringOrRegex> for PatternsOption {
    fn from(value: StringOrRegex) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for PatternsOption {
    fn from(value: &str) -> Self {
        Self::Single(value.into())
    }
}

impl From<Regex> for PatternsOption {
    fn from(value: Regex) -> Self {
        Self::Single(value.into())
    }
}

impl From<Vec<StringOrRegex>> for PatternsOption {
    fn from(value: Vec<StringOrRegex>) -> Self {
        Self::List(value)
    }
}

/// User predicate `(id, importer, is_resolved) -> Option<bool>`
#[derive(Clone)]
pub struct ExternalFn(Arc<dyn Fn(&str, Option<&str>, bool) -> Option<bool> + Send + Sync>);

impl ExternalFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, Option<&str>, bool) -> Option<bool> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, id: &str, importer: Option<&str>, is_resolved: bool) -> Option<bool> {
        (self.0)(id, importer, is_resolved)
    }
}

impl fmt::Debug for ExternalFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExternalFn(..)")
    }
}

impl PartialEq for ExternalFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Which module ids are left out of the bundle
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalOption {
    Function(ExternalFn),
    Patterns(PatternsOption),
}

/// User log callback receiving engine diagnostics
#[derive(Clone)]
pub struct OnLogFn(Arc<dyn Fn(LogLevel, &LogRecord) + Send + Sync>);

impl OnLogFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(LogLevel, &LogRecord) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, level: LogLevel, record: &LogRecord) {
        (self.0)(level, record)
    }
}

impl fmt::Debug for OnLogFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnLogFn(..)")
    }
}

impl PartialEq for OnLogFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Module resolution rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// `name -> replacement`
    pub alias: Option<Vec<(String, String)>>,
    /// `extension -> [replacement extensions]`
    pub extension_alias: Option<Vec<(String, Vec<String>)>>,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Node,
    Browser,
    Neutral,
}

/// Injected import: `"jquery"` or `["es6-promise", "Promise"]` / `["node:fs", "*"]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectImportOption {
    Source(String),
    Pair(String, String),
}

impl From<&str> for InjectImportOption {
    fn from(value: &str) -> Self {
        Self::Source(value.to_string())
    }
}

impl From<(&str, &str)> for InjectImportOption {
    fn from((from, imported): (&str, &str)) -> Self {
        Self::Pair(from.to_string(), imported.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxMode {
    Classic,
    Automatic,
    Preserve,
}

impl JsxMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Automatic => "automatic",
            Self::Preserve => "preserve",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsxOptions {
    /// Defaults to classic
    pub mode: Option<JsxMode>,
    pub factory: Option<String>,
    pub fragment: Option<String>,
    /// Import source used in classic mode
    pub import_source: Option<String>,
    /// Import source used in automatic mode
    pub jsx_import_source: Option<String>,
    pub development: Option<bool>,
    pub refresh: Option<bool>,
}

/// Polling backend settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyOptions {
    pub poll_interval: Option<Duration>,
    pub compare_contents: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchOptions {
    /// Build normally but never write output to disk
    pub skip_write: bool,
    pub include: Option<PatternsOption>,
    pub exclude: Option<PatternsOption>,
    pub notify: Option<NotifyOptions>,
    /// Deprecated backend options; only produce a warning
    pub chokidar: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentalOptions {
    pub strict_execution_order: Option<bool>,
    pub disable_live_bindings: Option<bool>,
}

/// One entry of the plugin list
#[derive(Clone)]
pub enum PluginOption {
    /// Plugin object whose hooks run in this process
    Local(Arc<dyn Plugin>),
    /// Plugin registered out-of-band on worker threads
    Parallel(ParallelPlugin),
    /// Plugin implemented by the engine, selected by tag
    Builtin(BuiltinPlugin),
}

impl PluginOption {
    pub fn local(plugin: impl Plugin + 'static) -> Self {
        Self::Local(Arc::new(plugin))
    }
}

impl fmt::Debug for PluginOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(plugin) => f.debug_tuple("Local").field(&plugin.name()).finish(),
            Self::Parallel(marker) => f.debug_tuple("Parallel").field(marker).finish(),
            Self::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
        }
    }
}

/// Input-side bundler options
#[derive(Debug, Clone, Default)]
pub struct InputOptions {
    pub input: InputOption,
    /// Defaults to the process working directory
    pub cwd: Option<PathBuf>,
    pub external: Option<ExternalOption>,
    pub resolve: Option<ResolveOptions>,
    pub platform: Option<Platform>,
    pub shim_missing_exports: Option<bool>,
    /// `silent`, `warn`, `info` or `debug`; defaults to `info`
    pub log_level: Option<String>,
    pub on_log: Option<OnLogFn>,
    pub treeshake: Option<bool>,
    pub module_types: Option<Vec<(String, String)>>,
    pub define: Option<Vec<(String, String)>>,
    pub inject: Option<Vec<(String, InjectImportOption)>>,
    pub experimental: Option<ExperimentalOptions>,
    pub profiler_names: Option<bool>,
    pub jsx: Option<JsxOptions>,
    pub watch: Option<WatchOptions>,
    pub drop_labels: Option<Vec<String>>,
    pub plugins: Vec<PluginOption>,
}

/// Output-side bundler options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Output directory relative to `cwd`; defaults to `dist`
    pub dir: Option<PathBuf>,
}
