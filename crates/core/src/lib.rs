//! Core types and traits for bundlewatch
//!
//! This crate provides the foundational abstractions shared by the file watcher
//! and the watch session, including:
//!
//! - **Options**: The user-facing bundler option surface
//! - **Normalization**: Conversion of options into a canonical engine request
//! - **Plugins**: Hook contracts for local plugins and builtin plugin options
//! - **Engine**: The contract with the build engine
//! - **Configuration**: Session tuning settings
//! - **Error handling**: Unified error types
//!

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod change;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod options;
pub mod plugin;
pub mod request;

// Re-export main types for convenience
pub use change::{ChangeDetail, ChangeEvent, ChangeKind};
pub use config::SessionConfig;
pub use engine::{BuildEngine, BuildError, BuildOutput, OutputAsset};
pub use error::{Error, Result, ResultExt};
pub use normalize::{normalize, normalize_log_level};
pub use options::{
    ExternalFn, ExternalOption, InjectImportOption, InputOption, InputOptions, JsxMode,
    JsxOptions, NotifyOptions, OnLogFn, OutputOptions, PatternsOption, Platform, PluginOption,
    ResolveOptions, StringOrRegex, WatchOptions,
};
pub use plugin::{
    BuiltinPlugin, BuiltinPluginName, ParallelPlugin, Plugin, PluginContext, PluginDescriptor,
    WatchFileRequests,
};
pub use request::{CanonicalRequest, LogLevel, LogRecord, WatchRequest};

/// Version of the core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::engine::{BuildEngine, BuildError, BuildOutput};
    pub use crate::error::{Result, ResultExt};
    pub use crate::options::{InputOptions, OutputOptions};
    pub use crate::plugin::{Plugin, PluginContext};
}
