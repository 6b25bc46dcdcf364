#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! Watch mode for a JavaScript bundler
//!
//! [`watch`] normalizes the bundler options once, performs an initial build and
//! then rebuilds whenever a watched file changes. Progress is reported through
//! per-session listeners:
//!
//! - `event`: `START`, `BUNDLE_START`, `BUNDLE_END` or `ERROR`, `END` per build
//! - `change`: one per distinct changed path, before the rebuild
//! - `restart`: right before a rebuild's `START`
//! - `close`: exactly once, last
//!
//! Events of the first build are kept until the first rebuild begins, so
//! listeners attached right after [`watch`] returns see the whole first cycle.
//!
//! ```no_run
//! use bundlewatch::{watch, BuildEngine, InputOptions, OutputOptions};
//! use std::sync::Arc;
//!
//! # async fn example(engine: Arc<dyn BuildEngine>) -> bundlewatch::Result<()> {
//! let input = InputOptions {
//!     input: "src/main.js".into(),
//!     ..Default::default()
//! };
//! let watcher = watch(input, OutputOptions::default(), engine).await?;
//! watcher.on_event(|event| println!("{}", event.code()));
//!
//! // ...
//! watcher.close().await?;
//! # Ok(())
//! # }
//! ```

mod emitter;
mod event;
mod plugin_driver;
mod session;
mod writer;

pub use emitter::{Listener, WatcherEmitter};
pub use event::{BuildFailure, BundleEvent, WatcherEventData, WatcherEventName};
pub use plugin_driver::PluginDriver;
pub use session::{watch, SessionState, Watcher};
pub use writer::write_assets;

pub use bundlewatch_core::{
    BuildEngine, BuildError, BuildOutput, ChangeDetail, ChangeKind, Error, InputOptions,
    OutputAsset, OutputOptions, Plugin, PluginContext, Result, SessionConfig,
};
