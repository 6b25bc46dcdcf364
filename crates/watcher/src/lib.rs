#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

//! File system watching for watch-mode rebuilds
//!
//! This crate turns raw filesystem notifications into rebuild triggers:
//! - Native or polling backends via notify, with retrying initialization
//! - Include/exclude filtering with globs and regexes
//! - Debouncing that coalesces bursts into one trigger without losing changes
//!
//! # Example
//!
//! ```no_run
//! use bundlewatch_watcher::{ChangeDebouncer, FileWatcher, PatternFilter, WatcherConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WatcherConfig::default();
//! let debouncer = Arc::new(ChangeDebouncer::new(config.debounce_duration()));
//! let watcher = FileWatcher::start(config, PatternFilter::default(), Arc::clone(&debouncer)).await?;
//!
//! watcher.add_path("/path/to/project/src/main.js")?;
//!
//! loop {
//!     debouncer.due().await;
//!     for change in debouncer.take() {
//!         println!("{} {:?}", change.kind, change.path);
//!     }
//! }
//! # }
//! ```

// Private implementation modules
mod config;
mod debouncer;
mod events;
mod filter;
mod watcher;

// Public exports - minimal API surface
pub use config::{RecoveryConfig, WatcherConfig, WatcherConfigBuilder};
pub use debouncer::ChangeDebouncer;
pub use filter::PatternFilter;
pub use watcher::FileWatcher;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::WatcherConfig;
    pub use crate::debouncer::ChangeDebouncer;
    pub use crate::watcher::FileWatcher;
}
