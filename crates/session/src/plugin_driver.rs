//! Invokes local plugin hooks in declaration order

use bundlewatch_core::change::ChangeDetail;
use bundlewatch_core::engine::BuildError;
use bundlewatch_core::error::Error;
use bundlewatch_core::plugin::{Plugin, PluginContext};
use bundlewatch_core::request::CanonicalRequest;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

pub struct PluginDriver {
    plugins: Vec<Arc<dyn Plugin>>,
    closed: AtomicBool,
}

impl PluginDriver {
    /// Collect the plugins whose hooks run in this process
    pub fn new(request: &CanonicalRequest) -> Self {
        let plugins: Vec<_> = request
            .plugins
            .iter()
            .flatten()
            .filter_map(|descriptor| descriptor.local_plugin().cloned())
            .collect();
        debug!("Plugin driver created with {} local plugins", plugins.len());
        Self {
            plugins,
            closed: AtomicBool::new(false),
        }
    }

    /// Run every `build_start` hook; the first failure fails the build
    pub async fn build_start(&self, ctx: &PluginContext) -> Result<(), BuildError> {
        for plugin in &self.plugins {
            plugin.build_start(ctx).await.map_err(|e| {
                let err = Error::plugin(plugin.name(), "buildStart", format!("{e:#}"));
                BuildError::new(BuildError::PLUGIN_ERROR, err.to_string())
            })?;
        }
        Ok(())
    }

    /// Run every `watch_change` hook; failures are only logged
    pub async fn watch_change(&self, path: &Path, detail: ChangeDetail) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.watch_change(path, detail).await {
                error!(
                    "{}",
                    Error::plugin(plugin.name(), "watchChange", format!("{e:#}"))
                );
            }
        }
    }

    /// Run every `close_watcher` hook, at most once per driver
    pub async fn close_watcher(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for plugin in &self.plugins {
            if let Err(e) = plugin.close_watcher().await {
                error!(
                    "{}",
                    Error::plugin(plugin.name(), "closeWatcher", format!("{e:#}"))
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
