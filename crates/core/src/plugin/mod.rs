//! Plugin contracts
//!
//! Local plugins expose async hooks that the session invokes at fixed points of
//! a watch cycle. Builtin plugins are implemented by the engine and only carry
//! validated options. Parallel plugins are registered out-of-band and never
//! reach the request.

mod builtin;

pub use builtin::{
    normalize_builtin, AliasEntry, AliasPluginOptions, BuiltinPlugin, BuiltinPluginDescriptor,
    BuiltinPluginName, BuiltinPluginOptions, ImportGlobPluginOptions, ManifestPluginOptions,
    ModulePreloadPolyfillPluginOptions, ReplacePluginOptions,
};

use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use tracing::debug;

use crate::change::ChangeDetail;

/// Hooks a local plugin may implement; every hook defaults to a no-op
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> Cow<'static, str>;

    /// Runs at the start of every build, before the engine is invoked
    async fn build_start(&self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs once per distinct changed path before the rebuild it triggers
    async fn watch_change(&self, _path: &Path, _detail: ChangeDetail) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs exactly once while the session is closing
    async fn close_watcher(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Build-scoped handle given to `build_start`
///
/// Paths passed to [`PluginContext::add_watch_file`] are sent back to the
/// session, which adds them to its watched set once the hook phase is over.
pub struct PluginContext {
    cwd: PathBuf,
    watch_files: Sender<PathBuf>,
}

/// Receiving side of [`PluginContext::add_watch_file`], owned by the session
pub struct WatchFileRequests {
    rx: Receiver<PathBuf>,
}

impl PluginContext {
    pub fn new(cwd: impl Into<PathBuf>) -> (Self, WatchFileRequests) {
        let (tx, rx) = channel();
        (
            Self {
                cwd: cwd.into(),
                watch_files: tx,
            },
            WatchFileRequests { rx },
        )
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Watch `path` for the rest of the session, even if no module imports it
    pub fn add_watch_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        };
        if self.watch_files.send(path.clone()).is_err() {
            debug!("Dropping watch file request for {:?}: build already finished", path);
        }
    }
}

impl WatchFileRequests {
    /// All paths requested so far, in request order
    pub fn drain(&self) -> Vec<PathBuf> {
        self.rx.try_iter().collect()
    }
}

/// Marker for a plugin that runs on worker threads
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelPlugin {
    pub file_url: String,
    pub options: serde_json::Value,
}

/// Engine-facing form of a local plugin
#[derive(Clone)]
pub struct LocalPluginDescriptor {
    pub name: String,
    pub plugin: Arc<dyn Plugin>,
}

impl LocalPluginDescriptor {
    pub fn new(plugin: &Arc<dyn Plugin>) -> Self {
        Self {
            name: plugin.name().into_owned(),
            plugin: Arc::clone(plugin),
        }
    }
}

impl fmt::Debug for LocalPluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPluginDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for LocalPluginDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.plugin, &other.plugin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluginDescriptor {
    Local(LocalPluginDescriptor),
    Builtin(BuiltinPluginDescriptor),
}

impl PluginDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Local(local) => &local.name,
            Self::Builtin(builtin) => builtin.name.as_str(),
        }
    }

    /// The hook object, for plugins whose hooks run in this process
    pub fn local_plugin(&self) -> Option<&Arc<dyn Plugin>> {
        match self {
            Self::Local(local) => Some(&local.plugin),
            Self::Builtin(_) => None,
        }
    }
}
