//! Core file system watcher implementation
//!
//! This module wraps the notify crate: it owns the backend, the set of watched
//! paths and the task that turns raw notifications into debounced changes.

use crate::{config::WatcherConfig, debouncer::ChangeDebouncer, filter::PatternFilter};
use bundlewatch_core::change::{ChangeEvent, ChangeKind};
use bundlewatch_core::error::{Error, Result};
use dashmap::DashSet;
use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, PollWatcher, RecommendedWatcher,
    RecursiveMode, Watcher as NotifyWatcher,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

type Backend = Box<dyn NotifyWatcher + Send>;

/// Backend handle plus the bookkeeping of what it watches
struct WatchRegistry {
    /// Active notify backend, `None` once stopped
    backend: Mutex<Option<Backend>>,
    /// Files and directories registered with the backend
    watched: DashSet<PathBuf>,
    /// Missing files whose parent directory is watched for their creation
    awaiting: DashSet<PathBuf>,
    /// Directories watched only on behalf of `awaiting`
    parents: DashSet<PathBuf>,
}

impl WatchRegistry {
    fn new() -> Self {
        Self {
            backend: Mutex::new(None),
            watched: DashSet::new(),
            awaiting: DashSet::new(),
            parents: DashSet::new(),
        }
    }

    fn lock_backend(&self) -> Result<MutexGuard<'_, Option<Backend>>> {
        self.backend
            .lock()
            .map_err(|_| Error::watcher("Watcher backend lock poisoned"))
    }

    /// Whether `path` or one of its ancestors is registered
    fn covers(&self, path: &Path) -> bool {
        path.ancestors().any(|p| self.watched.contains(p))
    }

    fn is_relevant(&self, path: &Path) -> bool {
        self.awaiting.contains(path) || self.covers(path)
    }

    fn add(&self, path: &Path) -> Result<bool> {
        if self.watched.contains(path) {
            trace!("Already watching path: {:?}", path);
            return Ok(false);
        }
        if !path.exists() {
            self.await_creation(path)?;
            return Ok(false);
        }

        let mut backend = self.lock_backend()?;
        let Some(backend) = backend.as_mut() else {
            debug!("Watcher stopped, not watching {:?}", path);
            return Ok(false);
        };

        let recursive = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        backend
            .watch(path, recursive)
            .map_err(|e| Error::watcher(format!("Failed to watch path {path:?}: {e}")))?;
        self.watched.insert(path.to_path_buf());
        self.awaiting.remove(path);

        debug!(
            "Watching path: {:?} (recursive: {})",
            path,
            matches!(recursive, RecursiveMode::Recursive)
        );
        Ok(true)
    }

    /// Watch the parent directory so a missing file is picked up once it appears
    fn await_creation(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent().filter(|p| p.is_dir()) else {
            debug!("Skipping missing path: {:?}", path);
            return Ok(());
        };

        let mut backend = self.lock_backend()?;
        let Some(backend) = backend.as_mut() else {
            return Ok(());
        };
        if !self.awaiting.insert(path.to_path_buf()) {
            return Ok(());
        }

        if !self.parents.contains(parent) && !self.covers(parent) {
            if let Err(e) = backend.watch(parent, RecursiveMode::NonRecursive) {
                self.awaiting.remove(path);
                return Err(Error::watcher(format!(
                    "Failed to watch directory {parent:?}: {e}"
                )));
            }
            self.parents.insert(parent.to_path_buf());
        }
        debug!("Waiting for {:?} to be created", path);
        Ok(())
    }

    /// Follow deletions and re-creations of watched files
    ///
    /// Backends drop the watch of a deleted path. Returns extra changes to
    /// record when the path was replaced before the deletion was seen.
    fn reconcile(&self, change: &ChangeEvent) -> Vec<ChangeEvent> {
        let path = change.path();
        match change.kind {
            ChangeKind::Delete if self.watched.remove(path).is_some() => {
                if let Ok(mut backend) = self.lock_backend() {
                    if let Some(backend) = backend.as_mut() {
                        if let Err(e) = backend.unwatch(path) {
                            trace!("Unwatch of deleted path {:?} failed: {}", path, e);
                        }
                    }
                }

                if path.exists() {
                    return match self.add(path) {
                        Ok(_) => vec![ChangeEvent::new(path, ChangeKind::Create)],
                        Err(e) => {
                            warn!("Failed to watch replaced path {:?}: {}", path, e);
                            Vec::new()
                        }
                    };
                }
                if let Err(e) = self.await_creation(path) {
                    warn!("Cannot wait for {:?} to be recreated: {}", path, e);
                }
                Vec::new()
            }
            ChangeKind::Create | ChangeKind::Update
                if self.awaiting.contains(path) && path.exists() =>
            {
                if let Err(e) = self.add(path) {
                    warn!("Failed to watch recreated path {:?}: {}", path, e);
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn clear(&self) {
        self.watched.clear();
        self.awaiting.clear();
        self.parents.clear();
    }
}

/// Main file system watcher
pub struct FileWatcher {
    /// Configuration
    config: Arc<WatcherConfig>,
    registry: Arc<WatchRegistry>,
    /// Cancellation token for stopping the event processor
    cancellation_token: CancellationToken,
}

impl FileWatcher {
    /// Create the backend and start forwarding changes into `debouncer`
    ///
    /// Nothing is watched until [`FileWatcher::add_path`] is called.
    pub async fn start(
        config: WatcherConfig,
        filter: PatternFilter,
        debouncer: Arc<ChangeDebouncer>,
    ) -> Result<Self> {
        let (notify_tx, notify_rx) = mpsc::channel(config.max_queue_size);
        let cancellation_token = CancellationToken::new();

        let watcher = Self {
            config: Arc::new(config),
            registry: Arc::new(WatchRegistry::new()),
            cancellation_token,
        };

        let backend = watcher.init_backend_with_retry(notify_tx).await?;
        *watcher.registry.lock_backend()? = Some(backend);

        watcher.start_event_processor(notify_rx, filter, debouncer);
        Ok(watcher)
    }

    /// Initialize notify backend with retry logic
    async fn init_backend_with_retry(&self, tx: mpsc::Sender<NotifyEvent>) -> Result<Backend> {
        let mut attempts = 0;
        let max_attempts = self.config.recovery.max_init_retries;

        loop {
            attempts += 1;

            match self.create_backend(tx.clone()) {
                Ok(backend) => {
                    info!(
                        "File watcher initialized successfully (polling: {})",
                        self.config.uses_polling()
                    );
                    return Ok(backend);
                }
                Err(e) if attempts < max_attempts => {
                    warn!(
                        "Failed to initialize watcher (attempt {}/{}): {}",
                        attempts, max_attempts, e
                    );
                    tokio::time::sleep(self.config.recovery.retry_delay()).await;
                }
                Err(e) => {
                    error!("Failed to initialize watcher after {} attempts", attempts);
                    return Err(Error::watcher(format!(
                        "Watcher initialization failed: {e}"
                    )));
                }
            }
        }
    }

    /// Create the recommended backend, or the polling backend when configured
    fn create_backend(&self, tx: mpsc::Sender<NotifyEvent>) -> Result<Backend> {
        let handler = move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
            Ok(event) => {
                if let Err(e) = tx.try_send(event) {
                    error!("Failed to send notify event: {}", e);
                }
            }
            Err(e) => {
                error!("Notify error: {}", e);
            }
        };

        let backend: Backend = match self.config.poll_interval {
            Some(interval) => {
                let config = NotifyConfig::default()
                    .with_poll_interval(interval)
                    .with_compare_contents(self.config.compare_contents);
                Box::new(
                    PollWatcher::new(handler, config)
                        .map_err(|e| Error::watcher(format!("Failed to create watcher: {e}")))?,
                )
            }
            None => Box::new(
                RecommendedWatcher::new(handler, NotifyConfig::default())
                    .map_err(|e| Error::watcher(format!("Failed to create watcher: {e}")))?,
            ),
        };

        Ok(backend)
    }

    /// Watch a path for the rest of the session
    ///
    /// Returns `false` when the path was already watched, does not exist yet,
    /// or the watcher has been stopped. A missing file is watched once it is
    /// created, and a watched file that is deleted is watched again when it
    /// comes back.
    pub fn add_path(&self, path: impl AsRef<Path>) -> Result<bool> {
        self.registry.add(path.as_ref())
    }

    /// Start the event processor
    fn start_event_processor(
        &self,
        mut notify_rx: mpsc::Receiver<NotifyEvent>,
        filter: PatternFilter,
        debouncer: Arc<ChangeDebouncer>,
    ) {
        let cancel_token = self.cancellation_token.clone();
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    event = notify_rx.recv() => {
                        let Some(event) = event else { break };
                        trace!("Received notify event: {:?}", event);
                        for change in convert_notify_event(event) {
                            if !registry.is_relevant(change.path()) {
                                trace!("Ignoring unwatched path: {:?}", change.path());
                                continue;
                            }
                            let follow_ups = registry.reconcile(&change);
                            for change in std::iter::once(change).chain(follow_ups) {
                                if filter.should_ignore(change.path()) {
                                    trace!("Ignoring path: {:?}", change.path());
                                    continue;
                                }
                                debouncer.record(change);
                            }
                        }
                    }
                }
            }
            debug!("Event processor stopped");
        });
    }

    /// Stop watching all paths
    pub fn stop(&self) -> Result<()> {
        self.cancellation_token.cancel();
        if let Some(_backend) = self.registry.lock_backend()?.take() {
            self.registry.clear();
            info!("File watcher stopped");
        }
        Ok(())
    }

    /// Get currently watched paths
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.registry.watched.iter().map(|p| p.key().clone()).collect()
    }

    /// Check if a path is being watched
    pub fn is_watching(&self, path: &Path) -> bool {
        self.registry.covers(path)
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

/// Map a raw notification to per-path changes
///
/// The polling backend reports content writes as write-time metadata changes.
fn convert_notify_event(event: NotifyEvent) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Modify(
            ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Metadata(MetadataKind::WriteTime),
        ) => ChangeKind::Update,
        EventKind::Modify(ModifyKind::Name(mode)) => return convert_rename(mode, event.paths),
        EventKind::Remove(_) => ChangeKind::Delete,
        _ => return Vec::new(),
    };
    event
        .paths
        .into_iter()
        .map(|path| ChangeEvent::new(path, kind))
        .collect()
}

/// A rename deletes the old name and creates the new one
fn convert_rename(mode: RenameMode, paths: Vec<PathBuf>) -> Vec<ChangeEvent> {
    let mut paths = paths.into_iter();
    match mode {
        RenameMode::From => paths
            .map(|path| ChangeEvent::new(path, ChangeKind::Delete))
            .collect(),
        RenameMode::To => paths
            .map(|path| ChangeEvent::new(path, ChangeKind::Create))
            .collect(),
        RenameMode::Both => paths
            .next()
            .map(|from| ChangeEvent::new(from, ChangeKind::Delete))
            .into_iter()
            .chain(paths.next().map(|to| ChangeEvent::new(to, ChangeKind::Create)))
            .collect(),
        // Backends that cannot tell the two sides apart
        _ => paths
            .map(|path| {
                let kind = if path.exists() {
                    ChangeKind::Create
                } else {
                    ChangeKind::Delete
                };
                ChangeEvent::new(path, kind)
            })
            .collect(),
    }
}
