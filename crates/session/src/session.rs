//! Watch session orchestration
//!
//! A [`Watcher`] owns one long-lived build session. A single orchestrator task
//! performs the initial build, then waits for debounced changes and rebuilds,
//! so at most one build runs at a time. Changes recorded while a build runs
//! stay pending and are consumed by the next one.

use crate::emitter::WatcherEmitter;
use crate::event::{BuildFailure, BundleEvent, WatcherEventData, WatcherEventName};
use crate::plugin_driver::PluginDriver;
use crate::writer::write_assets;
use bundlewatch_core::change::{ChangeDetail, ChangeEvent};
use bundlewatch_core::config::SessionConfig;
use bundlewatch_core::engine::{BuildEngine, BuildError};
use bundlewatch_core::error::Result;
use bundlewatch_core::normalize::normalize;
use bundlewatch_core::options::{InputOptions, OutputOptions};
use bundlewatch_core::plugin::PluginContext;
use bundlewatch_core::request::CanonicalRequest;
use bundlewatch_watcher::{ChangeDebouncer, FileWatcher, PatternFilter, WatcherConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of a watch session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, first build not started yet
    Starting,
    Rebuilding,
    Watching,
    /// Terminal
    Closed,
}

/// State shared between the handle and the orchestrator task
struct Session {
    request: CanonicalRequest,
    engine: Arc<dyn BuildEngine>,
    emitter: WatcherEmitter,
    plugins: PluginDriver,
    debouncer: Arc<ChangeDebouncer>,
    file_watcher: FileWatcher,
    state: RwLock<SessionState>,
    build_seq: AtomicU64,
    last_build_ok: AtomicBool,
}

/// Handle to a running watch session
///
/// Dropping the handle stops the orchestrator without running the close
/// sequence; call [`Watcher::close`] for an orderly shutdown.
pub struct Watcher {
    session: Arc<Session>,
    task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    closed: AtomicBool,
    cancellation_token: CancellationToken,
}

/// Create a session and start its first build
///
/// Configuration errors are returned here; build errors only ever travel
/// through `ERROR` events. Listeners attached to the returned handle before
/// the first rebuild still receive the first build's events, replayed in
/// order ahead of live ones.
pub async fn watch(
    input: InputOptions,
    output: OutputOptions,
    engine: Arc<dyn BuildEngine>,
) -> Result<Watcher> {
    let watcher = Watcher::new(input, output, engine).await?;
    watcher.start();
    Ok(watcher)
}

impl Watcher {
    /// Create a session in the `Starting` state with default settings
    pub async fn new(
        input: InputOptions,
        output: OutputOptions,
        engine: Arc<dyn BuildEngine>,
    ) -> Result<Self> {
        Self::with_settings(input, output, engine, SessionConfig::default()).await
    }

    /// Create a session in the `Starting` state
    pub async fn with_settings(
        input: InputOptions,
        output: OutputOptions,
        engine: Arc<dyn BuildEngine>,
        settings: SessionConfig,
    ) -> Result<Self> {
        settings.validate()?;
        let request = normalize(&input, &output)?;
        let watch = request.watch_options();

        let filter = PatternFilter::new(&request.cwd, &watch.include, &watch.exclude)?;
        let config = WatcherConfig::from_settings(&settings)
            .notify(watch.notify.as_ref())
            .build();
        let debouncer = Arc::new(ChangeDebouncer::new(config.debounce_duration()));
        let file_watcher = FileWatcher::start(config, filter, Arc::clone(&debouncer)).await?;

        let plugins = PluginDriver::new(&request);
        info!(
            "Watch session created for {} entries (output: {})",
            request.input.len(),
            request.output.dir.display()
        );

        Ok(Self {
            session: Arc::new(Session {
                request,
                engine,
                emitter: WatcherEmitter::with_replay(),
                plugins,
                debouncer,
                file_watcher,
                state: RwLock::new(SessionState::Starting),
                build_seq: AtomicU64::new(0),
                last_build_ok: AtomicBool::new(false),
            }),
            task: Mutex::new(None),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Spawn the orchestrator; only the first call has an effect
    pub fn start(&self) {
        if self.closed.load(Ordering::SeqCst) || self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = Arc::clone(&self.session);
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move { session.run(cancel).await });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Register a listener for one notification kind
    pub fn on<F>(&self, name: WatcherEventName, listener: F) -> &Self
    where
        F: Fn(&WatcherEventData) + Send + Sync + 'static,
    {
        self.session.emitter.on(name, listener);
        self
    }

    /// Listen to build cycle events
    pub fn on_event<F>(&self, listener: F) -> &Self
    where
        F: Fn(&BundleEvent) + Send + Sync + 'static,
    {
        self.on(WatcherEventName::Event, move |data| {
            if let WatcherEventData::Event(event) = data {
                listener(event);
            }
        })
    }

    /// Listen to changed paths
    pub fn on_change<F>(&self, listener: F) -> &Self
    where
        F: Fn(&Path, ChangeDetail) + Send + Sync + 'static,
    {
        self.on(WatcherEventName::Change, move |data| {
            if let WatcherEventData::Change { path, detail } = data {
                listener(path, *detail);
            }
        })
    }

    pub fn on_restart<F>(&self, listener: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(WatcherEventName::Restart, move |_| listener())
    }

    pub fn on_close<F>(&self, listener: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(WatcherEventName::Close, move |_| listener())
    }

    pub async fn state(&self) -> SessionState {
        *self.session.state.read().await
    }

    /// Whether the most recent completed build succeeded
    pub fn last_build_succeeded(&self) -> bool {
        self.session.last_build_ok.load(Ordering::SeqCst)
    }

    /// Paths currently watched by the session
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.session.file_watcher.watched_paths()
    }

    /// Tear the session down
    ///
    /// An in-flight build runs to completion and emits its `END` first. Then
    /// the backend stops, `close` is emitted, `closeWatcher` hooks run and all
    /// listeners are dropped. Calling this again is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Watch session already closed");
            return Ok(());
        }
        info!("Closing watch session");
        self.cancellation_token.cancel();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Watch session task failed: {}", e);
            }
        }

        let stopped = self.session.file_watcher.stop();
        self.session.emitter.emit(&WatcherEventData::Close);
        self.session.plugins.close_watcher().await;
        self.session.emitter.clear();
        self.session.set_state(SessionState::Closed).await;
        info!("Watch session closed");
        stopped
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

impl Session {
    async fn set_state(&self, state: SessionState) {
        *self.state.write().await = state;
    }

    fn emit_event(&self, event: BundleEvent) {
        self.emitter.emit(&WatcherEventData::Event(event));
    }

    /// Orchestrator loop: first build, then one rebuild per debounced trigger
    async fn run(&self, cancel: CancellationToken) {
        if cancel.is_cancelled() {
            debug!("Watch session closed before the first build");
            return;
        }
        self.build().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.debouncer.due() => {}
            }

            let changes = self.debouncer.take();
            if changes.is_empty() {
                continue;
            }
            if !self.announce_changes(&changes, &cancel).await || cancel.is_cancelled() {
                break;
            }
            self.build().await;
        }
        debug!("Watch session orchestrator stopped");
    }

    /// Emit `change` and run `watch_change` per path, then `restart`
    ///
    /// Returns `false` if the session started closing meanwhile.
    async fn announce_changes(&self, changes: &[ChangeEvent], cancel: &CancellationToken) -> bool {
        self.set_state(SessionState::Rebuilding).await;
        self.emitter.end_replay();
        for ChangeEvent { path, kind } in changes {
            if cancel.is_cancelled() {
                return false;
            }
            let detail = ChangeDetail { event: *kind };
            debug!("Change detected: {} {:?}", kind, path);
            self.emitter.emit(&WatcherEventData::Change {
                path: path.clone(),
                detail,
            });
            self.plugins.watch_change(path, detail).await;
        }
        if cancel.is_cancelled() {
            return false;
        }
        self.emitter.emit(&WatcherEventData::Restart);
        true
    }

    /// One full build cycle, from `START` to `END`
    async fn build(&self) {
        let seq = self.build_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(SessionState::Rebuilding).await;
        let started = Instant::now();
        info!("Build #{} started", seq);

        self.emit_event(BundleEvent::Start);
        self.emit_event(BundleEvent::BundleStart);

        let result = self.run_build().await;
        self.last_build_ok.store(result.is_ok(), Ordering::SeqCst);
        match result {
            Ok(()) => {
                let duration = started.elapsed().as_millis() as u64;
                info!("Build #{} finished in {}ms", seq, duration);
                self.emit_event(BundleEvent::BundleEnd {
                    output: vec![self.request.output.dir.to_string_lossy().into_owned()],
                    duration,
                });
            }
            Err(error) => {
                warn!("Build #{} failed: {}", seq, error);
                self.emit_event(BundleEvent::Error {
                    error: BuildFailure::from(&error),
                });
            }
        }

        self.set_state(SessionState::Watching).await;
        self.emit_event(BundleEvent::End);
    }

    async fn run_build(&self) -> std::result::Result<(), BuildError> {
        let (ctx, requests) = PluginContext::new(&self.request.cwd);
        let hooks = self.plugins.build_start(&ctx).await;
        drop(ctx);
        for path in requests.drain() {
            self.watch_path(&path);
        }
        hooks?;

        // Entries stay watched even when the engine fails before reporting them
        for item in &self.request.input {
            self.watch_path(Path::new(&item.import));
        }

        let output = self.engine.generate(&self.request).await?;

        for path in &output.watch_files {
            self.watch_path(path);
        }
        for (level, record) in &output.logs {
            self.request.report_log(*level, record);
        }

        if self.request.watch_options().skip_write {
            debug!("Skipping write of {} assets", output.assets.len());
            return Ok(());
        }
        write_assets(&self.request.output.dir, &output.assets)
            .await
            .map_err(|e| BuildError::new(BuildError::WRITE_ERROR, e.to_string()))
    }

    fn watch_path(&self, path: &Path) {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.request.cwd.join(path)
        };
        match self.file_watcher.add_path(&path) {
            Ok(true) => debug!("Added watch path {:?}", path),
            Ok(false) => {}
            Err(e) => warn!("Failed to watch {:?}: {}", path, e),
        }
    }
}
