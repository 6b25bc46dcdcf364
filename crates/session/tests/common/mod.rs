//! Shared fixtures for session integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bundlewatch::{
    BuildEngine, BuildError, BuildOutput, InputOptions, OutputAsset, OutputOptions, Watcher,
};
use bundlewatch_core::request::CanonicalRequest;
use bundlewatch_core::SessionConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tempfile::TempDir;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging from `BUNDLEWATCH_TEST_LOG` or `RUST_LOG`
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let log_level = std::env::var("BUNDLEWATCH_TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "error".to_string());

        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Copies each entry to `<name>.js`, failing on unbalanced parentheses
pub struct TestEngine;

#[async_trait]
impl BuildEngine for TestEngine {
    async fn generate(&self, request: &CanonicalRequest) -> Result<BuildOutput, BuildError> {
        let mut output = BuildOutput::default();
        for item in &request.input {
            let path = request.cwd.join(&item.import);
            let source = tokio::fs::read_to_string(&path).await.map_err(|e| {
                BuildError::new(
                    BuildError::UNRESOLVED_ENTRY,
                    format!("Could not resolve entry module {}: {e}", item.import),
                )
            })?;
            if source.matches('(').count() != source.matches(')').count() {
                return Err(BuildError::parse(format!(
                    "Expected `)` but found end of file in {}",
                    item.import
                )));
            }
            let name = match &item.name {
                Some(name) => name.clone(),
                None => Path::new(&item.import)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "index".to_string()),
            };
            output.watch_files.push(path);
            output
                .assets
                .push(OutputAsset::new(format!("{name}.js"), source));
        }
        Ok(output)
    }
}

/// [`TestEngine`] that holds every build for `delay` after reading its entries
pub struct SlowEngine {
    pub delay: Duration,
}

#[async_trait]
impl BuildEngine for SlowEngine {
    async fn generate(&self, request: &CanonicalRequest) -> Result<BuildOutput, BuildError> {
        let output = TestEngine.generate(request).await;
        tokio::time::sleep(self.delay).await;
        output
    }
}

/// Project directory with a single `src/main.js` entry
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new(source: &str) -> Self {
        init_test_logging();
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.js"), source).unwrap();
        Self { dir }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn entry(&self) -> PathBuf {
        self.path("src/main.js")
    }

    pub fn write(&self, relative: &str, content: &str) {
        std::fs::write(self.path(relative), content).unwrap();
    }

    pub fn output(&self) -> Option<String> {
        std::fs::read_to_string(self.path("dist/main.js")).ok()
    }

    /// Wait until the written bundle has `expected` content
    pub async fn wait_for_output(&self, expected: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while self.output().as_deref() != Some(expected) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for output {expected:?}, got {:?}",
                self.output()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn input_options(&self) -> InputOptions {
        InputOptions {
            input: "src/main.js".into(),
            cwd: Some(self.dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    /// Create a session with a short debounce window and start it
    pub async fn start(&self, options: InputOptions, recorder: &Recorder) -> Watcher {
        self.start_with(options, recorder, settings(20)).await
    }

    pub async fn start_with(
        &self,
        options: InputOptions,
        recorder: &Recorder,
        settings: SessionConfig,
    ) -> Watcher {
        self.start_with_engine(options, recorder, settings, Arc::new(TestEngine))
            .await
    }

    pub async fn start_with_engine(
        &self,
        options: InputOptions,
        recorder: &Recorder,
        settings: SessionConfig,
        engine: Arc<dyn BuildEngine>,
    ) -> Watcher {
        let watcher = Watcher::with_settings(options, OutputOptions::default(), engine, settings)
            .await
            .unwrap();
        recorder.attach(&watcher);
        watcher.start();
        watcher
    }
}

pub fn settings(debounce_ms: u64) -> SessionConfig {
    SessionConfig {
        debounce_ms,
        ..Default::default()
    }
}

/// Records every notification as a short string
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn attach(&self, watcher: &Watcher) {
        let log = Arc::clone(&self.log);
        watcher.on_event(move |event| {
            let entry = match event {
                bundlewatch::BundleEvent::Error { error } => {
                    format!("ERROR {}", error.message)
                }
                other => other.code().to_string(),
            };
            log.lock().unwrap().push(entry);
        });
        let log = Arc::clone(&self.log);
        watcher.on_change(move |path, detail| {
            log.lock()
                .unwrap()
                .push(format!("change {} {}", detail.event, path.display()));
        });
        let log = Arc::clone(&self.log);
        watcher.on_restart(move || log.lock().unwrap().push("restart".to_string()));
        let log = Arc::clone(&self.log);
        watcher.on_close(move || log.lock().unwrap().push("close".to_string()));
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }

    /// Entries after the `n`-th occurrence of `marker`
    pub fn after(&self, marker: &str, n: usize) -> Vec<String> {
        let entries = self.entries();
        let mut seen = 0;
        for (i, entry) in entries.iter().enumerate() {
            if entry == marker {
                seen += 1;
                if seen == n {
                    return entries[i + 1..].to_vec();
                }
            }
        }
        Vec::new()
    }

    /// Wait until `entry` was recorded `n` times
    pub async fn wait_for(&self, entry: &str, n: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while self.count(entry) < n {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {n}x {entry:?}, got {:?}",
                self.entries()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Give the backend a moment so the next write is observed as a separate edit
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
