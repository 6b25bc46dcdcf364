//! Notifications emitted by a watch session

use bundlewatch_core::change::ChangeDetail;
use bundlewatch_core::engine::BuildError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Error payload of an `ERROR` event
///
/// `message` is the display form of the build error, so it starts with the
/// `[CODE]` token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFailure {
    pub code: String,
    pub message: String,
}

impl From<&BuildError> for BuildFailure {
    fn from(error: &BuildError) -> Self {
        Self {
            code: error.code.clone(),
            message: error.to_string(),
        }
    }
}

/// One step of a build cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BundleEvent {
    Start,
    BundleStart,
    BundleEnd {
        /// Output directories of this build
        output: Vec<String>,
        /// Wall time in milliseconds
        duration: u64,
    },
    Error {
        error: BuildFailure,
    },
    End,
}

impl BundleEvent {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::BundleStart => "BUNDLE_START",
            Self::BundleEnd { .. } => "BUNDLE_END",
            Self::Error { .. } => "ERROR",
            Self::End => "END",
        }
    }
}

/// Keys of the listener registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatcherEventName {
    Event,
    Change,
    Restart,
    Close,
}

impl WatcherEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Change => "change",
            Self::Restart => "restart",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for WatcherEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherEventData {
    Event(BundleEvent),
    Change { path: PathBuf, detail: ChangeDetail },
    Restart,
    Close,
}

impl WatcherEventData {
    /// Registry key this payload is delivered under
    pub fn name(&self) -> WatcherEventName {
        match self {
            Self::Event(_) => WatcherEventName::Event,
            Self::Change { .. } => WatcherEventName::Change,
            Self::Restart => WatcherEventName::Restart,
            Self::Close => WatcherEventName::Close,
        }
    }
}

impl From<BundleEvent> for WatcherEventData {
    fn from(event: BundleEvent) -> Self {
        Self::Event(event)
    }
}
