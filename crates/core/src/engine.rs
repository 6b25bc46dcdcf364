//! Contract with the build engine
//!
//! The engine resolves, transforms and generates code for one build attempt.
//! The session only sees the finished [`BuildOutput`] or a [`BuildError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::request::{CanonicalRequest, LogLevel, LogRecord};

/// One generated output file, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputAsset {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl OutputAsset {
    pub fn new(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Successful build result, held only in memory
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub assets: Vec<OutputAsset>,
    /// Every file the module graph depends on
    pub watch_files: Vec<PathBuf>,
    /// Non-fatal diagnostics, forwarded to the user's log handler
    pub logs: Vec<(LogLevel, LogRecord)>,
}

/// Structured build failure; the display form embeds the code
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct BuildError {
    pub code: String,
    pub message: String,
}

impl BuildError {
    pub const PARSE_ERROR: &'static str = "PARSE_ERROR";
    pub const UNRESOLVED_ENTRY: &'static str = "UNRESOLVED_ENTRY";
    pub const PLUGIN_ERROR: &'static str = "PLUGIN_ERROR";
    pub const WRITE_ERROR: &'static str = "WRITE_ERROR";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, message)
    }
}

#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Run one build in memory; the session decides whether to write it
    async fn generate(&self, request: &CanonicalRequest) -> Result<BuildOutput, BuildError>;
}
