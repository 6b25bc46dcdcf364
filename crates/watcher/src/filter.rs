//! Include/exclude pattern matching
//!
//! String patterns are globs, regexes are used as-is. A path is tested in both
//! its absolute form and its form relative to the session cwd.

use bundlewatch_core::error::{Error, Result};
use bundlewatch_core::options::StringOrRegex;
use glob::Pattern;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone)]
enum Matcher {
    Glob(Pattern),
    Regex(Regex),
}

impl Matcher {
    fn compile(pattern: &StringOrRegex) -> Result<Self> {
        match pattern {
            StringOrRegex::String(glob) => Pattern::new(glob)
                .map(Self::Glob)
                .map_err(|e| Error::config(format!("Invalid watch pattern {glob:?}: {e}"))),
            StringOrRegex::Regex(re) => Ok(Self::Regex(re.clone())),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(candidate),
            Self::Regex(re) => re.is_match(candidate),
        }
    }
}

/// Decides which changed paths may trigger a rebuild
///
/// By default, ignores nothing.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    cwd: PathBuf,
    include: Arc<Vec<Matcher>>,
    exclude: Arc<Vec<Matcher>>,
}

impl PatternFilter {
    pub fn new(
        cwd: impl Into<PathBuf>,
        include: &[StringOrRegex],
        exclude: &[StringOrRegex],
    ) -> Result<Self> {
        let compile = |patterns: &[StringOrRegex]| {
            patterns
                .iter()
                .map(Matcher::compile)
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            cwd: cwd.into(),
            include: Arc::new(compile(include)?),
            exclude: Arc::new(compile(exclude)?),
        })
    }

    /// Check if a change to `path` should be ignored
    pub fn should_ignore(&self, path: &Path) -> bool {
        let candidates = self.candidates(path);
        let matches_any = |matchers: &[Matcher]| {
            matchers
                .iter()
                .any(|m| candidates.iter().any(|c| m.matches(c)))
        };

        if matches_any(&self.exclude) {
            trace!("Path {:?} matches an exclude pattern", path);
            return true;
        }
        if !self.include.is_empty() && !matches_any(&self.include) {
            trace!("Path {:?} matches no include pattern", path);
            return true;
        }
        false
    }

    fn candidates(&self, path: &Path) -> Vec<String> {
        let mut candidates = vec![to_slash(path)];
        if let Ok(relative) = path.strip_prefix(&self.cwd) {
            candidates.push(to_slash(relative));
        }
        candidates
    }
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
