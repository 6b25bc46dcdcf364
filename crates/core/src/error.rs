use thiserror::Error;

/// Result type for bundlewatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bundlewatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unsupported option values
    #[error("Configuration error: {0}")]
    Config(String),

    /// File watching backend errors
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Errors raised by a plugin hook
    #[error("Plugin '{plugin}' failed in {hook}: {message}")]
    Plugin {
        plugin: String,
        hook: String,
        message: String,
    },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Creates a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a watcher error
    pub fn watcher(msg: impl Into<String>) -> Self {
        Self::Watcher(msg.into())
    }

    /// Creates a plugin hook error
    pub fn plugin(
        plugin: impl Into<String>,
        hook: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Adds context to any error
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error was caused by invalid configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::with_context(context, e))
    }
}
