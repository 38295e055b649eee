//! Error types for the Switchyard framework.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Load Errors
// =============================================================================

/// Why a command pattern was rejected.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern cannot be compiled: {0}")]
    Regex(#[from] regex::Error),
}

/// Errors raised while materialising an extension unit.
///
/// A load error affects only the unit it names; the loader reports it and
/// moves on to the next source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The modules directory could not be created or listed.
    #[error("cannot scan modules directory '{}': {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file could not be read.
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or does not match the manifest shape.
    #[error("invalid manifest '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// `info.name` is absent or blank.
    #[error("unit '{unit}' has no info.name")]
    MissingName { unit: String },

    /// A command pattern was rejected.
    #[error("unit '{unit}' command #{index}: {source}")]
    InvalidPattern {
        unit: String,
        index: usize,
        #[source]
        source: PatternError,
    },

    /// A `native` action names a handler the catalog does not know.
    #[error("unit '{unit}' refers to unknown handler '{name}'")]
    UnknownHandler { unit: String, name: String },

    /// An event declares a type outside the known set.
    #[error("unit '{unit}' declares unknown event type '{kind}'")]
    UnknownEventType { unit: String, kind: String },
}

impl LoadError {
    /// Creates a parse error for `path`.
    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Reload Errors
// =============================================================================

/// Errors returned by [`Loader::reload`](crate::loader::Loader::reload).
#[derive(Debug, Error)]
pub enum ReloadError {
    /// No unit with this id is registered.
    #[error("module '{0}' not found")]
    NotFound(String),

    /// The unit was registered from code and has no source to re-read.
    #[error("module '{0}' has no source file and cannot be reloaded")]
    NoSource(String),

    /// Re-reading the source failed; the previous version stays registered.
    #[error(transparent)]
    Load(#[from] LoadError),
}

// =============================================================================
// Handler Errors
// =============================================================================

/// A failed handler invocation, as seen by the pipeline.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// An `exec` action ran past its deadline.
    #[error("'{command}' timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },

    /// An `exec` action exited unsuccessfully.
    #[error("'{command}' exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: String,
        stderr: String,
    },
}

impl HandlerError {
    /// Builds a [`HandlerError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for reload operations.
pub type ReloadResult<T> = Result<T, ReloadError>;
