//! Error types for app lifecycle operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the core crate.
pub type HubResult<T> = Result<T, HubError>;

/// Errors surfaced by the file store, source patcher, generation client and lifecycle.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("App '{0}' already exists.")]
    AlreadyExists(String),

    #[error("App '{0}' not found.")]
    NotFound(String),

    #[error("App '{0}' is protected and cannot be modified.")]
    Forbidden(String),

    #[error("Could not find injection marker '{marker}' in {}", path.display())]
    MarkerNotFound { marker: String, path: PathBuf },

    #[error("App '{0}' is already mounted in the entry point.")]
    AlreadyMounted(String),

    #[error("Generation error: {0}")]
    UpstreamGeneration(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `completed` was applied before `step` failed; nothing was rolled back.
    #[error("App '{slug}': {completed}, but {step} failed: {source}")]
    PartiallyApplied {
        slug: String,
        completed: &'static str,
        step: &'static str,
        #[source]
        source: Box<HubError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HubError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HubError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the I/O variant whose underlying kind is `NotFound`.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, HubError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<config::ConfigError> for HubError {
    fn from(err: config::ConfigError) -> Self {
        HubError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        HubError::UpstreamGeneration(err.to_string())
    }
}
