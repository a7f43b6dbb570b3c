//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while assembling or running the pipeline
#[derive(Error, Debug)]
pub enum CliError {
    /// `--source replay` without `--replay <file>`
    #[error("replay source requires --replay <file>")]
    ReplayPathMissing,

    /// Replay file does not exist
    #[error("replay file not found: {}", path.display())]
    ReplayNotFound { path: PathBuf },

    /// Reading source could not be created
    #[error("failed to create reading source: {0}")]
    Source(#[from] ingestion::IngestionError),

    /// Dispatcher or one of its sinks could not be created
    #[error("failed to build dispatcher: {0}")]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// Metrics recorder could not be installed
    #[error("failed to set up metrics exporter: {message}")]
    Observability { message: String },
}

impl CliError {
    pub fn replay_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ReplayNotFound { path: path.into() }
    }

    pub fn observability(message: impl Into<String>) -> Self {
        Self::Observability {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
