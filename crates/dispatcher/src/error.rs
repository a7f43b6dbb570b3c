//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Tag id has no registered metadata; the reading is not dispatched
    #[error("tag '{tag_id}' not found in registry")]
    TagNotFound { tag_id: String },

    /// Same tag id registered twice
    #[error("duplicate tag '{tag_id}' in registry")]
    DuplicateTag { tag_id: String },

    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Error from the contract layer (value conversion, sink delivery)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    pub fn tag_not_found(tag_id: impl Into<String>) -> Self {
        Self::TagNotFound {
            tag_id: tag_id.into(),
        }
    }

    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
