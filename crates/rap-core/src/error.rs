//! Error types for RAP Core.

use thiserror::Error;

/// Result type alias for RAP operations.
pub type Result<T> = std::result::Result<T, RapError>;

/// Errors that can occur while planning over reasoning traces.
#[derive(Error, Debug)]
pub enum RapError {
    /// The inference backend could not be reached.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// The inference backend answered, but not with something usable.
    #[error("model error: {0}")]
    ModelError(String),

    /// The search was interrupted at an LM-call boundary.
    #[error("search cancelled")]
    Cancelled,

    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Prompt template could not be loaded or rendered.
    #[error("prompt error: {0}")]
    PromptError(String),

    /// Dataset record could not be read.
    #[error("dataset error: {0}")]
    DatasetError(String),

    /// I/O error.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl RapError {
    /// Whether continuing with other questions is pointless after this error.
    ///
    /// A dead backend or an interrupt ends the whole run; everything else
    /// only fails the current question.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RapError::ModelUnavailable(_) | RapError::Cancelled)
    }
}
