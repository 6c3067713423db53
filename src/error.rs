// MiBuddy — Errors
//
// Error taxonomy shared by the avatar engine and the input pipeline.

use thiserror::Error;

/// Result type alias using [`MochiError`].
pub type Result<T> = std::result::Result<T, MochiError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MochiError {
    /// Out-of-range enum value or a missing required argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation needs a lifecycle step that has not happened yet.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// A display object, particle slot or buffer could not be allocated.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    /// Storage or transport failure reported by a backend.
    #[error("I/O error: {0}")]
    Io(String),
}

impl MochiError {
    pub fn invalid_arg(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }
}
