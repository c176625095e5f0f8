//! Error types for codegraft.

use thiserror::Error;

/// Result type for codegraft operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for codegraft operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Replacement spans were unsorted, overlapping, or out of bounds.
    #[error("invalid span: {0}")]
    InvalidSpan(String),

    /// Span and replacement lists differ in length.
    #[error("span/replacement mismatch: {spans} spans, {replacements} replacements")]
    LengthMismatch {
        /// Number of spans passed to the engine.
        spans: usize,
        /// Number of replacement strings passed to the engine.
        replacements: usize,
    },

    /// IO error (conversion-table persistence).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed persisted conversion table.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-span error.
    pub fn invalid_span(msg: impl Into<String>) -> Self {
        Error::InvalidSpan(msg.into())
    }
}
