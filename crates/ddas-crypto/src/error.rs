//! Error types for digest computation.

use thiserror::Error;

/// Failure while fingerprinting a content stream.
#[derive(Error, Debug)]
pub enum DigestError {
    /// The content source could not be fully read.
    #[error("content stream read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The tee target rejected a write.
    #[error("spool write failed: {0}")]
    Sink(std::io::Error),

    /// The stream exceeded the configured byte limit.
    #[error("content exceeds the {limit}-byte limit")]
    TooLarge {
        /// Configured limit in bytes.
        limit: u64,
    },
}
