//! # Validation Errors
//!
//! Raised when a domain primitive is constructed from input that does not
//! meet its format. Every message quotes the rejected value and names the
//! expected shape so an operator can act on it from a log line alone.

use thiserror::Error;

/// Domain primitive validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Owner identifier is empty, too long, or contains a path separator.
    #[error("invalid owner id: \"{0}\" (expected 1-128 printable ASCII characters without path separators, URI delimiters, or dot segments)")]
    InvalidOwnerId(String),

    /// Fingerprint is not 64 hexadecimal characters.
    #[error("invalid fingerprint: \"{0}\" (expected 64 hex characters)")]
    InvalidFingerprint(String),

    /// Artifact URI is not of the form `{scheme}://{container}/{key}`.
    #[error("invalid artifact uri: \"{0}\" ({1})")]
    InvalidArtifactUri(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_quote_the_rejected_value() {
        let err = ValidationError::InvalidOwnerId("a/b".into());
        assert!(err.to_string().contains("\"a/b\""));

        let err = ValidationError::InvalidFingerprint("xyz".into());
        assert!(err.to_string().contains("64 hex"));

        let err = ValidationError::InvalidArtifactUri("nope".into(), "missing scheme".into());
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("missing scheme"));
    }
}
