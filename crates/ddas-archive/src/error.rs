//! # Archival Error Taxonomy
//!
//! A closed set of failure classes. Backend errors are folded in here and go
//! no further: adapters see [`ArchiveError`] or, from
//! [`Archiver::archive`](crate::Archiver::archive), a
//! [`RejectReason`](crate::RejectReason). A ledger conflict is not an error.

use ddas_crypto::DigestError;
use ddas_ledger::LedgerError;
use ddas_store::StoreError;
use thiserror::Error;

use crate::phase::ArchivalPhase;

/// Archival failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The content could not be read, was empty, or was too large.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Local spooling of the content failed.
    #[error("spool failure: {0}")]
    Spool(String),

    /// Object storage failed transiently and retries were exhausted.
    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),

    /// Object storage refused the artifact permanently.
    #[error("object store rejected artifact: {0}")]
    StoreRejected(String),

    /// A ledger record points at an artifact the store no longer has.
    #[error("artifact missing from store: {0}")]
    ArtifactMissing(String),

    /// The dedup ledger failed.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The request deadline passed during `phase`.
    #[error("deadline exceeded during {phase}")]
    DeadlineExceeded {
        /// Phase that was running at expiry.
        phase: ArchivalPhase,
    },
}

impl From<DigestError> for ArchiveError {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::Io(e) => Self::InvalidInput(format!("content stream could not be read: {e}")),
            DigestError::TooLarge { limit } => {
                Self::InvalidInput(format!("content exceeds the {limit}-byte limit"))
            }
            DigestError::Sink(e) => Self::Spool(e.to_string()),
        }
    }
}

impl From<StoreError> for ArchiveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => Self::StoreUnavailable(err.to_string()),
            StoreError::Rejected { .. } => Self::StoreRejected(err.to_string()),
            StoreError::NotFound { uri } => Self::ArtifactMissing(uri),
        }
    }
}

impl From<LedgerError> for ArchiveError {
    fn from(err: LedgerError) -> Self {
        Self::LedgerUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_errors_map_to_input_or_spool() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(ArchiveError::from(DigestError::Io(io)), ArchiveError::InvalidInput(_)));
        assert!(matches!(
            ArchiveError::from(DigestError::TooLarge { limit: 1 }),
            ArchiveError::InvalidInput(_)
        ));
        let sink = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(matches!(ArchiveError::from(DigestError::Sink(sink)), ArchiveError::Spool(_)));
    }

    #[test]
    fn store_errors_keep_their_class() {
        let unavailable = StoreError::Unavailable {
            op: ddas_store::StoreOp::Put,
            reason: "503".into(),
        };
        assert!(matches!(ArchiveError::from(unavailable), ArchiveError::StoreUnavailable(_)));
        let rejected = StoreError::Rejected {
            reason: "quota".into(),
        };
        assert!(matches!(ArchiveError::from(rejected), ArchiveError::StoreRejected(_)));
    }

    #[test]
    fn deadline_message_names_phase() {
        let err = ArchiveError::DeadlineExceeded {
            phase: ArchivalPhase::Inserting,
        };
        assert_eq!(err.to_string(), "deadline exceeded during inserting");
    }
}
