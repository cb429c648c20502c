//! # Archival Outcomes
//!
//! What an archival request reports back. Adapters render these directly;
//! nothing here carries a backend error type.

use chrono::{DateTime, Utc};
use ddas_core::{ArchiveRecord, ArtifactUri, Fingerprint};

use crate::error::ArchiveError;
use crate::phase::ArchivalPhase;

/// Result of [`Archiver::archive`](crate::Archiver::archive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// First sighting: the artifact was stored and the record created.
    Created {
        /// Content fingerprint.
        fingerprint: Fingerprint,
        /// Location of the new artifact.
        artifact_uri: ArtifactUri,
        /// The new ledger record.
        record: ArchiveRecord,
    },
    /// The owner had already archived this content.
    Duplicate {
        /// Content fingerprint.
        fingerprint: Fingerprint,
        /// Location of the original artifact.
        artifact_uri: ArtifactUri,
        /// Display name of the original upload.
        original_name: String,
        /// When the original was archived.
        created_at: DateTime<Utc>,
    },
    /// The request failed; nothing was registered.
    Rejected {
        /// Why.
        reason: RejectReason,
    },
}

impl ArchiveOutcome {
    pub(crate) fn duplicate_of(record: ArchiveRecord) -> Self {
        Self::Duplicate {
            fingerprint: record.fingerprint,
            artifact_uri: record.artifact_uri,
            original_name: record.original_name,
            created_at: record.created_at,
        }
    }

    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Duplicate { .. } => "duplicate",
            Self::Rejected { .. } => "rejected",
        }
    }

    /// Fingerprint of the content, unless the request was rejected.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Self::Created { fingerprint, .. } | Self::Duplicate { fingerprint, .. } => {
                Some(fingerprint)
            }
            Self::Rejected { .. } => None,
        }
    }

    /// Artifact location, unless the request was rejected.
    pub fn artifact_uri(&self) -> Option<&ArtifactUri> {
        match self {
            Self::Created { artifact_uri, .. } | Self::Duplicate { artifact_uri, .. } => {
                Some(artifact_uri)
            }
            Self::Rejected { .. } => None,
        }
    }
}

/// Closed classification of rejected requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectKind {
    /// The caller's content was unusable. Resubmitting it unchanged fails again.
    InvalidInput,
    /// Storage or ledger failed. Resubmitting may succeed.
    ArchivalFailed,
}

impl RejectKind {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::ArchivalFailed => "archival_failed",
        }
    }
}

/// Why a request was rejected, safe to show to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason {
    /// Failure class.
    pub kind: RejectKind,
    /// Phase in which the request failed.
    pub phase: ArchivalPhase,
    /// Caller-facing description. Never contains backend error text.
    pub message: String,
}

impl RejectReason {
    /// Classify `err`, raised while in `phase`.
    pub fn new(phase: ArchivalPhase, err: &ArchiveError) -> Self {
        let (kind, message) = match err {
            ArchiveError::InvalidInput(detail) => (RejectKind::InvalidInput, detail.clone()),
            ArchiveError::DeadlineExceeded {
                phase: ArchivalPhase::Hashing,
            } => (
                RejectKind::InvalidInput,
                "content was not received before the deadline".to_string(),
            ),
            ArchiveError::DeadlineExceeded { phase } => (
                RejectKind::ArchivalFailed,
                format!("deadline exceeded while {phase}"),
            ),
            ArchiveError::Spool(_) => (
                RejectKind::ArchivalFailed,
                "content could not be staged for upload".to_string(),
            ),
            ArchiveError::StoreUnavailable(_) => (
                RejectKind::ArchivalFailed,
                "object storage is unavailable".to_string(),
            ),
            ArchiveError::StoreRejected(_) => (
                RejectKind::ArchivalFailed,
                "object storage rejected the artifact".to_string(),
            ),
            ArchiveError::ArtifactMissing(_) => (
                RejectKind::ArchivalFailed,
                "archived artifact is missing".to_string(),
            ),
            ArchiveError::LedgerUnavailable(_) => (
                RejectKind::ArchivalFailed,
                "archive ledger is unavailable".to_string(),
            ),
        };
        Self {
            kind,
            phase,
            message,
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} during {}: {}", self.kind.as_str(), self.phase, self.message)
    }
}

/// Answer to [`Archiver::exists`](crate::Archiver::exists).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExistsReport {
    /// Whether the owner has archived this fingerprint.
    pub exists: bool,
    /// Display name of the original upload, when it exists.
    pub original_name: Option<String>,
    /// Location of the original artifact, when it exists.
    pub artifact_uri: Option<ArtifactUri>,
    /// When the original was archived, when it exists.
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Option<ArchiveRecord>> for ExistsReport {
    fn from(record: Option<ArchiveRecord>) -> Self {
        match record {
            Some(r) => Self {
                exists: true,
                original_name: Some(r.original_name),
                artifact_uri: Some(r.artifact_uri),
                created_at: Some(r.created_at),
            },
            None => Self::default(),
        }
    }
}
