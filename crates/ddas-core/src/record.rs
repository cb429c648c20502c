//! # Archive Records
//!
//! An [`ArchiveRecord`] is the ledger's proof that a given owner has already
//! archived a given content fingerprint. It is created exactly once, on the
//! first confirmed sighting, and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::identity::{ArchiveId, OwnerId};
use crate::uri::ArtifactUri;

/// Maximum length of a stored original file name, in characters.
pub const MAX_ORIGINAL_NAME_CHARS: usize = 255;

/// Name recorded when the caller supplies none.
pub const UNNAMED: &str = "unnamed";

/// A confirmed, immutable archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Primary key.
    pub id: ArchiveId,
    /// Owner the record is scoped to.
    pub owner_id: OwnerId,
    /// Caller-supplied display name of the first upload.
    pub original_name: String,
    /// SHA-256 of the archived content.
    pub fingerprint: Fingerprint,
    /// Where the artifact lives in object storage.
    pub artifact_uri: ArtifactUri,
    /// Time of the first successful archival.
    pub created_at: DateTime<Utc>,
}

/// A record that has not yet been offered to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArchiveRecord {
    /// Owner the record is scoped to.
    pub owner_id: OwnerId,
    /// Display name, already normalized.
    pub original_name: String,
    /// SHA-256 of the archived content.
    pub fingerprint: Fingerprint,
    /// Location of the uploaded artifact.
    pub artifact_uri: ArtifactUri,
}

impl NewArchiveRecord {
    /// Build a candidate record, normalizing the display name.
    pub fn new(
        owner_id: OwnerId,
        original_name: &str,
        fingerprint: Fingerprint,
        artifact_uri: ArtifactUri,
    ) -> Self {
        Self {
            owner_id,
            original_name: normalize_original_name(original_name),
            fingerprint,
            artifact_uri,
        }
    }

    /// Assign an identifier and creation time.
    pub fn into_record(self) -> ArchiveRecord {
        ArchiveRecord {
            id: ArchiveId::new(),
            owner_id: self.owner_id,
            original_name: self.original_name,
            fingerprint: self.fingerprint,
            artifact_uri: self.artifact_uri,
            created_at: Utc::now(),
        }
    }
}

/// Trim a caller-supplied file name, substitute [`UNNAMED`] for blanks, and
/// truncate to [`MAX_ORIGINAL_NAME_CHARS`] on a character boundary.
pub fn normalize_original_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return UNNAMED.to_string();
    }
    trimmed.chars().take(MAX_ORIGINAL_NAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str) -> NewArchiveRecord {
        NewArchiveRecord::new(
            OwnerId::new("u1").unwrap(),
            name,
            Fingerprint::from_bytes([7u8; 32]),
            ArtifactUri::parse("mem://default/u1/k1").unwrap(),
        )
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_original_name("  hello.txt "), "hello.txt");
        assert_eq!(normalize_original_name(""), UNNAMED);
        assert_eq!(normalize_original_name("\t\n"), UNNAMED);
        let long = "é".repeat(MAX_ORIGINAL_NAME_CHARS + 10);
        assert_eq!(normalize_original_name(&long).chars().count(), MAX_ORIGINAL_NAME_CHARS);
    }

    #[test]
    fn into_record_preserves_candidate_fields() {
        let record = candidate(" report.pdf ").into_record();
        assert_eq!(record.owner_id.as_str(), "u1");
        assert_eq!(record.original_name, "report.pdf");
        assert_eq!(record.fingerprint, Fingerprint::from_bytes([7u8; 32]));
        assert_eq!(record.artifact_uri.as_str(), "mem://default/u1/k1");
    }

    #[test]
    fn record_serializes_with_hex_fingerprint() {
        let record = candidate("a.txt").into_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fingerprint"], "07".repeat(32));
        assert_eq!(json["owner_id"], "u1");
        let back: ArchiveRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
