//! # Archiver
//!
//! The orchestrator. One [`Archiver`] is shared by all requests; it holds no
//! per-request state beyond what lives on the stack of [`Archiver::archive`].
//!
//! ## Upload Ordering
//!
//! The artifact is uploaded before the ledger insert and outside any ledger
//! transaction. The insert is the only serialization point, so:
//!
//! - a failed upload never leaves a ledger row behind;
//! - a lost insert race or a failed insert leaves an unreferenced artifact,
//!   logged with its URI for an external reaper.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ddas_core::{ArchiveRecord, Fingerprint, NewArchiveRecord, OwnerId};
use ddas_crypto::{fingerprint, fingerprint_tee, ContentSource, Digested};
use ddas_ledger::{DedupLedger, InsertOutcome};
use ddas_store::{put_with_retry, ArchiveStore, ArtifactPayload, RetryPolicy};
use tempfile::NamedTempFile;

use crate::deadline::Deadline;
use crate::error::ArchiveError;
use crate::outcome::{ArchiveOutcome, ExistsReport, RejectReason};
use crate::phase::ArchivalPhase;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What gets written to object storage for a new archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactMode {
    /// The uploaded bytes themselves, spooled to disk while hashing.
    #[default]
    Content,
    /// A small text object holding only the fingerprint.
    Manifest,
}

impl ArtifactMode {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Manifest => "manifest",
        }
    }
}

impl std::str::FromStr for ArtifactMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "manifest" => Ok(Self::Manifest),
            other => Err(format!("unknown artifact mode {other:?} (expected content or manifest)")),
        }
    }
}

/// Tunables for an [`Archiver`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiverOptions {
    /// Artifact shape.
    pub artifact_mode: ArtifactMode,
    /// Accept zero-byte uploads.
    pub allow_empty: bool,
    /// Reject uploads larger than this many bytes.
    pub max_content_bytes: Option<u64>,
    /// Directory for spool files; the system temp dir when unset.
    pub spool_dir: Option<PathBuf>,
    /// Upload retry policy.
    pub retry: RetryPolicy,
}

// ---------------------------------------------------------------------------
// Archiver
// ---------------------------------------------------------------------------

/// Content-addressed archival orchestrator.
#[derive(Clone)]
pub struct Archiver {
    ledger: Arc<dyn DedupLedger>,
    store: Arc<dyn ArchiveStore>,
    options: ArchiverOptions,
}

impl std::fmt::Debug for Archiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archiver")
            .field("ledger", &self.ledger.backend_name())
            .field("store", &self.store.backend_name())
            .field("options", &self.options)
            .finish()
    }
}

/// Hashed content, plus the spool file backing its payload.
struct Hashed {
    digested: Digested,
    payload: ArtifactPayload,
    _spool: Option<NamedTempFile>,
}

impl Archiver {
    /// Wire an archiver from its collaborators.
    pub fn new(
        ledger: Arc<dyn DedupLedger>,
        store: Arc<dyn ArchiveStore>,
        options: ArchiverOptions,
    ) -> Self {
        Self {
            ledger,
            store,
            options,
        }
    }

    /// Active options.
    pub fn options(&self) -> &ArchiverOptions {
        &self.options
    }

    /// The ledger backend.
    pub fn ledger(&self) -> &Arc<dyn DedupLedger> {
        &self.ledger
    }

    /// The store backend.
    pub fn store(&self) -> &Arc<dyn ArchiveStore> {
        &self.store
    }

    /// Archive `source` for `owner`, deduplicating by content.
    ///
    /// Never returns an error: failures are reported as
    /// [`ArchiveOutcome::Rejected`].
    pub async fn archive<S>(
        &self,
        owner: &OwnerId,
        original_name: &str,
        source: &mut S,
        deadline: Deadline,
    ) -> ArchiveOutcome
    where
        S: ContentSource + ?Sized,
    {
        let started = Instant::now();
        let mut phase = ArchivalPhase::Hashing;

        let outcome = match self
            .run(owner, original_name, source, deadline, &mut phase)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = RejectReason::new(phase, &err);
                tracing::warn!(
                    owner = %owner,
                    phase = %phase,
                    kind = reason.kind.as_str(),
                    error = %err,
                    "archival rejected"
                );
                ArchiveOutcome::Rejected { reason }
            }
        };

        metrics::counter!("ddas_archive_outcomes_total", "outcome" => outcome.label()).increment(1);
        metrics::histogram!("ddas_archive_duration_seconds").record(started.elapsed().as_secs_f64());
        outcome
    }

    async fn run<S>(
        &self,
        owner: &OwnerId,
        original_name: &str,
        source: &mut S,
        deadline: Deadline,
        phase: &mut ArchivalPhase,
    ) -> Result<ArchiveOutcome, ArchiveError>
    where
        S: ContentSource + ?Sized,
    {
        // Hashing
        let hashed = deadline.run(ArchivalPhase::Hashing, self.hash(source)).await??;
        if hashed.digested.byte_count == 0 && !self.options.allow_empty {
            return Err(ArchiveError::InvalidInput("content is empty".into()));
        }
        let fingerprint = hashed.digested.fingerprint;

        // Checking
        advance(phase, ArchivalPhase::Checking, owner, &fingerprint);
        let existing = deadline
            .run(ArchivalPhase::Checking, self.ledger.find(owner, &fingerprint))
            .await??;
        if let Some(record) = existing {
            advance(phase, ArchivalPhase::DuplicateFound, owner, &fingerprint);
            return Ok(ArchiveOutcome::duplicate_of(record));
        }

        // Uploading
        advance(phase, ArchivalPhase::Uploading, owner, &fingerprint);
        let artifact_uri = deadline
            .run(
                ArchivalPhase::Uploading,
                put_with_retry(self.store.as_ref(), owner, &hashed.payload, &self.options.retry),
            )
            .await??;
        drop(hashed);

        // Inserting
        advance(phase, ArchivalPhase::Inserting, owner, &fingerprint);
        let candidate =
            NewArchiveRecord::new(owner.clone(), original_name, fingerprint, artifact_uri.clone());
        let inserted = match deadline
            .run(ArchivalPhase::Inserting, self.ledger.insert_if_absent(candidate))
            .await
        {
            Ok(Ok(inserted)) => inserted,
            Ok(Err(e)) => {
                tracing::warn!(
                    owner = %owner,
                    fingerprint = %fingerprint,
                    artifact_uri = %artifact_uri,
                    "orphaned artifact: ledger insert failed after upload"
                );
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(
                    owner = %owner,
                    fingerprint = %fingerprint,
                    artifact_uri = %artifact_uri,
                    "artifact may be orphaned: ledger insert outcome unknown at deadline"
                );
                return Err(e);
            }
        };

        match inserted {
            InsertOutcome::Inserted(record) => {
                advance(phase, ArchivalPhase::Done, owner, &fingerprint);
                tracing::info!(
                    owner = %owner,
                    fingerprint = %fingerprint,
                    artifact_uri = %record.artifact_uri,
                    "content archived"
                );
                Ok(ArchiveOutcome::Created {
                    fingerprint,
                    artifact_uri: record.artifact_uri.clone(),
                    record,
                })
            }
            InsertOutcome::Conflict(winner) => {
                tracing::info!(
                    owner = %owner,
                    fingerprint = %fingerprint,
                    artifact_uri = %artifact_uri,
                    winner_uri = %winner.artifact_uri,
                    "orphaned artifact: lost first-archival race"
                );
                advance(phase, ArchivalPhase::DuplicateFound, owner, &fingerprint);
                Ok(ArchiveOutcome::duplicate_of(winner))
            }
        }
    }

    async fn hash<S>(&self, source: &mut S) -> Result<Hashed, ArchiveError>
    where
        S: ContentSource + ?Sized,
    {
        let limit = self.options.max_content_bytes;
        match self.options.artifact_mode {
            ArtifactMode::Manifest => {
                let digested = fingerprint(source, limit).await?;
                let payload = ArtifactPayload::Bytes(format!("{}\n", digested.fingerprint).into_bytes());
                Ok(Hashed {
                    digested,
                    payload,
                    _spool: None,
                })
            }
            ArtifactMode::Content => {
                let spool = self.new_spool()?;
                let handle = spool
                    .as_file()
                    .try_clone()
                    .map_err(|e| ArchiveError::Spool(e.to_string()))?;
                let mut file = tokio::fs::File::from_std(handle);
                let digested = fingerprint_tee(source, &mut file, limit).await?;
                let payload = ArtifactPayload::File {
                    path: spool.path().to_path_buf(),
                    len: digested.byte_count,
                };
                Ok(Hashed {
                    digested,
                    payload,
                    _spool: Some(spool),
                })
            }
        }
    }

    fn new_spool(&self) -> Result<NamedTempFile, ArchiveError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ddas-spool-");
        let spool = match &self.options.spool_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        spool.map_err(|e| ArchiveError::Spool(e.to_string()))
    }

    /// The owner's archive records, newest first.
    pub async fn list_archives(&self, owner: &OwnerId) -> Result<Vec<ArchiveRecord>, ArchiveError> {
        Ok(self.ledger.list_by_owner(owner).await?)
    }

    /// Whether the owner has archived `fingerprint`, and under what name.
    pub async fn exists(
        &self,
        owner: &OwnerId,
        fingerprint: &Fingerprint,
    ) -> Result<ExistsReport, ArchiveError> {
        Ok(self.ledger.find(owner, fingerprint).await?.into())
    }

    /// Read back the stored artifact for `(owner, fingerprint)`.
    ///
    /// `Ok(None)` when the owner never archived that fingerprint.
    pub async fn retrieve(
        &self,
        owner: &OwnerId,
        fingerprint: &Fingerprint,
    ) -> Result<Option<(ArchiveRecord, Vec<u8>)>, ArchiveError> {
        let Some(record) = self.ledger.find(owner, fingerprint).await? else {
            return Ok(None);
        };
        let bytes = self.store.get(&record.artifact_uri).await?;
        Ok(Some((record, bytes)))
    }

    /// Probe the ledger connection.
    pub async fn ready(&self) -> Result<(), ArchiveError> {
        Ok(self.ledger.ping().await?)
    }
}

fn advance(phase: &mut ArchivalPhase, next: ArchivalPhase, owner: &OwnerId, fingerprint: &Fingerprint) {
    debug_assert!(phase.can_transition_to(next), "{phase} -> {next}");
    tracing::debug!(owner = %owner, fingerprint = %fingerprint, from = %phase, to = %next, "archival phase");
    *phase = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_mode_parses() {
        assert_eq!("content".parse::<ArtifactMode>().unwrap(), ArtifactMode::Content);
        assert_eq!(" Manifest ".parse::<ArtifactMode>().unwrap(), ArtifactMode::Manifest);
        assert!("both".parse::<ArtifactMode>().is_err());
        assert_eq!(ArtifactMode::default(), ArtifactMode::Content);
    }

    #[test]
    fn default_options_reject_empty_and_retry_three_times() {
        let options = ArchiverOptions::default();
        assert!(!options.allow_empty);
        assert_eq!(options.retry.max_attempts, 3);
        assert!(options.max_content_bytes.is_none());
    }
}
