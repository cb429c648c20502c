//! # PostgreSQL Ledger
//!
//! All operations run against the `archive_records` table created by the
//! embedded migrations in `./migrations`.
//!
//! ## Insert Protocol
//!
//! ```text
//! INSERT ... ON CONFLICT (owner_id, content_fingerprint) DO NOTHING RETURNING ...
//!   row returned  -> Inserted
//!   no row        -> re-read the winner -> Conflict
//!   23505 on the owner/fingerprint key -> re-read the winner -> Conflict
//! ```
//!
//! If the winner cannot be read back (removed between the conflict and the
//! re-read) the insert is retried a bounded number of times before failing
//! with [`LedgerError::Inconsistent`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ddas_core::{
    ArchiveId, ArchiveRecord, ArtifactUri, Fingerprint, NewArchiveRecord, OwnerId,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::{DedupLedger, InsertOutcome};

/// Name of the composite unique constraint guarding first-archival races.
const OWNER_FINGERPRINT_KEY: &str = "archive_records_owner_fingerprint_key";

/// PostgreSQL error code for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Insert attempts before a vanished winner is reported as inconsistent.
const MAX_INSERT_ATTEMPTS: u32 = 3;

const RECORD_COLUMNS: &str =
    "id, owner_id, original_name, content_fingerprint, artifact_uri, created_at";

/// Connect to PostgreSQL and apply the embedded migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// Dedup ledger stored in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Wrap a pool whose schema is already migrated.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn try_insert(&self, candidate: &NewArchiveRecord) -> Result<Option<ArchiveRecord>, LedgerError> {
        let result = sqlx::query_as::<_, RecordRow>(&format!(
            "INSERT INTO archive_records ({RECORD_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (owner_id, content_fingerprint) DO NOTHING
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(candidate.owner_id.as_str())
        .bind(&candidate.original_name)
        .bind(candidate.fingerprint.to_hex())
        .bind(candidate.artifact_uri.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => row.into_record().map(Some),
            Ok(None) => Ok(None),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                if db_err.constraint() == Some(OWNER_FINGERPRINT_KEY) {
                    Ok(None)
                } else {
                    Err(LedgerError::Inconsistent(format!(
                        "unique violation on {}: {}",
                        db_err.constraint().unwrap_or("unknown constraint"),
                        db_err.message()
                    )))
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DedupLedger for PgLedger {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find(
        &self,
        owner: &OwnerId,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArchiveRecord>, LedgerError> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM archive_records
             WHERE owner_id = $1 AND content_fingerprint = $2"
        ))
        .bind(owner.as_str())
        .bind(fingerprint.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RecordRow::into_record).transpose()
    }

    async fn insert_if_absent(
        &self,
        candidate: NewArchiveRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            if let Some(record) = self.try_insert(&candidate).await? {
                return Ok(InsertOutcome::Inserted(record));
            }
            if let Some(winner) = self.find(&candidate.owner_id, &candidate.fingerprint).await? {
                return Ok(InsertOutcome::Conflict(winner));
            }
            tracing::warn!(
                attempt,
                owner = %candidate.owner_id,
                fingerprint = %candidate.fingerprint,
                "conflicting ledger row vanished before re-read, retrying insert"
            );
        }
        Err(LedgerError::Inconsistent(format!(
            "record for {}/{} conflicted but could not be read back after {MAX_INSERT_ATTEMPTS} attempts",
            candidate.owner_id, candidate.fingerprint
        )))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ArchiveRecord>, LedgerError> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM archive_records
             WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    owner_id: String,
    original_name: String,
    content_fingerprint: String,
    artifact_uri: String,
    created_at: DateTime<Utc>,
}

impl RecordRow {
    fn into_record(self) -> Result<ArchiveRecord, LedgerError> {
        let corrupt = |field: &str, e: ddas_core::ValidationError| {
            tracing::error!(id = %self.id, field, error = %e, "corrupt archive record in database");
            LedgerError::Inconsistent(format!("record {} has invalid {field}: {e}", self.id))
        };
        let owner_id = OwnerId::new(self.owner_id.clone()).map_err(|e| corrupt("owner_id", e))?;
        let fingerprint =
            Fingerprint::from_hex(&self.content_fingerprint).map_err(|e| corrupt("content_fingerprint", e))?;
        let artifact_uri =
            ArtifactUri::parse(self.artifact_uri.clone()).map_err(|e| corrupt("artifact_uri", e))?;

        Ok(ArchiveRecord {
            id: ArchiveId::from_uuid(self.id),
            owner_id,
            original_name: self.original_name,
            fingerprint,
            artifact_uri,
            created_at: self.created_at,
        })
    }
}
