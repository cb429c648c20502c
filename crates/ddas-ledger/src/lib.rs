//! # ddas-ledger: Dedup Ledger
//!
//! Maps `(owner, fingerprint)` to the [`ArchiveRecord`] of the first
//! successful archival.
//!
//! ## Atomicity
//!
//! [`DedupLedger::insert_if_absent`] is the only serialization point in the
//! engine. It is a single atomic operation in every backend: concurrent
//! callers racing on the same key observe exactly one
//! [`InsertOutcome::Inserted`]; every other caller gets
//! [`InsertOutcome::Conflict`] carrying the winner. A conflict is an outcome,
//! never an error.
//!
//! ## Backends
//!
//! - [`PgLedger`]: PostgreSQL via SQLx, `ON CONFLICT DO NOTHING` against a
//!   composite unique constraint, embedded migrations.
//! - [`InMemoryLedger`]: a single write-lock critical section; for tests and
//!   development.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use ddas_core::{ArchiveRecord, Fingerprint, NewArchiveRecord, OwnerId};

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use postgres::{connect, PgLedger};

/// Result of [`DedupLedger::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The candidate was stored.
    Inserted(ArchiveRecord),
    /// A record for the same key already existed; this is it.
    Conflict(ArchiveRecord),
}

impl InsertOutcome {
    /// The stored record, whichever call created it.
    pub fn record(&self) -> &ArchiveRecord {
        match self {
            Self::Inserted(r) | Self::Conflict(r) => r,
        }
    }

    /// Whether this call created the record.
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Persistent index of archived content per owner.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Short backend label used in logs.
    fn backend_name(&self) -> &'static str;

    /// Look up the record for `(owner, fingerprint)`.
    async fn find(
        &self,
        owner: &OwnerId,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArchiveRecord>, LedgerError>;

    /// Atomically store `candidate` unless its key is already taken.
    async fn insert_if_absent(
        &self,
        candidate: NewArchiveRecord,
    ) -> Result<InsertOutcome, LedgerError>;

    /// All of an owner's records, newest first.
    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ArchiveRecord>, LedgerError>;

    /// Cheap liveness check of the backing store.
    async fn ping(&self) -> Result<(), LedgerError>;
}
