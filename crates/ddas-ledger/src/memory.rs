//! # In-Memory Ledger
//!
//! Records live in a `parking_lot::RwLock<HashMap>`. The check and the
//! insert of [`insert_if_absent`](DedupLedger::insert_if_absent) happen under
//! one write guard, which is what makes them atomic. The guard is never held
//! across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ddas_core::{ArchiveRecord, Fingerprint, NewArchiveRecord, OwnerId};
use parking_lot::RwLock;

use crate::error::LedgerError;
use crate::{DedupLedger, InsertOutcome};

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<(OwnerId, Fingerprint), (u64, ArchiveRecord)>,
    uris: HashSet<String>,
    next_seq: u64,
}

/// Ledger held entirely in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records across all owners.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DedupLedger for InMemoryLedger {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(
        &self,
        owner: &OwnerId,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArchiveRecord>, LedgerError> {
        Ok(self
            .inner
            .read()
            .records
            .get(&(owner.clone(), *fingerprint))
            .map(|(_, r)| r.clone()))
    }

    async fn insert_if_absent(
        &self,
        candidate: NewArchiveRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        let key = (candidate.owner_id.clone(), candidate.fingerprint);
        let mut inner = self.inner.write();

        if let Some((_, existing)) = inner.records.get(&key) {
            return Ok(InsertOutcome::Conflict(existing.clone()));
        }
        if inner.uris.contains(candidate.artifact_uri.as_str()) {
            return Err(LedgerError::Inconsistent(format!(
                "artifact uri {} is already referenced by another record",
                candidate.artifact_uri
            )));
        }

        let record = candidate.into_record();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.uris.insert(record.artifact_uri.to_string());
        inner.records.insert(key, (seq, record.clone()));
        Ok(InsertOutcome::Inserted(record))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ArchiveRecord>, LedgerError> {
        let inner = self.inner.read();
        let mut rows: Vec<&(u64, ArchiveRecord)> = inner
            .records
            .iter()
            .filter(|((o, _), _)| o == owner)
            .map(|(_, v)| v)
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(rows.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddas_core::ArtifactUri;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    fn candidate(owner_id: &str, fp: u8, key: &str) -> NewArchiveRecord {
        NewArchiveRecord::new(
            owner(owner_id),
            "file.txt",
            Fingerprint::from_bytes([fp; 32]),
            ArtifactUri::parse(format!("mem://default/{owner_id}/{key}")).unwrap(),
        )
    }

    #[tokio::test]
    async fn first_insert_wins() {
        let ledger = InMemoryLedger::new();
        let first = ledger.insert_if_absent(candidate("u1", 1, "a")).await.unwrap();
        assert!(first.is_inserted());

        let second = ledger.insert_if_absent(candidate("u1", 1, "b")).await.unwrap();
        assert!(!second.is_inserted());
        assert_eq!(second.record(), first.record());
        assert_eq!(second.record().artifact_uri.key(), "u1/a");
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.insert_if_absent(candidate("u1", 1, "a")).await.unwrap().is_inserted());
        assert!(ledger.insert_if_absent(candidate("u2", 1, "b")).await.unwrap().is_inserted());

        let fp = Fingerprint::from_bytes([1; 32]);
        assert!(ledger.find(&owner("u1"), &fp).await.unwrap().is_some());
        assert!(ledger.find(&owner("u3"), &fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reused_artifact_uri_is_inconsistent() {
        let ledger = InMemoryLedger::new();
        ledger.insert_if_absent(candidate("u1", 1, "a")).await.unwrap();
        let err = ledger.insert_if_absent(candidate("u1", 2, "a")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Inconsistent(_)));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let ledger = InMemoryLedger::new();
        for (fp, key) in [(1, "a"), (2, "b"), (3, "c")] {
            ledger.insert_if_absent(candidate("u1", fp, key)).await.unwrap();
        }
        ledger.insert_if_absent(candidate("u2", 9, "z")).await.unwrap();

        let keys: Vec<String> = ledger
            .list_by_owner(&owner("u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.artifact_uri.key().to_string())
            .collect();
        assert_eq!(keys, vec!["u1/c", "u1/b", "u1/a"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_produce_one_winner() {
        let ledger = InMemoryLedger::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .insert_if_absent(candidate("u1", 7, &format!("k{i}")))
                    .await
                    .unwrap()
            }));
        }

        let mut outcomes = Vec::new();
        for h in handles {
            outcomes.push(h.await.unwrap());
        }
        let winners: Vec<_> = outcomes.iter().filter(|o| o.is_inserted()).collect();
        assert_eq!(winners.len(), 1);
        let uri = &winners[0].record().artifact_uri;
        assert!(outcomes.iter().all(|o| &o.record().artifact_uri == uri));
    }
}
