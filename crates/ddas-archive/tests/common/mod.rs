//! Shared fixtures for archive integration tests: fault-injecting backends
//! and a stalling content source.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ddas_archive::{Archiver, ArchiverOptions};
use ddas_core::{ArchiveRecord, ArtifactUri, Fingerprint, NewArchiveRecord, OwnerId};
use ddas_crypto::ContentSource;
use ddas_ledger::{DedupLedger, InMemoryLedger, InsertOutcome, LedgerError};
use ddas_store::{ArchiveStore, ArtifactPayload, InMemoryArchiveStore, RetryPolicy, StoreError};

pub fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

/// Three attempts, 1ms apart.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        ..RetryPolicy::default()
    }
}

pub fn options() -> ArchiverOptions {
    ArchiverOptions {
        retry: fast_retry(),
        ..ArchiverOptions::default()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// An archiver plus handles on its backends for inspection.
pub struct Harness {
    pub archiver: Archiver,
    pub ledger: FaultyLedger,
    pub store: FaultyStore,
}

pub fn harness() -> Harness {
    harness_with(options())
}

pub fn harness_with(options: ArchiverOptions) -> Harness {
    let ledger = FaultyLedger::default();
    let store = FaultyStore::default();
    let archiver = Archiver::new(Arc::new(ledger.clone()), Arc::new(store.clone()), options);
    Harness {
        archiver,
        ledger,
        store,
    }
}

// ---------------------------------------------------------------------------
// FaultyStore
// ---------------------------------------------------------------------------

/// In-memory store that can fail or stall its next `put` calls.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: InMemoryArchiveStore,
    failures_left: Arc<AtomicU32>,
    error: Arc<parking_lot::Mutex<Option<StoreError>>>,
    put_delay: Arc<parking_lot::Mutex<Option<Duration>>>,
    pub put_calls: Arc<AtomicU32>,
}

impl FaultyStore {
    /// Fail the next `count` puts with `error`.
    pub fn fail_puts(&self, count: u32, error: StoreError) {
        *self.error.lock() = Some(error);
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Sleep `delay` before every put.
    pub fn stall_puts(&self, delay: Duration) {
        *self.put_delay.lock() = Some(delay);
    }

    pub fn puts(&self) -> u32 {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.inner.object_count()
    }
}

#[async_trait]
impl ArchiveStore for FaultyStore {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn put(
        &self,
        owner: &OwnerId,
        payload: &ArtifactPayload,
    ) -> Result<ArtifactUri, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.put_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            let err = self.error.lock().clone();
            if let Some(err) = err {
                return Err(err);
            }
        }
        self.inner.put(owner, payload).await
    }

    async fn get(&self, uri: &ArtifactUri) -> Result<Vec<u8>, StoreError> {
        self.inner.get(uri).await
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<ArtifactUri>, StoreError> {
        self.inner.list(owner).await
    }

    async fn delete(&self, uri: &ArtifactUri) -> Result<(), StoreError> {
        self.inner.delete(uri).await
    }
}

pub fn unavailable(reason: &str) -> StoreError {
    StoreError::Unavailable {
        op: ddas_store::StoreOp::Put,
        reason: reason.to_string(),
    }
}

pub fn rejected(reason: &str) -> StoreError {
    StoreError::Rejected {
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// FaultyLedger
// ---------------------------------------------------------------------------

/// In-memory ledger whose inserts can be made to fail or stall, and whose
/// lookups can be made to miss.
#[derive(Clone, Default)]
pub struct FaultyLedger {
    pub inner: InMemoryLedger,
    blind_finds: Arc<parking_lot::Mutex<bool>>,
    fail_inserts: Arc<parking_lot::Mutex<bool>>,
    insert_delay: Arc<parking_lot::Mutex<Option<Duration>>>,
}

impl FaultyLedger {
    /// Make every `find` report no record, so requests always reach the insert.
    pub fn blind_finds(&self) {
        *self.blind_finds.lock() = true;
    }

    pub fn fail_inserts(&self) {
        *self.fail_inserts.lock() = true;
    }

    pub fn stall_inserts(&self, delay: Duration) {
        *self.insert_delay.lock() = Some(delay);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl DedupLedger for FaultyLedger {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn find(
        &self,
        owner: &OwnerId,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ArchiveRecord>, LedgerError> {
        if *self.blind_finds.lock() {
            return Ok(None);
        }
        self.inner.find(owner, fingerprint).await
    }

    async fn insert_if_absent(
        &self,
        candidate: NewArchiveRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        let delay = *self.insert_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_inserts.lock() {
            return Err(LedgerError::Unavailable("connection refused".into()));
        }
        self.inner.insert_if_absent(candidate).await
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ArchiveRecord>, LedgerError> {
        self.inner.list_by_owner(owner).await
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        self.inner.ping().await
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Yields one chunk, then stalls for `stall` before ending.
pub struct StallingSource {
    first: Option<Vec<u8>>,
    stall: Duration,
}

impl StallingSource {
    pub fn new(first: &[u8], stall: Duration) -> Self {
        Self {
            first: Some(first.to_vec()),
            stall,
        }
    }
}

#[async_trait]
impl ContentSource for StallingSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(chunk) = self.first.take() {
            return Ok(Some(chunk));
        }
        tokio::time::sleep(self.stall).await;
        Ok(None)
    }
}

/// Yields one chunk, then fails like a dropped connection.
pub struct BrokenSource {
    first: Option<Vec<u8>>,
}

impl BrokenSource {
    pub fn new(first: &[u8]) -> Self {
        Self {
            first: Some(first.to_vec()),
        }
    }
}

#[async_trait]
impl ContentSource for BrokenSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.first.take() {
            Some(chunk) => Ok(Some(chunk)),
            None => Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        }
    }
}
