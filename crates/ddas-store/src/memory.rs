//! # In-Memory Archive Store
//!
//! Process-local backend for tests and development. Objects live in a
//! `parking_lot` guarded map; the lock is never held across an `.await`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ddas_core::{ArtifactUri, OwnerId};
use parking_lot::RwLock;

use crate::error::{StoreError, StoreOp};
use crate::key::ObjectKey;
use crate::payload::ArtifactPayload;
use crate::ArchiveStore;

/// URI scheme of this backend.
pub const MEMORY_SCHEME: &str = "mem";

/// Archive store held entirely in memory.
///
/// Clones share the same object map.
#[derive(Debug, Clone)]
pub struct InMemoryArchiveStore {
    name: String,
    objects: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    capacity_bytes: Option<u64>,
}

impl InMemoryArchiveStore {
    /// An unbounded store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            capacity_bytes: None,
        }
    }

    /// Reject puts that would push total stored bytes above `capacity`.
    pub fn with_capacity_bytes(mut self, capacity: Option<u64>) -> Self {
        self.capacity_bytes = capacity;
        self
    }

    /// Number of stored objects across all owners.
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    /// Total stored bytes across all owners.
    pub fn stored_bytes(&self) -> u64 {
        self.objects.read().values().map(|v| v.len() as u64).sum()
    }

    fn key_for(&self, uri: &ArtifactUri) -> Result<ObjectKey, StoreError> {
        if uri.scheme() != MEMORY_SCHEME || uri.container() != self.name {
            return Err(StoreError::rejected(format!(
                "{uri} does not belong to store mem://{}",
                self.name
            )));
        }
        ObjectKey::parse(uri.key())
    }

    fn uri_for(&self, key: &str) -> Result<ArtifactUri, StoreError> {
        ArtifactUri::from_parts(MEMORY_SCHEME, &self.name, key)
            .map_err(|e| StoreError::rejected(e.to_string()))
    }
}

impl Default for InMemoryArchiveStore {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchiveStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(
        &self,
        owner: &OwnerId,
        payload: &ArtifactPayload,
    ) -> Result<ArtifactUri, StoreError> {
        let bytes = payload
            .read_all()
            .await
            .map_err(|e| StoreError::from_io(StoreOp::Put, &e))?;
        let key = ObjectKey::generate(owner).to_string();
        let uri = self.uri_for(&key)?;

        let mut objects = self.objects.write();
        if let Some(capacity) = self.capacity_bytes {
            let used: u64 = objects.values().map(|v| v.len() as u64).sum();
            if used + bytes.len() as u64 > capacity {
                return Err(StoreError::rejected(format!(
                    "store capacity of {capacity} bytes exhausted"
                )));
            }
        }
        if objects.contains_key(&key) {
            return Err(StoreError::unavailable(StoreOp::Put, "key collision"));
        }
        objects.insert(key, bytes);
        Ok(uri)
    }

    async fn get(&self, uri: &ArtifactUri) -> Result<Vec<u8>, StoreError> {
        let key = self.key_for(uri)?;
        self.objects
            .read()
            .get(&key.to_string())
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                uri: uri.to_string(),
            })
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<ArtifactUri>, StoreError> {
        let prefix = ObjectKey::owner_prefix(owner);
        let keys: Vec<String> = self
            .objects
            .read()
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        keys.iter().map(|k| self.uri_for(k)).collect()
    }

    async fn delete(&self, uri: &ArtifactUri) -> Result<(), StoreError> {
        let key = self.key_for(uri)?;
        self.objects.write().remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn put_get_list_delete() {
        let store = InMemoryArchiveStore::new("test");
        let uri = store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"abc".to_vec()))
            .await
            .unwrap();
        assert!(uri.as_str().starts_with("mem://test/u1/"));
        assert_eq!(store.get(&uri).await.unwrap(), b"abc");
        assert_eq!(store.list(&owner("u1")).await.unwrap(), vec![uri.clone()]);

        store.delete(&uri).await.unwrap();
        assert_eq!(store.object_count(), 0);
        assert!(matches!(
            store.get(&uri).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn list_does_not_leak_across_prefixes() {
        let store = InMemoryArchiveStore::default();
        let payload = ArtifactPayload::Bytes(b"x".to_vec());
        store.put(&owner("u1"), &payload).await.unwrap();
        store.put(&owner("u10"), &payload).await.unwrap();
        store.put(&owner("u2"), &payload).await.unwrap();

        assert_eq!(store.list(&owner("u1")).await.unwrap().len(), 1);
        assert_eq!(store.list(&owner("u10")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn capacity_exhaustion_is_rejected() {
        let store = InMemoryArchiveStore::default().with_capacity_bytes(Some(5));
        store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"abc".to_vec()))
            .await
            .unwrap();
        let err = store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"abc".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.stored_bytes(), 3);
    }

    #[tokio::test]
    async fn clones_share_objects() {
        let store = InMemoryArchiveStore::default();
        let clone = store.clone();
        let uri = store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"shared".to_vec()))
            .await
            .unwrap();
        assert_eq!(clone.get(&uri).await.unwrap(), b"shared");
    }
}
