//! # Local Filesystem Archive Store
//!
//! Artifacts are stored at `{root}/{owner}/{id}` and addressed as
//! `local://{name}/{owner}/{id}`.
//!
//! ## Write Invariant
//!
//! Objects are created with `create_new`, so a `put` can never replace an
//! existing artifact. A partially written object is removed before the
//! error is returned.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ddas_core::{ArtifactUri, OwnerId};
use tokio::io::AsyncWriteExt;

use crate::error::{StoreError, StoreOp};
use crate::key::ObjectKey;
use crate::payload::ArtifactPayload;
use crate::ArchiveStore;

/// URI scheme of this backend.
pub const LOCAL_SCHEME: &str = "local";

// ---------------------------------------------------------------------------
// LocalArchiveStore
// ---------------------------------------------------------------------------

/// Archive store backed by a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalArchiveStore {
    root: PathBuf,
    name: String,
    max_object_bytes: Option<u64>,
}

impl LocalArchiveStore {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            max_object_bytes: None,
        }
    }

    /// Reject payloads larger than `limit` bytes.
    pub fn with_max_object_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_object_bytes = limit;
        self
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn uri_for(&self, key: &ObjectKey) -> Result<ArtifactUri, StoreError> {
        ArtifactUri::from_parts(LOCAL_SCHEME, &self.name, &key.to_string())
            .map_err(|e| StoreError::rejected(e.to_string()))
    }

    fn path_for(&self, key: &ObjectKey) -> PathBuf {
        self.root
            .join(key.owner().as_str())
            .join(key.object_name())
    }

    /// Resolve a URI to a key, refusing URIs minted by another store.
    fn key_for(&self, uri: &ArtifactUri) -> Result<ObjectKey, StoreError> {
        if uri.scheme() != LOCAL_SCHEME || uri.container() != self.name {
            return Err(StoreError::rejected(format!(
                "{uri} does not belong to store local://{}",
                self.name
            )));
        }
        ObjectKey::parse(uri.key())
    }

    async fn write_payload(
        file: &mut tokio::fs::File,
        payload: &ArtifactPayload,
    ) -> std::io::Result<()> {
        match payload {
            ArtifactPayload::Bytes(bytes) => file.write_all(bytes).await?,
            ArtifactPayload::File { path, .. } => {
                let mut src = tokio::fs::File::open(path).await?;
                tokio::io::copy(&mut src, file).await?;
            }
        }
        file.flush().await?;
        file.sync_all().await
    }
}

#[async_trait]
impl ArchiveStore for LocalArchiveStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn put(
        &self,
        owner: &OwnerId,
        payload: &ArtifactPayload,
    ) -> Result<ArtifactUri, StoreError> {
        if let Some(limit) = self.max_object_bytes {
            if payload.len() > limit {
                return Err(StoreError::rejected(format!(
                    "object of {} bytes exceeds the {limit}-byte limit",
                    payload.len()
                )));
            }
        }

        let key = ObjectKey::generate(owner);
        let uri = self.uri_for(&key)?;
        let path = self.path_for(&key);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::from_io(StoreOp::Put, &e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::from_io(StoreOp::Put, &e))?;

        if let Err(e) = Self::write_payload(&mut file, payload).await {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial artifact");
            }
            return Err(StoreError::from_io(StoreOp::Put, &e));
        }

        tracing::debug!(artifact_uri = %uri, bytes = payload.len(), "artifact written");
        Ok(uri)
    }

    async fn get(&self, uri: &ArtifactUri) -> Result<Vec<u8>, StoreError> {
        let key = self.key_for(uri)?;
        match tokio::fs::read(self.path_for(&key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                uri: uri.to_string(),
            }),
            Err(e) => Err(StoreError::from_io(StoreOp::Get, &e)),
        }
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<ArtifactUri>, StoreError> {
        let dir = self.root.join(owner.as_str());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::from_io(StoreOp::List, &e)),
        };

        let mut uris = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::from_io(StoreOp::List, &e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            // Skip anything this store did not write.
            if let Ok(key) = ObjectKey::parse(&format!("{owner}/{name}")) {
                uris.push(self.uri_for(&key)?);
            }
        }
        uris.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(uris)
    }

    async fn delete(&self, uri: &ArtifactUri) -> Result<(), StoreError> {
        let key = self.key_for(uri)?;
        match tokio::fs::remove_file(self.path_for(&key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::from_io(StoreOp::Delete, &e)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(s: &str) -> OwnerId {
        OwnerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive");

        let uri = store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"hello".to_vec()))
            .await
            .unwrap();
        assert_eq!(uri.scheme(), "local");
        assert_eq!(uri.container(), "archive");
        assert!(uri.key().starts_with("u1/"));
        assert_eq!(store.get(&uri).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn repeated_puts_never_share_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive");
        let payload = ArtifactPayload::Bytes(b"same".to_vec());

        let a = store.put(&owner("u1"), &payload).await.unwrap();
        let b = store.put(&owner("u1"), &payload).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list(&owner("u1")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn file_payload_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let spool = dir.path().join("spool.bin");
        std::fs::write(&spool, vec![3u8; 100_000]).unwrap();
        let store = LocalArchiveStore::new(dir.path().join("objects"), "archive");

        let uri = store
            .put(
                &owner("u1"),
                &ArtifactPayload::File {
                    path: spool,
                    len: 100_000,
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get(&uri).await.unwrap(), vec![3u8; 100_000]);
    }

    #[tokio::test]
    async fn missing_spool_file_is_transient_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive");
        let payload = ArtifactPayload::File {
            path: dir.path().join("gone"),
            len: 1,
        };

        let err = store.put(&owner("u1"), &payload).await.unwrap_err();
        assert!(err.is_transient());
        assert!(store.list(&owner("u1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn size_limit_is_a_permanent_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive").with_max_object_bytes(Some(4));

        let err = store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"hello".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.list(&owner("u1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive");
        let payload = ArtifactPayload::Bytes(b"x".to_vec());

        store.put(&owner("u1"), &payload).await.unwrap();
        store.put(&owner("u2"), &payload).await.unwrap();
        std::fs::write(dir.path().join("u1").join("stray.txt"), b"?").unwrap();

        let listed = store.list(&owner("u1")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].key().starts_with("u1/"));
        assert!(store.list(&owner("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_missing_and_delete_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive");
        let uri = store
            .put(&owner("u1"), &ArtifactPayload::Bytes(b"x".to_vec()))
            .await
            .unwrap();

        store.delete(&uri).await.unwrap();
        store.delete(&uri).await.unwrap();
        assert!(matches!(
            store.get(&uri).await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn foreign_uris_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArchiveStore::new(dir.path(), "archive");
        let key = ObjectKey::generate(&owner("u1"));

        for raw in [
            format!("s3://archive/{key}"),
            format!("local://other/{key}"),
            "local://archive/u1/not-a-key".to_string(),
        ] {
            let uri = ArtifactUri::parse(raw).unwrap();
            assert!(matches!(
                store.get(&uri).await.unwrap_err(),
                StoreError::Rejected { .. }
            ));
        }
    }
}
