//! # ddas-store: Archive Store Adapter
//!
//! Durable object storage for archived artifacts behind the object-safe
//! [`ArchiveStore`] trait.
//!
//! ## Backends
//!
//! | Backend | URI scheme | Module |
//! |---------|-----------|--------|
//! | Local filesystem | `local://{name}/{owner}/{id}` | [`fs`] |
//! | In-process memory | `mem://{name}/{owner}/{id}` | [`memory`] |
//! | Amazon S3 (feature `s3`) | `s3://{bucket}/{owner}/{id}` | `s3` |
//!
//! ## Key Invariant
//!
//! Every `put` writes a fresh key `{owner}/{uuid}` and never overwrites an
//! existing object. A retried upload therefore lands under a new key, and a
//! lost race leaves an unreferenced object rather than corrupting a
//! referenced one.
//!
//! ## Failures
//!
//! [`StoreError::Unavailable`] is transient and retried by
//! [`put_with_retry`]; [`StoreError::Rejected`] is permanent and returned
//! immediately.

pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod payload;
pub mod retry;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use ddas_core::{ArtifactUri, OwnerId};

pub use error::{StoreError, StoreOp};
pub use fs::LocalArchiveStore;
pub use key::ObjectKey;
pub use memory::InMemoryArchiveStore;
pub use payload::ArtifactPayload;
pub use retry::{put_with_retry, RetryPolicy};
#[cfg(feature = "s3")]
pub use s3::S3ArchiveStore;

/// Durable object storage for archived artifacts.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Short backend label used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Write `payload` under a fresh key in the owner's prefix.
    async fn put(&self, owner: &OwnerId, payload: &ArtifactPayload)
        -> Result<ArtifactUri, StoreError>;

    /// Read an artifact back.
    async fn get(&self, uri: &ArtifactUri) -> Result<Vec<u8>, StoreError>;

    /// All artifacts in the owner's prefix, sorted by URI.
    async fn list(&self, owner: &OwnerId) -> Result<Vec<ArtifactUri>, StoreError>;

    /// Remove an artifact. Absent artifacts are not an error.
    async fn delete(&self, uri: &ArtifactUri) -> Result<(), StoreError>;
}
