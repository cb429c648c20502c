//! # Backend Bootstrap
//!
//! Turns an [`ArchiveConfig`] into a wired [`Archiver`].
//!
//! ## Sequence
//!
//! 1. **Ledger**: connect to PostgreSQL and run migrations when
//!    `DATABASE_URL` is set, otherwise fall back to the in-memory ledger.
//! 2. **Store**: build the configured object storage backend.
//! 3. **Log**: one structured startup line naming both backends.

use std::sync::Arc;

use ddas_ledger::{DedupLedger, InMemoryLedger, PgLedger};
use ddas_store::{ArchiveStore, InMemoryArchiveStore, LocalArchiveStore};

use crate::archiver::Archiver;
use crate::config::{ArchiveConfig, StoreBackend};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors while wiring backends.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The ledger database could not be reached or migrated.
    #[error("ledger database initialization failed: {0}")]
    Database(String),

    /// The S3 backend was selected but this build lacks the `s3` feature.
    #[error("DDAS_STORE_BACKEND=s3 requires a build with the `s3` feature")]
    S3Disabled,

    /// The local store directory could not be created.
    #[error("store directory {path} is not usable: {source}")]
    StoreDir {
        /// Directory path.
        path: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Build an [`Archiver`] from configuration.
pub async fn build_archiver(config: &ArchiveConfig) -> Result<Archiver, BootstrapError> {
    let ledger = build_ledger(config).await?;
    let store = build_store(config).await?;

    tracing::info!(
        ledger = ledger.backend_name(),
        store = store.backend_name(),
        artifact_mode = config.archiver.artifact_mode.as_str(),
        "archive engine ready"
    );

    Ok(Archiver::new(ledger, store, config.archiver.clone()))
}

async fn build_ledger(config: &ArchiveConfig) -> Result<Arc<dyn DedupLedger>, BootstrapError> {
    match &config.database_url {
        Some(url) => {
            let pool = ddas_ledger::connect(url, config.db_max_connections)
                .await
                .map_err(|e| BootstrapError::Database(e.to_string()))?;
            Ok(Arc::new(PgLedger::new(pool)))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set; using the in-memory ledger. Archive records will not survive a restart."
            );
            Ok(Arc::new(InMemoryLedger::new()))
        }
    }
}

async fn build_store(config: &ArchiveConfig) -> Result<Arc<dyn ArchiveStore>, BootstrapError> {
    match &config.store {
        StoreBackend::Local { dir, name } => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| BootstrapError::StoreDir {
                    path: dir.display().to_string(),
                    source,
                })?;
            Ok(Arc::new(
                LocalArchiveStore::new(dir.clone(), name.clone())
                    .with_max_object_bytes(config.max_object_bytes),
            ))
        }
        StoreBackend::Memory { name } => {
            tracing::warn!("using the in-memory object store; artifacts will not survive a restart");
            Ok(Arc::new(
                InMemoryArchiveStore::new(name.clone()).with_capacity_bytes(config.max_object_bytes),
            ))
        }
        #[cfg(feature = "s3")]
        StoreBackend::S3 { bucket, region } => Ok(Arc::new(
            ddas_store::S3ArchiveStore::from_env(bucket.clone(), region.as_deref()).await,
        )),
        #[cfg(not(feature = "s3"))]
        StoreBackend::S3 { .. } => Err(BootstrapError::S3Disabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddas_core::OwnerId;
    use ddas_crypto::BufferSource;

    use crate::{ArchiveOutcome, Deadline};

    #[tokio::test]
    async fn in_memory_config_wires_memory_backends() {
        let archiver = build_archiver(&ArchiveConfig::in_memory()).await.unwrap();
        assert_eq!(archiver.ledger().backend_name(), "memory");
        assert_eq!(archiver.store().backend_name(), "memory");

        let owner = OwnerId::new("u1").unwrap();
        let outcome = archiver
            .archive(&owner, "a.txt", &mut BufferSource::new("abc"), Deadline::none())
            .await;
        assert!(matches!(outcome, ArchiveOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn local_config_creates_the_store_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("artifacts");
        let config = ArchiveConfig {
            store: StoreBackend::Local {
                dir: dir.clone(),
                name: "archive".into(),
            },
            ..ArchiveConfig::default()
        };
        let archiver = build_archiver(&config).await.unwrap();
        assert_eq!(archiver.store().backend_name(), "local");
        assert!(dir.is_dir());
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn s3_without_feature_is_refused() {
        let config = ArchiveConfig {
            store: StoreBackend::S3 {
                bucket: "b".into(),
                region: None,
            },
            ..ArchiveConfig::in_memory()
        };
        assert!(matches!(
            build_archiver(&config).await.unwrap_err(),
            BootstrapError::S3Disabled
        ));
    }
}
