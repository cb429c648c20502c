//! Re-readable upload payloads.

use std::path::PathBuf;

/// The bytes to upload. Both forms can be read any number of times, so a
/// retried `put` resends the same content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPayload {
    /// Small in-memory artifact, e.g. a fingerprint manifest.
    Bytes(Vec<u8>),
    /// Content spooled to a local file while it was being hashed.
    File {
        /// Spool file location.
        path: PathBuf,
        /// Size in bytes.
        len: u64,
    },
}

impl ArtifactPayload {
    /// Payload size in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Self::Bytes(b) => b.len() as u64,
            Self::File { len, .. } => *len,
        }
    }

    /// Whether the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the whole payload into memory.
    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Bytes(b) => Ok(b.clone()),
            Self::File { path, .. } => tokio::fs::read(path).await,
        }
    }
}
