//! # Streaming Fingerprints
//!
//! All hashing in the workspace flows through [`StreamDigester`], an
//! incremental SHA-256 accumulator that also counts bytes. The free functions
//! drive it from the various input shapes the engine sees.

use std::io::Read;

use ddas_core::Fingerprint;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::DigestError;
use crate::source::{ContentSource, DEFAULT_CHUNK_SIZE};

/// Result of digesting a complete stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digested {
    /// SHA-256 of every byte seen.
    pub fingerprint: Fingerprint,
    /// Total number of bytes seen.
    pub byte_count: u64,
}

/// Incremental SHA-256 accumulator with an optional size ceiling.
#[derive(Debug, Clone)]
pub struct StreamDigester {
    hasher: Sha256,
    byte_count: u64,
    limit: Option<u64>,
}

impl StreamDigester {
    /// An accumulator with no size ceiling.
    pub fn new() -> Self {
        Self::with_limit(None)
    }

    /// An accumulator that fails once more than `limit` bytes are fed.
    pub fn with_limit(limit: Option<u64>) -> Self {
        Self {
            hasher: Sha256::new(),
            byte_count: 0,
            limit,
        }
    }

    /// Feed a chunk.
    pub fn update(&mut self, chunk: &[u8]) -> Result<(), DigestError> {
        self.byte_count += chunk.len() as u64;
        if let Some(limit) = self.limit {
            if self.byte_count > limit {
                return Err(DigestError::TooLarge { limit });
            }
        }
        self.hasher.update(chunk);
        Ok(())
    }

    /// Bytes fed so far.
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Finish hashing.
    pub fn finish(self) -> Digested {
        let bytes: [u8; 32] = self.hasher.finalize().into();
        Digested {
            fingerprint: Fingerprint::from_bytes(bytes),
            byte_count: self.byte_count,
        }
    }
}

impl Default for StreamDigester {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint a source, consuming it to exhaustion.
pub async fn fingerprint<S>(source: &mut S, limit: Option<u64>) -> Result<Digested, DigestError>
where
    S: ContentSource + ?Sized,
{
    let mut digester = StreamDigester::with_limit(limit);
    while let Some(chunk) = source.next_chunk().await? {
        digester.update(&chunk)?;
    }
    Ok(digester.finish())
}

/// Fingerprint a source while forwarding every chunk to `sink`.
///
/// The sink is flushed before returning. On error the sink may hold a
/// partial copy; the caller owns its cleanup.
pub async fn fingerprint_tee<S, W>(
    source: &mut S,
    sink: &mut W,
    limit: Option<u64>,
) -> Result<Digested, DigestError>
where
    S: ContentSource + ?Sized,
    W: AsyncWrite + Unpin + Send + ?Sized,
{
    let mut digester = StreamDigester::with_limit(limit);
    while let Some(chunk) = source.next_chunk().await? {
        digester.update(&chunk)?;
        sink.write_all(&chunk).await.map_err(DigestError::Sink)?;
    }
    sink.flush().await.map_err(DigestError::Sink)?;
    Ok(digester.finish())
}

/// Blocking variant for synchronous readers such as files opened by the CLI.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<Digested, DigestError> {
    let mut digester = StreamDigester::new();
    let mut buf = vec![0u8; DEFAULT_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DigestError::Io(e)),
        };
        digester.update(&buf[..n])?;
    }
    Ok(digester.finish())
}

/// Fingerprint an in-memory byte slice.
pub fn fingerprint_bytes(data: &[u8]) -> Fingerprint {
    let bytes: [u8; 32] = Sha256::digest(data).into();
    Fingerprint::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferSource;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn known_vectors() {
        assert_eq!(fingerprint_bytes(b"hello").to_hex(), HELLO_SHA256);
        assert_eq!(fingerprint_bytes(b"").to_hex(), EMPTY_SHA256);
    }

    #[tokio::test]
    async fn empty_stream_has_defined_fingerprint() {
        let mut source = BufferSource::new(Vec::new());
        let digested = fingerprint(&mut source, None).await.unwrap();
        assert_eq!(digested.fingerprint.to_hex(), EMPTY_SHA256);
        assert_eq!(digested.byte_count, 0);
    }

    #[tokio::test]
    async fn chunking_does_not_change_the_fingerprint() {
        for chunk_size in [1, 2, 3, 5, 64] {
            let mut source = BufferSource::with_chunk_size(b"hello".to_vec(), chunk_size);
            let digested = fingerprint(&mut source, None).await.unwrap();
            assert_eq!(digested.fingerprint.to_hex(), HELLO_SHA256);
            assert_eq!(digested.byte_count, 5);
        }
    }

    #[tokio::test]
    async fn limit_is_enforced() {
        let mut source = BufferSource::with_chunk_size(vec![0u8; 100], 10);
        let err = fingerprint(&mut source, Some(50)).await.unwrap_err();
        assert!(matches!(err, DigestError::TooLarge { limit: 50 }));

        let mut source = BufferSource::new(vec![0u8; 50]);
        assert!(fingerprint(&mut source, Some(50)).await.is_ok());
    }

    #[tokio::test]
    async fn tee_forwards_every_byte() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut source = BufferSource::with_chunk_size(data.clone(), 777);
        let mut sink: Vec<u8> = Vec::new();
        let digested = fingerprint_tee(&mut source, &mut sink, None).await.unwrap();
        assert_eq!(sink, data);
        assert_eq!(digested.fingerprint, fingerprint_bytes(&data));
        assert_eq!(digested.byte_count, data.len() as u64);
    }

    #[test]
    fn reader_matches_slice() {
        let data = vec![9u8; DEFAULT_CHUNK_SIZE * 2 + 17];
        let digested = fingerprint_reader(&data[..]).unwrap();
        assert_eq!(digested.fingerprint, fingerprint_bytes(&data));
        assert_eq!(digested.byte_count, data.len() as u64);
    }

    #[test]
    fn digester_counts_bytes() {
        let mut d = StreamDigester::new();
        d.update(b"hel").unwrap();
        d.update(b"").unwrap();
        d.update(b"lo").unwrap();
        assert_eq!(d.byte_count(), 5);
        assert_eq!(d.finish().fingerprint.to_hex(), HELLO_SHA256);
    }
}
