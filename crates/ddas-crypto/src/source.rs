//! # Content Sources
//!
//! A [`ContentSource`] yields an upload as a sequence of bounded chunks.
//! The HTTP adapter streams request frames through one, the CLI wraps a
//! file, and tests use [`BufferSource`].

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunk size used when reading from an [`AsyncRead`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A pull-based stream of content chunks.
///
/// `Ok(None)` marks the end of the stream. A source may return empty chunks;
/// consumers treat them as no-ops.
#[async_trait]
pub trait ContentSource: Send {
    /// Return the next chunk, or `None` once the stream is exhausted.
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Reads chunks from any [`AsyncRead`].
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    /// Wrap a reader with the default chunk size.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap a reader with an explicit chunk size (minimum 1).
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ContentSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

/// Serves an owned in-memory buffer in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct BufferSource {
    data: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl BufferSource {
    /// Serve `data` with the default chunk size.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::with_chunk_size(data, DEFAULT_CHUNK_SIZE)
    }

    /// Serve `data` in chunks of `chunk_size` bytes (minimum 1).
    pub fn with_chunk_size(data: impl Into<Vec<u8>>, chunk_size: usize) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl ContentSource for BufferSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(source: &mut dyn ContentSource) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn buffer_source_respects_chunk_size() {
        let mut source = BufferSource::with_chunk_size(b"abcdefg".to_vec(), 3);
        let chunks = drain(&mut source).await;
        assert_eq!(chunks, vec![b"abc".to_vec(), b"def".to_vec(), b"g".to_vec()]);
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_buffer_yields_nothing() {
        let mut source = BufferSource::new(Vec::new());
        assert!(drain(&mut source).await.is_empty());
    }

    #[tokio::test]
    async fn reader_source_never_exceeds_chunk_size() {
        let data = vec![42u8; 1000];
        let mut source = ReaderSource::with_chunk_size(&data[..], 128);
        let chunks = drain(&mut source).await;
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 128));
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_clamped() {
        let mut source = BufferSource::with_chunk_size(b"ab".to_vec(), 0);
        assert_eq!(drain(&mut source).await.len(), 2);
    }
}
