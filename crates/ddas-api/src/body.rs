//! Request bodies as content sources.
//!
//! Streams the raw upload frame by frame into the digest engine so an
//! archive request never buffers the whole body in memory.

use std::io;

use async_trait::async_trait;
use axum::body::Body;
use ddas_crypto::ContentSource;
use http_body_util::BodyExt;

/// An HTTP request body read one data frame at a time.
pub struct BodySource {
    body: Body,
}

impl BodySource {
    pub fn new(body: Body) -> Self {
        Self { body }
    }
}

#[async_trait]
impl ContentSource for BodySource {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            match self.body.frame().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(io::Error::new(io::ErrorKind::Other, e)),
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) if !data.is_empty() => return Ok(Some(data.to_vec())),
                    // Empty data or trailers.
                    _ => continue,
                },
            }
        }
    }
}
