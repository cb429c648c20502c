//! # ddas-crypto: Streaming Digest Engine
//!
//! Computes the SHA-256 [`Fingerprint`](ddas_core::Fingerprint) of archived
//! content without ever holding more than one chunk in memory.
//!
//! ## Components
//!
//! - [`source`]: the [`ContentSource`] trait and its reader- and
//!   buffer-backed implementations.
//! - [`digest`]: [`StreamDigester`] accumulator plus the
//!   [`fingerprint`], [`fingerprint_tee`], [`fingerprint_reader`] and
//!   [`fingerprint_bytes`] entry points.
//!
//! Empty input is never an error: its fingerprint is the SHA-256 of the
//! empty sequence.

pub mod digest;
pub mod error;
pub mod source;

pub use digest::{
    fingerprint, fingerprint_bytes, fingerprint_reader, fingerprint_tee, Digested,
    StreamDigester,
};
pub use error::DigestError;
pub use source::{BufferSource, ContentSource, ReaderSource, DEFAULT_CHUNK_SIZE};
