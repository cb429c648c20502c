#![deny(missing_docs)]

//! # ddas-core: Foundational Types for the Archival Engine
//!
//! This crate defines the types every other crate in the workspace speaks in.
//! It has no internal crate dependencies, only `serde`, `thiserror`, `chrono`,
//! `uuid`, and `url` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** An [`OwnerId`] is not a
//!    `String`, a [`Fingerprint`] is not a hex string, an [`ArtifactUri`] is
//!    not a URL. Each is validated once, at construction.
//!
//! 2. **Identity is `(owner, fingerprint)`.** The original file name is
//!    display metadata carried on [`ArchiveRecord`] and never participates in
//!    duplicate detection.
//!
//! 3. **Records are immutable.** Nothing in this crate offers a setter on
//!    [`ArchiveRecord`]; the ledger creates a record once and only reads it
//!    afterwards.

pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod record;
pub mod uri;

pub use error::ValidationError;
pub use fingerprint::Fingerprint;
pub use identity::{ArchiveId, OwnerId};
pub use record::{normalize_original_name, ArchiveRecord, NewArchiveRecord};
pub use uri::ArtifactUri;
