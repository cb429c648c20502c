//! # ddas-archive: Archival Orchestrator
//!
//! Drives one upload through the archival state machine:
//!
//! ```text
//! Hashing ──► Checking ──┬──► Uploading ──► Inserting ──┬──► Done
//!                        │                              │
//!                        └──────────────► DuplicateFound ◄┘
//! ```
//!
//! - **Hashing**: stream the content through the digest engine, spooling it
//!   to a temporary file when the artifact is the content itself.
//! - **Checking**: ledger lookup; a hit short-circuits to `DuplicateFound`.
//! - **Uploading**: object store `put` with bounded retry, outside any
//!   ledger transaction.
//! - **Inserting**: atomic insert-if-absent; losing a race still ends in
//!   `DuplicateFound`, leaving the just-uploaded artifact orphaned.
//!
//! Every phase runs under the caller's [`Deadline`]. The outcome of a call is
//! always an [`ArchiveOutcome`]; failures become [`ArchiveOutcome::Rejected`]
//! with a closed [`RejectKind`] and no backend error types.
//!
//! [`config`] and [`bootstrap`] turn environment variables into a wired
//! [`Archiver`] for the HTTP and CLI adapters.

pub mod archiver;
pub mod bootstrap;
pub mod config;
pub mod deadline;
pub mod error;
pub mod outcome;
pub mod phase;

pub use archiver::{Archiver, ArchiverOptions, ArtifactMode};
pub use bootstrap::{build_archiver, BootstrapError};
pub use config::{ArchiveConfig, ConfigError, StoreBackend};
pub use deadline::Deadline;
pub use error::ArchiveError;
pub use outcome::{ArchiveOutcome, ExistsReport, RejectKind, RejectReason};
pub use phase::ArchivalPhase;
