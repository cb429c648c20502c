//! # ddas-cli: Archive Engine Command-Line Interface
//!
//! ## Subcommands
//!
//! - `fingerprint`: SHA-256 of local files; needs no backends
//! - `archive`: Archive a file for an owner, reporting duplicates
//! - `check`: Whether an owner has archived a fingerprint
//! - `list`: An owner's archives, newest first
//! - `fetch`: Download a stored artifact
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success, or a new archive was created |
//! | 1 | Duplicate, not found, or rejected |
//! | 2 | Usage or configuration error |
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `ddas-archive`.

pub mod archive;
pub mod fingerprint;
pub mod query;
