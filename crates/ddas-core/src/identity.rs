//! # Identity Newtypes
//!
//! [`OwnerId`] scopes every deduplication query. It also becomes the first
//! segment of every object key, so it is validated to never escape that
//! prefix. [`ArchiveId`] is the primary key of an archive record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum length of an owner identifier, in bytes.
pub const MAX_OWNER_ID_LEN: usize = 128;

/// The authenticated owner of an archive.
///
/// Supplied by the caller's authentication layer; this crate only checks
/// that it is safe to use as a storage key prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Validate and wrap an owner identifier.
    ///
    /// Surrounding whitespace is trimmed. The result must be non-empty, at
    /// most [`MAX_OWNER_ID_LEN`] bytes of printable ASCII, free of path
    /// separators and URI delimiters, and not a dot segment.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_OWNER_ID_LEN
            && trimmed != "."
            && trimmed != ".."
            && trimmed.chars().all(is_key_safe);
        if !valid {
            return Err(ValidationError::InvalidOwnerId(raw));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_key_safe(c: char) -> bool {
    c.is_ascii_graphic() && !matches!(c, '/' | '\\' | '"' | '#' | '<' | '>' | '?' | '`' | '{' | '}' | '%')
}

impl TryFrom<String> for OwnerId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}

impl std::str::FromStr for OwnerId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of an archive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchiveId(Uuid);

impl ArchiveId {
    /// Create a new random archive identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID, e.g. one read back from the ledger.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArchiveId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
