//! # Artifact URIs
//!
//! Every archived artifact is addressed as `{scheme}://{container}/{key}`,
//! e.g. `s3://archive-bucket/u1/0f8e...`. The scheme names the storage
//! backend, the container is its bucket or store name, and the key always
//! begins with the owner prefix.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ValidationError;

/// Locator of an archived artifact in object storage.
///
/// Immutable once written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactUri {
    raw: String,
    scheme_len: usize,
    container_end: usize,
}

impl ArtifactUri {
    /// Parse and validate an artifact URI.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let invalid = |reason: &str| ValidationError::InvalidArtifactUri(raw.clone(), reason.into());

        let url = Url::parse(&raw).map_err(|e| invalid(&e.to_string()))?;
        let container = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing container"))?;
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed"));
        }
        let key = url.path().trim_start_matches('/');
        if key.is_empty() {
            return Err(invalid("missing object key"));
        }

        let canonical = format!("{}://{}/{}", url.scheme(), container, key);
        if canonical != raw {
            return Err(invalid("not in canonical form"));
        }
        let scheme_len = url.scheme().len();
        let container_end = scheme_len + 3 + container.len();
        Ok(Self {
            raw,
            scheme_len,
            container_end,
        })
    }

    /// Build a URI from its components.
    pub fn from_parts(scheme: &str, container: &str, key: &str) -> Result<Self, ValidationError> {
        Self::parse(format!("{scheme}://{container}/{key}"))
    }

    /// Backend scheme, e.g. `s3`.
    pub fn scheme(&self) -> &str {
        &self.raw[..self.scheme_len]
    }

    /// Bucket or store name.
    pub fn container(&self) -> &str {
        &self.raw[self.scheme_len + 3..self.container_end]
    }

    /// Object key within the container.
    pub fn key(&self) -> &str {
        &self.raw[self.container_end + 1..]
    }

    /// The full URI.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for ArtifactUri {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ArtifactUri> for String {
    fn from(uri: ArtifactUri) -> Self {
        uri.raw
    }
}

impl std::fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
