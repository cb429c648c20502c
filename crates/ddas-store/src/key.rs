//! # Object Keys
//!
//! Keys have the shape `{owner}/{id}` where `id` is a lowercase simple-form
//! UUID v4. Parsing is strict so a URI handed back by a caller can never
//! address a path outside an owner's prefix.

use ddas_core::OwnerId;
use uuid::Uuid;

use crate::error::StoreError;

/// A validated `{owner}/{id}` object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    owner: OwnerId,
    object: Uuid,
}

impl ObjectKey {
    /// A fresh key in the owner's prefix.
    pub fn generate(owner: &OwnerId) -> Self {
        Self {
            owner: owner.clone(),
            object: Uuid::new_v4(),
        }
    }

    /// Parse a key produced by [`ObjectKey::generate`].
    pub fn parse(key: &str) -> Result<Self, StoreError> {
        let malformed = || StoreError::rejected(format!("malformed object key: {key:?}"));
        let (raw_owner, object) = key.split_once('/').ok_or_else(malformed)?;
        let owner = OwnerId::new(raw_owner).map_err(|_| malformed())?;
        if owner.as_str() != raw_owner {
            return Err(malformed());
        }
        let parsed = Uuid::try_parse(object).map_err(|_| malformed())?;
        if parsed.simple().to_string() != object {
            return Err(malformed());
        }
        Ok(Self {
            owner,
            object: parsed,
        })
    }

    /// Owner segment.
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Object segment (32 lowercase hex characters).
    pub fn object_name(&self) -> String {
        self.object.simple().to_string()
    }

    /// Prefix under which all of an owner's objects live.
    pub fn owner_prefix(owner: &OwnerId) -> String {
        format!("{owner}/")
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.object.simple())
    }
}
