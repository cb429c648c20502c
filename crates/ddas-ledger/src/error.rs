//! Ledger error types.

use thiserror::Error;

/// Dedup ledger failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The backing store could not be reached or failed the operation.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Stored data violates an invariant, or a conflicting winner vanished
    /// before it could be read back.
    #[error("ledger inconsistent: {0}")]
    Inconsistent(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => Self::Inconsistent(err.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}
