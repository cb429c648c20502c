//! # Store Error Taxonomy
//!
//! Storage failures collapse into three classes. Callers branch on the class,
//! never on backend-specific error types.

use thiserror::Error;

/// The store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Upload.
    Put,
    /// Download.
    Get,
    /// Prefix listing.
    List,
    /// Removal.
    Delete,
}

impl StoreOp {
    /// Lowercase label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::List => "list",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive store failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient failure: I/O, timeout, throttling, 5xx. Safe to retry.
    #[error("object store unavailable during {op}: {reason}")]
    Unavailable {
        /// Failed operation.
        op: StoreOp,
        /// Backend-provided detail.
        reason: String,
    },

    /// Permanent failure: quota, size limit, access denied, foreign URI.
    #[error("object store rejected the request: {reason}")]
    Rejected {
        /// Backend-provided detail.
        reason: String,
    },

    /// The addressed artifact does not exist.
    #[error("artifact not found: {uri}")]
    NotFound {
        /// Requested URI.
        uri: String,
    },
}

impl StoreError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub(crate) fn unavailable(op: StoreOp, reason: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            op,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Classify a filesystem error. Permission and quota errors are permanent.
    pub(crate) fn from_io(op: StoreOp, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::PermissionDenied => Self::rejected(format!("{op}: {err}")),
            _ if err.raw_os_error() == Some(QUOTA_EXCEEDED_ERRNO) => {
                Self::rejected(format!("{op}: {err}"))
            }
            _ => Self::unavailable(op, err),
        }
    }
}

/// `EDQUOT` on Linux.
const QUOTA_EXCEEDED_ERRNO: i32 = 122;
