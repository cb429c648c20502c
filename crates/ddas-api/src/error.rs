//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps archive engine errors to HTTP status codes with a JSON body
//! carrying a machine-readable code and a message. Backend error text is
//! logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ddas_archive::{ArchiveError, RejectKind, RejectReason};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request content or parameters are unusable (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication failure: missing or invalid credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A backend is down or timed out; retrying may succeed (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// A rejected archival request.
impl From<RejectReason> for AppError {
    fn from(reason: RejectReason) -> Self {
        match reason.kind {
            RejectKind::InvalidInput => Self::Validation(reason.to_string()),
            RejectKind::ArchivalFailed => Self::ServiceUnavailable(reason.to_string()),
        }
    }
}

/// Read-side failures.
impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::InvalidInput(msg) => Self::Validation(msg),
            ArchiveError::ArtifactMissing(_) | ArchiveError::Spool(_) => Self::Internal(err.to_string()),
            ArchiveError::LedgerUnavailable(_) => {
                tracing::warn!(error = %err, "ledger query failed");
                Self::ServiceUnavailable("archive ledger is unavailable".to_string())
            }
            ArchiveError::StoreUnavailable(_) | ArchiveError::StoreRejected(_) => {
                tracing::warn!(error = %err, "object store read failed");
                Self::ServiceUnavailable("object storage is unavailable".to_string())
            }
            ArchiveError::DeadlineExceeded { phase } => {
                Self::ServiceUnavailable(format!("deadline exceeded while {phase}"))
            }
        }
    }
}

impl From<ddas_core::ValidationError> for AppError {
    fn from(err: ddas_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
