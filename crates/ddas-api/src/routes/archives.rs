//! # Archive Routes
//!
//! Owner-scoped archival endpoints. The owner always comes from the
//! authenticated [`CallerIdentity`], never from the path or body.
//!
//! ## Endpoints
//!
//! - `POST /v1/archives?name=…`: Archive the raw request body.
//! - `GET /v1/archives`: List the caller's archives, newest first.
//! - `GET /v1/archives/check/{fingerprint}`: Has the caller archived this?
//! - `GET /v1/archives/{fingerprint}/content`: Download the stored artifact.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use ddas_archive::ArchiveOutcome;
use ddas_core::{ArchiveRecord, Fingerprint};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::body::BodySource;
use crate::error::AppError;
use crate::state::AppState;

/// Response header carrying the artifact's fingerprint on downloads.
pub const FINGERPRINT_HEADER: &str = "x-content-fingerprint";

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Query parameters for an archival upload.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArchiveParams {
    /// Display name of the upload. Blank names are stored as `unnamed`.
    pub name: Option<String>,
}

/// Whether an upload created a new archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    Created,
    Duplicate,
}

/// Result of an archival upload. Returned with 201 for `created` and 409
/// for `duplicate`; a duplicate describes the original upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArchiveResponse {
    pub status: ArchiveStatus,
    /// Lowercase hex SHA-256 of the content.
    pub fingerprint: String,
    pub artifact_uri: String,
    pub original_name: String,
    pub created_at: DateTime<Utc>,
    /// Record id, present only when the record was created by this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

/// One archive record.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArchiveRecordView {
    pub id: Uuid,
    pub original_name: String,
    pub fingerprint: String,
    pub artifact_uri: String,
    pub created_at: DateTime<Utc>,
}

impl From<ArchiveRecord> for ArchiveRecordView {
    fn from(record: ArchiveRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            original_name: record.original_name,
            fingerprint: record.fingerprint.to_hex(),
            artifact_uri: record.artifact_uri.to_string(),
            created_at: record.created_at,
        }
    }
}

/// The caller's archives, newest first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ArchiveListResponse {
    pub owner_id: String,
    pub count: usize,
    pub archives: Vec<ArchiveRecordView>,
}

/// Answer to a duplicate check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExistsResponse {
    pub fingerprint: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the archives router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/archives", post(create_archive).get(list_archives))
        .route("/v1/archives/check/{fingerprint}", get(check_archive))
        .route("/v1/archives/{fingerprint}/content", get(fetch_content))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/archives: Archive the request body for the caller.
///
/// The body is streamed through the digest engine; it is never buffered
/// whole. Content the caller already archived is not stored again.
#[utoipa::path(
    post,
    path = "/v1/archives",
    params(ArchiveParams),
    request_body(content = Vec<u8>, description = "Raw content to archive", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Content archived", body = ArchiveResponse),
        (status = 409, description = "Content already archived by this owner", body = ArchiveResponse),
        (status = 401, description = "Missing or invalid credentials", body = crate::error::ErrorBody),
        (status = 422, description = "Content empty, too large, or unreadable", body = crate::error::ErrorBody),
        (status = 503, description = "Storage or ledger unavailable; retry later", body = crate::error::ErrorBody),
    ),
    tag = "archives"
)]
pub(crate) async fn create_archive(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(params): Query<ArchiveParams>,
    body: Body,
) -> Result<(StatusCode, Json<ArchiveResponse>), AppError> {
    let name = params.name.unwrap_or_default();
    let mut source = BodySource::new(body);

    let outcome = state
        .archiver
        .archive(&caller.owner, &name, &mut source, state.deadline())
        .await;

    match outcome {
        ArchiveOutcome::Created {
            fingerprint,
            artifact_uri,
            record,
        } => Ok((
            StatusCode::CREATED,
            Json(ArchiveResponse {
                status: ArchiveStatus::Created,
                fingerprint: fingerprint.to_hex(),
                artifact_uri: artifact_uri.to_string(),
                original_name: record.original_name,
                created_at: record.created_at,
                id: Some(*record.id.as_uuid()),
            }),
        )),
        ArchiveOutcome::Duplicate {
            fingerprint,
            artifact_uri,
            original_name,
            created_at,
        } => Ok((
            StatusCode::CONFLICT,
            Json(ArchiveResponse {
                status: ArchiveStatus::Duplicate,
                fingerprint: fingerprint.to_hex(),
                artifact_uri: artifact_uri.to_string(),
                original_name,
                created_at,
                id: None,
            }),
        )),
        ArchiveOutcome::Rejected { reason } => Err(reason.into()),
    }
}

/// GET /v1/archives: List the caller's archives, newest first.
#[utoipa::path(
    get,
    path = "/v1/archives",
    responses(
        (status = 200, description = "Caller's archives", body = ArchiveListResponse),
        (status = 401, description = "Missing or invalid credentials", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger unavailable", body = crate::error::ErrorBody),
    ),
    tag = "archives"
)]
pub(crate) async fn list_archives(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ArchiveListResponse>, AppError> {
    let archives: Vec<ArchiveRecordView> = state
        .archiver
        .list_archives(&caller.owner)
        .await?
        .into_iter()
        .map(ArchiveRecordView::from)
        .collect();
    Ok(Json(ArchiveListResponse {
        owner_id: caller.owner.to_string(),
        count: archives.len(),
        archives,
    }))
}

/// GET /v1/archives/check/{fingerprint}: Has the caller archived this content?
#[utoipa::path(
    get,
    path = "/v1/archives/check/{fingerprint}",
    params(("fingerprint" = String, Path, description = "Hex SHA-256 of the content")),
    responses(
        (status = 200, description = "Check result", body = ExistsResponse),
        (status = 422, description = "Malformed fingerprint", body = crate::error::ErrorBody),
        (status = 503, description = "Ledger unavailable", body = crate::error::ErrorBody),
    ),
    tag = "archives"
)]
pub(crate) async fn check_archive(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(fingerprint): Path<String>,
) -> Result<Json<ExistsResponse>, AppError> {
    let fingerprint = Fingerprint::from_hex(&fingerprint)?;
    let report = state.archiver.exists(&caller.owner, &fingerprint).await?;
    Ok(Json(ExistsResponse {
        fingerprint: fingerprint.to_hex(),
        exists: report.exists,
        original_name: report.original_name,
        artifact_uri: report.artifact_uri.map(|u| u.to_string()),
        created_at: report.created_at,
    }))
}

/// GET /v1/archives/{fingerprint}/content: Download the stored artifact.
#[utoipa::path(
    get,
    path = "/v1/archives/{fingerprint}/content",
    params(("fingerprint" = String, Path, description = "Hex SHA-256 of the content")),
    responses(
        (status = 200, description = "Stored artifact bytes", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "Caller never archived this fingerprint", body = crate::error::ErrorBody),
        (status = 422, description = "Malformed fingerprint", body = crate::error::ErrorBody),
    ),
    tag = "archives"
)]
pub(crate) async fn fetch_content(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(fingerprint): Path<String>,
) -> Result<Response, AppError> {
    let fingerprint = Fingerprint::from_hex(&fingerprint)?;
    let Some((record, bytes)) = state.archiver.retrieve(&caller.owner, &fingerprint).await? else {
        return Err(AppError::NotFound(format!("no archive with fingerprint {fingerprint}")));
    };

    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    if let Ok(value) = HeaderValue::from_str(&record.fingerprint.to_hex()) {
        headers.insert(FINGERPRINT_HEADER, value);
    }
    Ok(response)
}
