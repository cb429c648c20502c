//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the archive API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "DDAS: Content-Addressed Archive API",
        version = "0.1.0",
        description = "Archive content once per owner: uploads are fingerprinted with SHA-256, duplicates are reported instead of stored, and first sightings are written to object storage and registered atomically.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::archives::create_archive,
        crate::routes::archives::list_archives,
        crate::routes::archives::check_archive,
        crate::routes::archives::fetch_content,
    ),
    components(schemas(
        crate::routes::archives::ArchiveStatus,
        crate::routes::archives::ArchiveResponse,
        crate::routes::archives::ArchiveRecordView,
        crate::routes::archives::ArchiveListResponse,
        crate::routes::archives::ExistsResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "archives", description = "Owner-scoped archival and duplicate detection"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
