//! # ddas-api: Axum API Service
//!
//! HTTP adapter over the archive engine, built on Axum/Tower/Tokio.
//!
//! ## API Surface
//!
//! | Method | Path | Status |
//! |--------|------|--------|
//! | `POST` | `/v1/archives?name=…` | 201 created, 409 duplicate, 422 invalid input, 503 archival failed |
//! | `GET` | `/v1/archives` | 200 |
//! | `GET` | `/v1/archives/check/{fingerprint}` | 200 |
//! | `GET` | `/v1/archives/{fingerprint}/content` | 200, 404 |
//! | `GET` | `/openapi.json` | 200 |
//! | `GET` | `/health/liveness`, `/health/readiness` | 200 / 503 (unauthenticated) |
//! | `GET` | `/metrics` | 200 (unauthenticated) |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers: delegates to `ddas-archive`.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod body;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::archives::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config));

    Router::new()
        .merge(routes::health::router())
        .merge(api)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .with_state(state)
}
