//! # Authentication Middleware
//!
//! Resolves the owner on whose behalf a request archives or reads content.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {owner_id}:{secret}
//! ```
//!
//! The secret is compared in constant time against `AUTH_TOKEN`. The owner
//! id is everything before the `:` that precedes the secret, so owner ids
//! may themselves contain `:`.
//!
//! ## Development Mode
//!
//! Without `AUTH_TOKEN`, the owner is taken verbatim from the `X-Owner-Id`
//! header. Never run a shared deployment this way.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ddas_core::OwnerId;
use subtle::{Choice, ConstantTimeEq};

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Header naming the owner in development mode.
pub static OWNER_HEADER: HeaderName = HeaderName::from_static("x-owner-id");

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated owner of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Owner whose archives the request reads and writes.
    pub owner: OwnerId,
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of secrets. On a length mismatch the expected
/// secret is compared against a zero buffer of its own length, and that
/// result is folded into the answer.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    let same_len = Choice::from(u8::from(provided.len() == expected.len()));
    let zeros = vec![0u8; expected.len()];
    let candidate = if provided.len() == expected.len() {
        provided
    } else {
        zeros.as_slice()
    };
    (candidate.ct_eq(expected) & same_len).into()
}

/// Parse a bearer token of the form `{owner_id}:{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let split = provided
        .len()
        .checked_sub(expected_secret.len() + 1)
        .filter(|&at| provided.is_char_boundary(at) && provided.as_bytes()[at] == b':');

    let (owner, secret) = match split {
        Some(at) => (&provided[..at], &provided[at + 1..]),
        None => ("", ""),
    };
    let secret_ok = constant_time_token_eq(secret, expected_secret);
    if split.is_none() || !secret_ok {
        return Err("invalid bearer token".into());
    }

    let owner = OwnerId::new(owner).map_err(|e| format!("invalid owner in token: {e}"))?;
    Ok(CallerIdentity { owner })
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the caller and inject a [`CallerIdentity`] into request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let identity = match expected_token {
        Some(expected) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(value) => match value.strip_prefix("Bearer ") {
                    Some(provided) => parse_bearer_token(provided, &expected),
                    None => Err("authorization header must use Bearer scheme".to_string()),
                },
                None => Err("missing authorization header".to_string()),
            }
        }
        None => match request.headers().get(&OWNER_HEADER).and_then(|v| v.to_str().ok()) {
            Some(raw) => OwnerId::new(raw)
                .map(|owner| CallerIdentity { owner })
                .map_err(|e| format!("invalid {OWNER_HEADER} header: {e}")),
            None => Err(format!("missing {OWNER_HEADER} header")),
        },
    };

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(msg) => {
            tracing::warn!(reason = %msg, "authentication failed");
            unauthorized_response(&msg)
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Echo the resolved owner.
    fn test_app(token: Option<String>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|caller: CallerIdentity| async move { caller.owner.to_string() }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(AuthConfig { token }))
    }

    async fn call(app: Router, header: Option<(&str, &str)>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn secret_comparison_requires_equal_length() {
        assert!(constant_time_token_eq("s3cret", "s3cret"));
        assert!(!constant_time_token_eq("s3cre", "s3cret"));
        assert!(!constant_time_token_eq("s3crett", "s3cret"));
        assert!(!constant_time_token_eq("", "s3cret"));
        // A zero buffer of the right length must not match a zero secret
        // unless the lengths agree.
        assert!(!constant_time_token_eq("", "\0\0"));
        assert!(constant_time_token_eq("\0\0", "\0\0"));
    }

    #[test]
    fn token_parsing() {
        assert_eq!(parse_bearer_token("u1:s3cret", "s3cret").unwrap().owner.as_str(), "u1");
        assert_eq!(
            parse_bearer_token("org:team:s3cret", "s3cret").unwrap().owner.as_str(),
            "org:team"
        );
        assert!(parse_bearer_token("u1:wrong!", "s3cret").is_err());
        assert!(parse_bearer_token("s3cret", "s3cret").is_err());
        assert!(parse_bearer_token(":s3cret", "s3cret").is_err());
        assert!(parse_bearer_token("a/b:s3cret", "s3cret").is_err());
    }

    #[tokio::test]
    async fn valid_bearer_token_resolves_owner() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, Some(("Authorization", "Bearer u1:s3cret"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u1");
    }

    #[tokio::test]
    async fn missing_authorization_header_rejected() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let err: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let app = test_app(Some("s3cret".into()));
        let (status, _) = call(app, Some(("Authorization", "Bearer u1:guess"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = test_app(Some("s3cret".into()));
        let (status, body) = call(app, Some(("Authorization", "Basic dTE6czNjcmV0"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn owner_header_ignored_when_auth_enabled() {
        let app = test_app(Some("s3cret".into()));
        let (status, _) = call(app, Some(("X-Owner-Id", "u1"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn development_mode_uses_owner_header() {
        let (status, body) = call(test_app(None), Some(("X-Owner-Id", "dev-user"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "dev-user");

        let (status, _) = call(test_app(None), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(test_app(None), Some(("X-Owner-Id", "../etc"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", AuthConfig { token: Some("s3cret".into()) });
        assert!(!debug.contains("s3cret"));
    }
}
