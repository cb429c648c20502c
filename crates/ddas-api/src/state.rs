//! # Application State
//!
//! Shared state for the Axum application: the archive engine, the server
//! configuration, and the Prometheus handle.

use std::time::Duration;

use ddas_archive::{Archiver, Deadline};
use metrics_exporter_prometheus::PrometheusHandle;

/// Server configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, the owner comes from `X-Owner-Id`.
    pub auth_token: Option<String>,
    /// Serve `/metrics`.
    pub metrics_enabled: bool,
    /// Deadline applied to each archival request.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("metrics_enabled", &self.metrics_enabled)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            metrics_enabled: true,
            request_timeout: Duration::from_secs(ddas_archive::config::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load server settings from `PORT`, `AUTH_TOKEN`, and
    /// `DDAS_METRICS_ENABLED`. Malformed values fall back to defaults.
    pub fn from_env(request_timeout: Duration) -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            auth_token: std::env::var("AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            metrics_enabled: std::env::var("DDAS_METRICS_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_enabled),
            request_timeout,
        }
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub archiver: Archiver,
    pub config: AppConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// State without a metrics exporter.
    pub fn new(archiver: Archiver, config: AppConfig) -> Self {
        Self {
            archiver,
            config,
            metrics: None,
        }
    }

    /// Attach the handle `/metrics` renders from.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// A fresh deadline for one archival request.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.request_timeout)
    }
}
