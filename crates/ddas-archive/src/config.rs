//! Archive engine configuration.
//!
//! Read from environment variables. Every setting has a default except the
//! S3 bucket, which is required only when the S3 backend is selected.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ddas_store::retry::DEFAULT_MAX_ATTEMPTS;
use ddas_store::RetryPolicy;

use crate::archiver::{ArchiverOptions, ArtifactMode};

/// Default PostgreSQL pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Default root directory of the local store backend.
pub const DEFAULT_STORE_DIR: &str = "./data/artifacts";

/// Default URI container name for the local and memory backends.
pub const DEFAULT_STORE_NAME: &str = "archive";

/// Default per-archive deadline applied by the adapters.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Object storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Filesystem directory.
    Local {
        /// Root directory.
        dir: PathBuf,
        /// URI container name.
        name: String,
    },
    /// Process memory; contents are lost on exit.
    Memory {
        /// URI container name.
        name: String,
    },
    /// Amazon S3 (requires the `s3` feature).
    S3 {
        /// Bucket name.
        bucket: String,
        /// Region override.
        region: Option<String>,
    },
}

impl StoreBackend {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Memory { .. } => "memory",
            Self::S3 { .. } => "s3",
        }
    }
}

/// Full configuration of an archive engine.
///
/// Custom `Debug` redacts `database_url`, which usually embeds a password.
#[derive(Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// PostgreSQL connection string. `None` selects the in-memory ledger.
    pub database_url: Option<String>,
    /// PostgreSQL pool size.
    pub db_max_connections: u32,
    /// Object storage backend.
    pub store: StoreBackend,
    /// Store-side quota: per object for the local backend, total bytes for
    /// the memory backend.
    pub max_object_bytes: Option<u64>,
    /// Orchestrator options.
    pub archiver: ArchiverOptions,
    /// Per-archive deadline used by the adapters.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("store", &self.store)
            .field("max_object_bytes", &self.max_object_bytes)
            .field("archiver", &self.archiver)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            store: StoreBackend::Local {
                dir: PathBuf::from(DEFAULT_STORE_DIR),
                name: DEFAULT_STORE_NAME.to_string(),
            },
            max_object_bytes: None,
            archiver: ArchiverOptions::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ArchiveConfig {
    /// In-memory ledger and store; for tests and local experiments.
    pub fn in_memory() -> Self {
        Self {
            store: StoreBackend::Memory {
                name: DEFAULT_STORE_NAME.to_string(),
            },
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DATABASE_URL` (unset: in-memory ledger)
    /// - `DDAS_DB_MAX_CONNECTIONS` (default: 10)
    /// - `DDAS_STORE_BACKEND` = `local` | `memory` | `s3` (default: `local`)
    /// - `DDAS_STORE_DIR` (default: `./data/artifacts`)
    /// - `DDAS_STORE_NAME` (default: `archive`)
    /// - `DDAS_S3_BUCKET` (required for `s3`), `DDAS_S3_REGION`
    /// - `DDAS_MAX_OBJECT_BYTES`
    /// - `DDAS_ARTIFACT_MODE` = `content` | `manifest` (default: `content`)
    /// - `DDAS_SPOOL_DIR`
    /// - `DDAS_ALLOW_EMPTY` (default: false)
    /// - `DDAS_MAX_CONTENT_BYTES`
    /// - `DDAS_STORE_MAX_ATTEMPTS` (default: 3, at most 3)
    /// - `DDAS_STORE_BASE_DELAY_MS` (default: 200)
    /// - `DDAS_REQUEST_TIMEOUT_SECS` (default: 60, at least 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let store_name = var("DDAS_STORE_NAME").unwrap_or_else(|| DEFAULT_STORE_NAME.to_string());
        let store = match var("DDAS_STORE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => StoreBackend::Local {
                dir: var("DDAS_STORE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR)),
                name: store_name,
            },
            "memory" => StoreBackend::Memory { name: store_name },
            "s3" => StoreBackend::S3 {
                bucket: var("DDAS_S3_BUCKET").ok_or(ConfigError::Missing("DDAS_S3_BUCKET"))?,
                region: var("DDAS_S3_REGION"),
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "DDAS_STORE_BACKEND",
                    value: other.to_string(),
                    reason: "expected local, memory, or s3".to_string(),
                })
            }
        };

        let artifact_mode = match var("DDAS_ARTIFACT_MODE") {
            Some(raw) => ArtifactMode::from_str(&raw).map_err(|reason| ConfigError::Invalid {
                var: "DDAS_ARTIFACT_MODE",
                value: raw,
                reason,
            })?,
            None => ArtifactMode::default(),
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&var, "DDAS_STORE_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay: Duration::from_millis(parse_or(
                &var,
                "DDAS_STORE_BASE_DELAY_MS",
                defaults.base_delay.as_millis() as u64,
            )?),
            max_delay: defaults.max_delay,
        };
        if !(1..=DEFAULT_MAX_ATTEMPTS).contains(&retry.max_attempts) {
            return Err(ConfigError::Invalid {
                var: "DDAS_STORE_MAX_ATTEMPTS",
                value: retry.max_attempts.to_string(),
                reason: format!("must be between 1 and {DEFAULT_MAX_ATTEMPTS}"),
            });
        }

        let timeout_secs = parse_or(&var, "DDAS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DDAS_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            database_url: var("DATABASE_URL"),
            db_max_connections: parse_or(&var, "DDAS_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            store,
            max_object_bytes: parse_opt(&var, "DDAS_MAX_OBJECT_BYTES")?,
            archiver: ArchiverOptions {
                artifact_mode,
                allow_empty: parse_or(&var, "DDAS_ALLOW_EMPTY", false)?,
                max_content_bytes: parse_opt(&var, "DDAS_MAX_CONTENT_BYTES")?,
                spool_dir: var("DDAS_SPOOL_DIR").map(PathBuf::from),
                retry,
            },
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_opt<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                var: key,
                reason: e.to_string(),
                value: raw,
            })
        })
        .transpose()
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(var, key)?.unwrap_or(default))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset.
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    /// A variable could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}
