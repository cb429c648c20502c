//! # Amazon S3 Archive Store
//!
//! Artifacts are written to `s3://{bucket}/{owner}/{id}` through the AWS SDK
//! using the default credential chain (environment, profile, IMDS, ...).
//!
//! ## Error Classification
//!
//! | SDK failure | Class |
//! |-------------|-------|
//! | timeout, dispatch failure, unparseable response | `Unavailable` |
//! | HTTP 408, 412, 429, 5xx | `Unavailable` |
//! | HTTP 404 on `get` | `NotFound` |
//! | any other 4xx, request construction failure | `Rejected` |
//!
//! `put` sends `If-None-Match: *`, so S3 itself refuses to overwrite a key.
//! A 412 can only mean a key collision, which a retry resolves.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use ddas_core::{ArtifactUri, OwnerId};

use crate::error::{StoreError, StoreOp};
use crate::key::ObjectKey;
use crate::payload::ArtifactPayload;
use crate::ArchiveStore;

/// URI scheme of this backend.
pub const S3_SCHEME: &str = "s3";

/// Archive store backed by an S3 bucket.
#[derive(Debug, Clone)]
pub struct S3ArchiveStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ArchiveStore {
    /// Wrap an existing client.
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the environment, optionally overriding the region.
    pub async fn from_env(bucket: impl Into<String>, region: Option<&str>) -> Self {
        let mut config_loader = aws_config::from_env();
        if let Some(r) = region {
            config_loader = config_loader.region(aws_config::Region::new(r.to_string()));
        }
        let sdk_config = config_loader.load().await;
        Self::new(aws_sdk_s3::Client::new(&sdk_config), bucket)
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn key_for(&self, uri: &ArtifactUri) -> Result<ObjectKey, StoreError> {
        if uri.scheme() != S3_SCHEME || uri.container() != self.bucket {
            return Err(StoreError::rejected(format!(
                "{uri} does not belong to bucket s3://{}",
                self.bucket
            )));
        }
        ObjectKey::parse(uri.key())
    }

    fn uri_for(&self, key: &str) -> Result<ArtifactUri, StoreError> {
        ArtifactUri::from_parts(S3_SCHEME, &self.bucket, key)
            .map_err(|e| StoreError::rejected(e.to_string()))
    }
}

/// Map an SDK error onto the store taxonomy.
fn classify<E>(op: StoreOp, err: SdkError<E, HttpResponse>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            match status {
                404 if op == StoreOp::Get => StoreError::NotFound {
                    uri: String::new(),
                },
                408 | 412 | 429 | 500..=599 => StoreError::unavailable(op, format!("HTTP {status}: {err}")),
                _ => StoreError::rejected(format!("{op} failed with HTTP {status}: {err}")),
            }
        }
        SdkError::ConstructionFailure(_) => StoreError::rejected(format!("{op}: {err}")),
        _ => StoreError::unavailable(op, &err),
    }
}

#[async_trait]
impl ArchiveStore for S3ArchiveStore {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn put(
        &self,
        owner: &OwnerId,
        payload: &ArtifactPayload,
    ) -> Result<ArtifactUri, StoreError> {
        let key = ObjectKey::generate(owner).to_string();
        let uri = self.uri_for(&key)?;
        let body = match payload {
            ArtifactPayload::Bytes(bytes) => ByteStream::from(bytes.clone()),
            ArtifactPayload::File { path, .. } => ByteStream::from_path(path)
                .await
                .map_err(|e| StoreError::unavailable(StoreOp::Put, e))?,
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_length(payload.len() as i64)
            .if_none_match("*")
            .body(body)
            .send()
            .await
            .map_err(|e| classify(StoreOp::Put, e))?;

        tracing::debug!(artifact_uri = %uri, bytes = payload.len(), "artifact uploaded");
        Ok(uri)
    }

    async fn get(&self, uri: &ArtifactUri) -> Result<Vec<u8>, StoreError> {
        let key = self.key_for(uri)?;
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.to_string())
            .send()
            .await
            .map_err(|e| match classify(StoreOp::Get, e) {
                StoreError::NotFound { .. } => StoreError::NotFound {
                    uri: uri.to_string(),
                },
                other => other,
            })?;
        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::unavailable(StoreOp::Get, e))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<ArtifactUri>, StoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(ObjectKey::owner_prefix(owner))
            .into_paginator()
            .send();

        let mut uris = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify(StoreOp::List, e))?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                // Skip objects this store did not write.
                if ObjectKey::parse(key).is_ok() {
                    uris.push(self.uri_for(key)?);
                }
            }
        }
        uris.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(uris)
    }

    async fn delete(&self, uri: &ArtifactUri) -> Result<(), StoreError> {
        let key = self.key_for(uri)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key.to_string())
            .send()
            .await
            .map_err(|e| classify(StoreOp::Delete, e))?;
        Ok(())
    }
}
