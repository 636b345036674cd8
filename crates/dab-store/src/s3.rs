//! # S3 Object Store
//!
//! [`ObjectStore`] over an AWS S3 bucket via `aws-sdk-s3`. Requires the `s3`
//! feature.
//!
//! ## Credentials
//!
//! Static credentials from [`S3Config`] when both keys are present;
//! otherwise the default provider chain (environment, profile, IMDS).
//!
//! ## Expiry
//!
//! A `put` with an expiry sets the object's `Expires` header. Enforcement is
//! left to the bucket's lifecycle rules.

use std::time::SystemTime;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTime};

use crate::backend::ObjectStore;
use crate::config::S3Config;
use crate::error::StoreError;

const BACKEND: &str = "s3";

/// An S3 bucket as an [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client for the configured bucket and region.
    pub async fn connect(config: &S3Config) -> Result<Self, StoreError> {
        if config.bucket.is_empty() {
            return Err(StoreError::Backend {
                backend: BACKEND,
                message: "bucket name is required".into(),
            });
        }
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if !config.region.is_empty() {
            loader = loader.region(aws_config::Region::new(config.region.clone()));
        }
        if let Some((access_key, secret_key)) = config.static_credentials() {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "dab-static",
            ));
        }
        let sdk_config = loader.load().await;
        tracing::info!(bucket = %config.bucket, region = %config.region, "S3 object store configured");
        Ok(Self::from_client(
            aws_sdk_s3::Client::new(&sdk_config),
            config.bucket.clone(),
        ))
    }

    /// Wrap an existing client.
    pub fn from_client(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn backend_error(op: &str, key: &str, err: impl std::error::Error) -> StoreError {
    StoreError::Backend {
        backend: BACKEND,
        message: format!("{op} {key}: {}", DisplayErrorContext(err)),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        expires: Option<SystemTime>,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_expires(expires.map(DateTime::from))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key, error = %DisplayErrorContext(&e), "S3 put failed");
                backend_error("put", key, e)
            })?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let resp = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Err(StoreError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(backend_error("get", key, e)),
        };
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| backend_error("read body of", key, e))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| backend_error("head bucket", &self.bucket, e))?;
        Ok(())
    }
}
