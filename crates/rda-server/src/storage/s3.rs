use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    Client,
};
use rda_common::{RdaError, Result};
use std::fmt::Display;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use super::{required_etag, ObjectMetadata, ObjectStore, ObjectSummary, StorageConfig};

/// [`ObjectStore`] backed by an aws-sdk-s3 client.
///
/// Retry and timeout policy come from the client configuration; failures are
/// reported to the caller as [`RdaError::Storage`].
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn new(config: &StorageConfig) -> anyhow::Result<Self> {
        Self::check_config(config).context("Invalid storage configuration")?;
        debug!(
            region = %config.region,
            endpoint = ?config.endpoint,
            path_style = config.path_style,
            "Initializing S3 client"
        );

        let mut builder = match config.static_credentials() {
            Some((access_key, secret_key)) => {
                let credentials =
                    Credentials::new(access_key, secret_key, None, None, "rda-storage");
                aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .credentials_provider(credentials)
                    .region(Region::new(config.region.clone()))
            },
            None => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder.force_path_style(config.path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());
        info!(bucket = %config.bucket, "S3 client initialized");

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn check_config(config: &StorageConfig) -> anyhow::Result<()> {
        if config.bucket.trim().is_empty() {
            anyhow::bail!("S3 bucket name cannot be empty");
        }
        Ok(())
    }
}

fn storage_error<E>(context: impl Display, error: E) -> RdaError
where
    E: std::error::Error,
{
    RdaError::Storage(format!("{}: {}", context, DisplayErrorContext(&error)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut summaries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| storage_error(format!("Failed to list s3://{bucket}/{prefix}"), e))?;

            for object in response.contents() {
                if let Some(key) = object.key() {
                    summaries.push(ObjectSummary {
                        key: key.to_string(),
                        etag: required_etag(object.e_tag(), bucket, key)?,
                    });
                }
            }

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                },
                _ => break,
            }
        }

        debug!(count = summaries.len(), "Listed objects in s3://{}/{}", bucket, prefix);
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) {
                    RdaError::NotFound(format!("s3://{bucket}/{key}"))
                } else {
                    storage_error(format!("Failed to get metadata for s3://{bucket}/{key}"), e)
                }
            })?;

        Ok(ObjectMetadata {
            etag: required_etag(response.e_tag(), bucket, key)?,
        })
    }

    #[instrument(skip(self))]
    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> Result<ObjectMetadata> {
        debug!("Downloading s3://{}/{} to {}", bucket, key, destination.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    RdaError::NotFound(format!("s3://{bucket}/{key}"))
                } else {
                    storage_error(format!("Failed to download s3://{bucket}/{key}"), e)
                }
            })?;

        let metadata = ObjectMetadata {
            etag: required_etag(response.e_tag(), bucket, key)?,
        };

        let mut body = response.body.into_async_read();
        let mut file = tokio::fs::File::create(destination).await?;
        let bytes = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        debug!(bytes, etag = %metadata.etag, "Downloaded s3://{}/{}", bucket, key);
        Ok(metadata)
    }
}
