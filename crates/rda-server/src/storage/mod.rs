//! Object storage access
//!
//! The segment catalog and the content cache only need three calls from an
//! object store, captured by [`ObjectStore`]. [`S3ObjectStore`] talks to S3 (or
//! MinIO) through aws-sdk-s3; [`InMemoryObjectStore`] keeps objects in memory
//! for tests and local runs.

use async_trait::async_trait;
use rda_common::{RdaError, Result};
use std::path::Path;

pub mod config;
pub mod memory;
pub mod s3;

pub use config::StorageConfig;
pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub etag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub etag: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object in `bucket` whose key starts with `prefix`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>>;

    /// Fails with [`rda_common::RdaError::NotFound`] when the key does not exist.
    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata>;

    /// Writes the object's content to `destination`, returning the version
    /// that was actually downloaded.
    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> Result<ObjectMetadata>;
}

/// S3 reports ETags wrapped in double quotes.
pub(crate) fn normalize_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// The normalized ETag of `s3://bucket/key`. Cache file names are built from
/// it, so an object without one cannot be cached.
pub(crate) fn required_etag(etag: Option<&str>, bucket: &str, key: &str) -> Result<String> {
    match etag.map(normalize_etag) {
        Some(etag) if !etag.is_empty() => Ok(etag),
        _ => Err(RdaError::Storage(format!("s3://{bucket}/{key} has no ETag"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_etag() {
        assert_eq!(normalize_etag("\"abc123\""), "abc123");
        assert_eq!(normalize_etag("abc-2"), "abc-2");
    }

    #[test]
    fn test_missing_etag_is_an_error() {
        assert_eq!(
            required_etag(Some("\"abc\""), "bucket", "fiss.ndjson").ok(),
            Some("abc".to_string())
        );
        assert!(matches!(
            required_etag(None, "bucket", "fiss.ndjson"),
            Err(RdaError::Storage(_))
        ));
        assert!(matches!(
            required_etag(Some("\"\""), "bucket", "fiss.ndjson"),
            Err(RdaError::Storage(_))
        ));
    }
}
