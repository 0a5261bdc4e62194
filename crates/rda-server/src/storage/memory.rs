use async_trait::async_trait;
use rda_common::{RdaError, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ObjectMetadata, ObjectStore, ObjectSummary};

struct StoredObject {
    content: Vec<u8>,
    etag: String,
}

/// Object store held entirely in memory.
///
/// ETags are content hashes, so re-putting identical bytes keeps the version
/// unchanged. Counts content downloads so callers can observe cache hits.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    downloads: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` under `bucket`/`key`, returning its ETag.
    pub fn put_object(&self, bucket: &str, key: &str, content: impl Into<Vec<u8>>) -> String {
        let content = content.into();
        let etag = content_etag(&content);
        self.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content,
                etag: etag.clone(),
            },
        );
        etag
    }

    pub fn remove_object(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some()
    }

    /// Number of `download_object` calls that transferred content.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing(bucket: &str, key: &str) -> RdaError {
        RdaError::NotFound(format!("memory://{bucket}/{key}"))
    }
}

fn content_etag(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{:x}", digest)[..32].to_string()
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>> {
        Ok(self
            .lock()
            .iter()
            .filter(|((object_bucket, key), _)| object_bucket == bucket && key.starts_with(prefix))
            .map(|((_, key), object)| ObjectSummary {
                key: key.clone(),
                etag: object.etag.clone(),
            })
            .collect())
    }

    async fn object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| ObjectMetadata {
                etag: object.etag.clone(),
            })
            .ok_or_else(|| Self::missing(bucket, key))
    }

    async fn download_object(
        &self,
        bucket: &str,
        key: &str,
        destination: &Path,
    ) -> Result<ObjectMetadata> {
        let (content, etag) = {
            let objects = self.lock();
            let object = objects
                .get(&(bucket.to_string(), key.to_string()))
                .ok_or_else(|| Self::missing(bucket, key))?;
            (object.content.clone(), object.etag.clone())
        };

        tokio::fs::write(destination, &content).await?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(ObjectMetadata { etag })
    }
}
