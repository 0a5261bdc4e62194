//! Local cache of object-storage files keyed by ETag
//!
//! Each downloaded object is stored as `s3-<name>-<etag>.dat` in the cache
//! directory. A cache entry is written once: it is downloaded into a private
//! temporary file and then linked into place without overwriting, so readers
//! never observe a partially written entry. When two callers race on the same
//! entry both download identical bytes and whichever lands second simply
//! discards its copy.

use flate2::bufread::GzDecoder;
use rda_common::{RdaError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::storage::ObjectStore;

pub const CACHE_FILE_PREFIX: &str = "s3-";
pub const CACHE_FILE_SUFFIX: &str = ".dat";
pub const ETAG_SEPARATOR: &str = "-";
const TEMP_FILE_PREFIX: &str = "s3d";
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// A cached copy of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    /// Object name relative to the cache's directory.
    pub name: String,
    pub etag: String,
    pub path: PathBuf,
}

impl CachedFile {
    /// Opens the content, gunzipping it when the object name ends in `.gz`.
    /// The reader blocks; async callers read it on the blocking pool.
    pub fn open_reader(&self) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(&self.path)?;
        let compressed = self.name.to_lowercase().ends_with(".gz");
        Ok(open_possibly_compressed(BufReader::new(file), compressed))
    }
}

pub(crate) fn open_possibly_compressed<R>(reader: R, compressed: bool) -> Box<dyn BufRead + Send>
where
    R: BufRead + Send + 'static,
{
    if compressed {
        Box::new(BufReader::new(GzDecoder::new(reader)))
    } else {
        Box::new(reader)
    }
}

/// Caches the objects of one bucket directory on the local filesystem.
pub struct DirectoryCache {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    directory: String,
    cache_dir: PathBuf,
    delete_on_exit: bool,
    valid_key: Regex,
}

impl DirectoryCache {
    /// `directory` is the key prefix inside the bucket; an empty string means
    /// the bucket root. The cache directory is created if missing.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        directory: &str,
        cache_dir: impl Into<PathBuf>,
        delete_on_exit: bool,
    ) -> Result<Self> {
        let directory = normalize_directory(directory);
        let valid_key = Regex::new(&format!(
            "(?i)^{}([_a-z0-9][-_.a-z0-9]+)$",
            regex::escape(&directory)
        ))
        .map_err(|e| RdaError::Config(format!("Invalid directory '{directory}': {e}")))?;

        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            store,
            bucket: bucket.into(),
            directory,
            cache_dir,
            delete_on_exit,
            valid_key,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Full keys of every object under the directory, valid names or not.
    pub async fn list_object_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_objects(&self.bucket, &self.directory)
            .await?
            .into_iter()
            .map(|object| object.key)
            .collect())
    }

    /// Names of the objects currently in the directory.
    pub async fn read_file_names(&self) -> Result<Vec<String>> {
        Ok(self
            .list_entries()
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// Returns a local copy of `name`, downloading it unless the current
    /// version is already cached.
    #[instrument(skip(self), fields(bucket = %self.bucket, directory = %self.directory))]
    pub async fn download_file(&self, name: &str) -> Result<CachedFile> {
        let key = format!("{}{}", self.directory, name);
        let metadata = self.store.object_metadata(&self.bucket, &key).await?;

        let cached_path = self.cache_path(name, &metadata.etag);
        if tokio::fs::try_exists(&cached_path).await? {
            debug!(etag = %metadata.etag, "Cache hit");
            return Ok(CachedFile {
                name: name.to_string(),
                etag: metadata.etag,
                path: cached_path,
            });
        }

        // Removed on drop unless persisted, which covers every error path.
        let temp_path = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(TEMP_FILE_SUFFIX)
            .tempfile_in(&self.cache_dir)?
            .into_temp_path();

        let downloaded = self
            .store
            .download_object(&self.bucket, &key, &temp_path)
            .await?;

        // The object may have changed since the metadata call.
        let final_path = self.cache_path(name, &downloaded.etag);
        match temp_path.persist_noclobber(&final_path) {
            Ok(()) => {
                info!(etag = %downloaded.etag, path = %final_path.display(), "Cached object");
            },
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(etag = %downloaded.etag, "Another download cached this version first");
            },
            Err(e) => return Err(RdaError::Io(e.error)),
        }

        Ok(CachedFile {
            name: name.to_string(),
            etag: downloaded.etag,
            path: final_path,
        })
    }

    /// Deletes cached files whose object no longer exists or has a newer
    /// version. Returns the number of files removed.
    #[instrument(skip(self), fields(cache_dir = %self.cache_dir.display()))]
    pub async fn delete_obsolete_files(&self) -> Result<usize> {
        let current: HashSet<String> = self
            .list_entries()
            .await?
            .iter()
            .map(|(name, etag)| cache_file_name(name, etag))
            .collect();

        let removed = self
            .remove_cache_files(|file_name| !current.contains(file_name))
            .await?;
        info!(removed, "Deleted obsolete cache files");
        Ok(removed)
    }

    /// Deletes every cache file regardless of whether it is current.
    pub async fn delete_all_files(&self) -> Result<usize> {
        let removed = self.remove_cache_files(|_| true).await?;
        info!(removed, cache_dir = %self.cache_dir.display(), "Deleted all cache files");
        Ok(removed)
    }

    /// Removes the cache contents and directory when `delete_on_exit` is set.
    pub async fn close(&self) -> Result<()> {
        if !self.delete_on_exit {
            return Ok(());
        }

        self.delete_all_files().await?;
        match tokio::fs::remove_dir(&self.cache_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(error = %e, cache_dir = %self.cache_dir.display(), "Cache directory not removed");
                Err(e.into())
            },
        }
    }

    async fn list_entries(&self) -> Result<Vec<(String, String)>> {
        let objects = self
            .store
            .list_objects(&self.bucket, &self.directory)
            .await?;

        Ok(objects
            .into_iter()
            .filter_map(|object| {
                self.valid_key
                    .captures(&object.key)
                    .and_then(|captures| captures.get(1))
                    .map(|name| (name.as_str().to_string(), object.etag))
            })
            .collect())
    }

    async fn remove_cache_files<F>(&self, should_remove: F) -> Result<usize>
    where
        F: Fn(&str) -> bool,
    {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.cache_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !is_cache_file_name(&file_name) || !should_remove(&file_name) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e.into()),
            }
        }

        Ok(removed)
    }

    fn cache_path(&self, name: &str, etag: &str) -> PathBuf {
        self.cache_dir.join(cache_file_name(name, etag))
    }
}

fn normalize_directory(directory: &str) -> String {
    let trimmed = directory.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

pub fn cache_file_name(name: &str, etag: &str) -> String {
    format!("{CACHE_FILE_PREFIX}{name}{ETAG_SEPARATOR}{etag}{CACHE_FILE_SUFFIX}")
}

fn is_cache_file_name(file_name: &str) -> bool {
    file_name.starts_with(CACHE_FILE_PREFIX) && file_name.ends_with(CACHE_FILE_SUFFIX)
}
