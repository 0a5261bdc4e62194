//! Configuration management

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::cache::DirectoryCache;
use crate::catalog::SegmentCatalog;
use crate::model::{FissClaimChange, McsClaimChange};
use crate::random::{FissClaimGenerator, GeneratorConfig, McsClaimGenerator};
use crate::server::{
    JsonFileSourceFactory, RandomSourceFactory, RdaService, SourceFactory, DEFAULT_STREAM_CAPACITY,
};
use crate::source::json_parser;
use crate::storage::{ObjectStore, S3ObjectStore, StorageConfig};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_RANDOM_SEED: i64 = 42;
pub const DEFAULT_RANDOM_MAX_TO_SEND: u64 = 5000;

/// Added to the seed for the FISS generator so the two feeds differ.
pub const FISS_SEED_OFFSET: i64 = 12345;

/// Added to the seed for the MCS generator.
pub const MCS_SEED_OFFSET: i64 = 67890;

pub const DEFAULT_FISS_FILE: &str = "fiss.ndjson";
pub const DEFAULT_MCS_FILE: &str = "mcs.ndjson";
pub const DEFAULT_S3_DIRECTORY: &str = "";
pub const DEFAULT_CACHE_DIR_NAME: &str = "rda-cache";

/// Segment key prefix of each feed.
pub const FISS_FEED_NAME: &str = "fiss";
pub const MCS_FEED_NAME: &str = "mcs";
pub const SEGMENT_SUFFIX: &str = "ndjson";

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where the service reads its records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Random,
    File,
    S3,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(SourceKind::Random),
            "file" => Ok(SourceKind::File),
            "s3" => Ok(SourceKind::S3),
            other => anyhow::bail!("Unknown source '{other}', expected random, file or s3"),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Random => "random",
            SourceKind::File => "file",
            SourceKind::S3 => "s3",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceKind,
    pub random: RandomConfig,
    pub files: FileConfig,
    pub s3: S3SourceConfig,
    pub stream_capacity: usize,
}

/// Synthetic generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomConfig {
    pub seed: i64,
    pub max_to_send: u64,
    pub force_optional_fields: bool,
    pub error_rate: u64,
    pub max_unique_claim_ids: u64,
    pub max_unique_mbis: u64,
}

/// Local NDJSON files served by the `file` source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub fiss_file: PathBuf,
    pub mcs_file: PathBuf,
}

/// Object-storage segments served by the `s3` source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3SourceConfig {
    pub storage: StorageConfig,
    pub directory: String,
    pub cache_dir: PathBuf,
    pub delete_cache_on_exit: bool,
}

/// Source factories for both feeds, plus the cache behind them when the
/// segments come from object storage.
pub struct Feeds {
    pub fiss: Arc<dyn SourceFactory<FissClaimChange>>,
    pub mcs: Arc<dyn SourceFactory<McsClaimChange>>,
    pub cache: Option<Arc<DirectoryCache>>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let source = match std::env::var("RDA_SOURCE") {
            Ok(value) => value.parse().context("Invalid RDA_SOURCE")?,
            Err(_) => SourceKind::Random,
        };

        let config = Config {
            source,
            random: RandomConfig {
                seed: env_or("RDA_RANDOM_SEED", DEFAULT_RANDOM_SEED),
                max_to_send: env_or("RDA_RANDOM_MAX_TO_SEND", DEFAULT_RANDOM_MAX_TO_SEND),
                force_optional_fields: env_or("RDA_RANDOM_FORCE_OPTIONAL", false),
                error_rate: env_or("RDA_RANDOM_ERROR_RATE", 0),
                max_unique_claim_ids: env_or("RDA_RANDOM_MAX_CLAIM_IDS", 0),
                max_unique_mbis: env_or("RDA_RANDOM_MAX_MBIS", 0),
            },
            files: FileConfig {
                fiss_file: env_or("RDA_FISS_FILE", PathBuf::from(DEFAULT_FISS_FILE)),
                mcs_file: env_or("RDA_MCS_FILE", PathBuf::from(DEFAULT_MCS_FILE)),
            },
            s3: S3SourceConfig {
                storage: StorageConfig::from_env(),
                directory: std::env::var("RDA_S3_DIRECTORY")
                    .unwrap_or_else(|_| DEFAULT_S3_DIRECTORY.to_string()),
                cache_dir: env_or(
                    "RDA_CACHE_DIR",
                    std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME),
                ),
                delete_cache_on_exit: env_or("RDA_CACHE_DELETE_ON_EXIT", false),
            },
            stream_capacity: env_or("RDA_STREAM_CAPACITY", DEFAULT_STREAM_CAPACITY),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream_capacity == 0 {
            anyhow::bail!("Stream capacity must be greater than 0");
        }

        match self.source {
            SourceKind::Random => {},
            SourceKind::File => {
                for path in [&self.files.fiss_file, &self.files.mcs_file] {
                    if path.as_os_str().is_empty() {
                        anyhow::bail!("File source requires both RDA_FISS_FILE and RDA_MCS_FILE");
                    }
                }
            },
            SourceKind::S3 => {
                if self.s3.storage.bucket.trim().is_empty() {
                    anyhow::bail!("S3 source requires a bucket name");
                }
                if self.s3.cache_dir.as_os_str().is_empty() {
                    anyhow::bail!("S3 source requires a cache directory");
                }
            },
        }

        Ok(())
    }

    pub fn generator_config(&self, seed_offset: i64) -> rda_common::Result<GeneratorConfig> {
        GeneratorConfig::builder()
            .seed(self.random.seed.wrapping_add(seed_offset))
            .force_optional_fields(self.random.force_optional_fields)
            .error_injection_rate(self.random.error_rate)
            .max_unique_claim_ids(self.random.max_unique_claim_ids)
            .max_unique_mbis(self.random.max_unique_mbis)
            .build()
    }

    /// Opens the object-storage cache for the `s3` source.
    pub async fn open_cache(&self) -> anyhow::Result<Arc<DirectoryCache>> {
        let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&self.s3.storage).await?);
        let cache = DirectoryCache::new(
            store,
            self.s3.storage.bucket.clone(),
            &self.s3.directory,
            self.s3.cache_dir.clone(),
            self.s3.delete_cache_on_exit,
        )
        .with_context(|| format!("Failed to open cache in {}", self.s3.cache_dir.display()))?;
        Ok(Arc::new(cache))
    }

    /// Builds the source factories selected by `source`.
    pub async fn feeds(&self) -> anyhow::Result<Feeds> {
        info!(source = %self.source, "Configuring record sources");

        let feeds = match self.source {
            SourceKind::Random => Feeds {
                fiss: Arc::new(RandomSourceFactory::new(
                    FissClaimGenerator::new(self.generator_config(FISS_SEED_OFFSET)?),
                    self.random.max_to_send,
                )),
                mcs: Arc::new(RandomSourceFactory::new(
                    McsClaimGenerator::new(self.generator_config(MCS_SEED_OFFSET)?),
                    self.random.max_to_send,
                )),
                cache: None,
            },
            SourceKind::File => Feeds {
                fiss: Arc::new(JsonFileSourceFactory::new(
                    &self.files.fiss_file,
                    json_parser::<FissClaimChange>(),
                )),
                mcs: Arc::new(JsonFileSourceFactory::new(
                    &self.files.mcs_file,
                    json_parser::<McsClaimChange>(),
                )),
                cache: None,
            },
            SourceKind::S3 => {
                let cache = self.open_cache().await?;
                let fiss = SegmentCatalog::json(
                    cache.clone(),
                    FISS_FEED_NAME,
                    SEGMENT_SUFFIX,
                    json_parser::<FissClaimChange>(),
                )?;
                let mcs = SegmentCatalog::json(
                    cache.clone(),
                    MCS_FEED_NAME,
                    SEGMENT_SUFFIX,
                    json_parser::<McsClaimChange>(),
                )?;
                Feeds {
                    fiss: Arc::new(fiss),
                    mcs: Arc::new(mcs),
                    cache: Some(cache),
                }
            },
        };

        Ok(feeds)
    }

    pub fn service(&self, feeds: &Feeds) -> RdaService {
        RdaService::new(SERVICE_VERSION, feeds.fiss.clone(), feeds.mcs.clone())
            .with_stream_capacity(self.stream_capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceKind::Random,
            random: RandomConfig {
                seed: DEFAULT_RANDOM_SEED,
                max_to_send: DEFAULT_RANDOM_MAX_TO_SEND,
                force_optional_fields: false,
                error_rate: 0,
                max_unique_claim_ids: 0,
                max_unique_mbis: 0,
            },
            files: FileConfig {
                fiss_file: PathBuf::from(DEFAULT_FISS_FILE),
                mcs_file: PathBuf::from(DEFAULT_MCS_FILE),
            },
            s3: S3SourceConfig {
                storage: StorageConfig::from_env(),
                directory: DEFAULT_S3_DIRECTORY.to_string(),
                cache_dir: std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME),
                delete_cache_on_exit: false,
            },
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::random::ClaimGenerator;

    #[test]
    fn test_source_kind_parsing() {
        assert_eq!("random".parse::<SourceKind>().unwrap(), SourceKind::Random);
        assert_eq!(" S3 ".parse::<SourceKind>().unwrap(), SourceKind::S3);
        assert_eq!("File".parse::<SourceKind>().unwrap(), SourceKind::File);
        assert!("kafka".parse::<SourceKind>().is_err());
        assert_eq!(SourceKind::S3.to_string(), "s3");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.random.seed, DEFAULT_RANDOM_SEED);
        assert_eq!(config.stream_capacity, DEFAULT_STREAM_CAPACITY);
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = Config {
            stream_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_file_paths() {
        let mut config = Config {
            source: SourceKind::File,
            ..Config::default()
        };
        config.files.mcs_file = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_feeds_use_distinct_seeds() {
        let config = Config::default();
        let fiss = config.generator_config(FISS_SEED_OFFSET).unwrap();
        let mcs = config.generator_config(MCS_SEED_OFFSET).unwrap();
        assert_eq!(fiss.seed, DEFAULT_RANDOM_SEED + FISS_SEED_OFFSET);
        assert_eq!(mcs.seed, DEFAULT_RANDOM_SEED + MCS_SEED_OFFSET);

        let a = FissClaimGenerator::new(fiss.clone()).generate(0);
        let b = FissClaimGenerator::new(fiss).generate(0);
        assert_eq!(a.rda_claim_key, b.rda_claim_key);
    }

    #[tokio::test]
    async fn test_random_feeds_build_service() {
        let config = Config {
            random: RandomConfig {
                max_to_send: 3,
                ..Config::default().random
            },
            ..Config::default()
        };
        let feeds = config.feeds().await.unwrap();
        assert!(feeds.cache.is_none());

        let service = config.service(&feeds);
        assert_eq!(service.version(), SERVICE_VERSION);
        let records = service.get_mcs_claims(0).await.unwrap().collect().await.unwrap();
        assert_eq!(records.len(), 3);
    }
}
