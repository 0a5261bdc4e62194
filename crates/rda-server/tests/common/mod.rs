//! Shared fixtures for integration tests

#![allow(dead_code, clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use rda_server::cache::DirectoryCache;
use rda_server::catalog::{segment_key, SegmentCatalog};
use rda_server::model::{ClaimChange, FissClaimChange};
use rda_server::random::{ClaimGenerator, Clock, FissClaimGenerator, GeneratorConfig};
use rda_server::source::json_parser;
use rda_server::storage::InMemoryObjectStore;
use std::sync::Arc;
use tempfile::TempDir;

pub const BUCKET: &str = "rda-test";
pub const DIRECTORY: &str = "claims/";
pub const FEED: &str = "fiss";
pub const SUFFIX: &str = "ndjson";

/// In-memory bucket plus a cache over a scratch directory.
pub struct Fixture {
    pub store: Arc<InMemoryObjectStore>,
    pub cache: Arc<DirectoryCache>,
    pub cache_dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            DirectoryCache::new(store.clone(), BUCKET, DIRECTORY, cache_dir.path(), false).unwrap(),
        );
        Self {
            store,
            cache,
            cache_dir,
        }
    }

    /// Stores the FISS changes `seqs` as a segment claiming `[min, max]`.
    pub fn put_segment(&self, min: i64, max: i64, seqs: impl IntoIterator<Item = i64>) -> String {
        let key = format!("{DIRECTORY}{}", segment_key(FEED, SUFFIX, min, max));
        self.store.put_object(BUCKET, &key, ndjson(seqs));
        key
    }

    pub fn catalog(&self) -> SegmentCatalog<FissClaimChange> {
        SegmentCatalog::json(self.cache.clone(), FEED, SUFFIX, json_parser()).unwrap()
    }
}

pub fn generator() -> FissClaimGenerator {
    let clock = Clock::Fixed(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    FissClaimGenerator::new(GeneratorConfig::builder().seed(7).clock(clock).build().unwrap())
}

pub fn fiss_change(seq: i64) -> FissClaimChange {
    let generator = generator();
    let claim = generator.generate(seq as u64);
    ClaimChange::update(seq, generator.config().clock.now(), claim)
}

pub fn ndjson(seqs: impl IntoIterator<Item = i64>) -> String {
    seqs.into_iter()
        .map(|seq| serde_json::to_string(&fiss_change(seq)).unwrap() + "\n")
        .collect()
}

pub fn sequence_numbers(changes: &[FissClaimChange]) -> Vec<i64> {
    changes.iter().map(|change| change.seq).collect()
}
