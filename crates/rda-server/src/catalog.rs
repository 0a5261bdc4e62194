//! Segment files stored in object storage
//!
//! Producers archive the feed as immutable segment files named
//! `<prefix>[-<min>-<max>].<suffix>[.gz]`, where the optional range gives the
//! sequence numbers the file covers. A file without a range is a catch-all
//! covering everything from [`MIN_SEQUENCE_NUM`] on.
//!
//! [`SegmentCatalog::create_source`] rediscovers the segments on every call
//! and returns one source spanning all segments that may hold records at or
//! after the requested position. Segments are read in ascending declared range
//! order; records are not reordered, so overlapping or unsorted producer files
//! yield records in file order.

use async_trait::async_trait;
use rda_common::{RdaError, Result};
use regex::Regex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::cache::DirectoryCache;
use crate::model::MIN_SEQUENCE_NUM;
use crate::source::{
    exhausted, BoxRecordSource, JsonSource, LineParser, RecordSource, RecordSourceExt, Sequenced,
};

/// One segment file and the sequence range it claims to cover.
///
/// Ordered by `(min, max, key)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentDescriptor {
    pub min_sequence_number: i64,
    pub max_sequence_number: i64,
    pub object_key: String,
}

impl SegmentDescriptor {
    pub fn may_contain_from(&self, position: i64) -> bool {
        self.max_sequence_number >= position
    }
}

/// Key for a segment covering `[min, max]`.
pub fn segment_key(prefix: &str, suffix: &str, min: i64, max: i64) -> String {
    format!("{prefix}-{min}-{max}.{suffix}")
}

/// Key for a catch-all segment.
pub fn catch_all_key(prefix: &str, suffix: &str) -> String {
    format!("{prefix}.{suffix}")
}

/// Recognizes the segment keys of one feed.
#[derive(Debug, Clone)]
pub struct SegmentPattern {
    regex: Regex,
}

impl SegmentPattern {
    pub fn new(directory: &str, prefix: &str, suffix: &str) -> Result<Self> {
        let pattern = format!(
            r"(?i)^{}{}(-(\d+)-(\d+))?\.{}(\.gz)?$",
            regex::escape(directory),
            regex::escape(prefix),
            regex::escape(suffix)
        );
        let regex = Regex::new(&pattern)
            .map_err(|e| RdaError::Config(format!("Invalid segment pattern: {e}")))?;
        Ok(Self { regex })
    }

    /// Parses `key`, returning `None` when it is not a segment of this feed.
    pub fn parse(&self, key: &str) -> Option<SegmentDescriptor> {
        let captures = self.regex.captures(key)?;

        let (min, max) = match (captures.get(2), captures.get(3)) {
            (Some(min), Some(max)) => match (min.as_str().parse(), max.as_str().parse()) {
                (Ok(min), Ok(max)) => (min, max),
                _ => {
                    warn!(key, "Ignoring segment with out of range sequence numbers");
                    return None;
                },
            },
            _ => (MIN_SEQUENCE_NUM, i64::MAX),
        };

        Some(SegmentDescriptor {
            min_sequence_number: min,
            max_sequence_number: max,
            object_key: key.to_string(),
        })
    }
}

/// Opens the records of one segment.
#[async_trait]
pub trait SegmentOpener<T>: Send + Sync
where
    T: Sequenced + Send + 'static,
{
    async fn open(&self, segment: &SegmentDescriptor) -> Result<BoxRecordSource<T>>;
}

/// Downloads segments through the cache and reads them as NDJSON.
pub struct JsonSegmentOpener<T> {
    cache: Arc<DirectoryCache>,
    parser: LineParser<T>,
}

impl<T> JsonSegmentOpener<T> {
    pub fn new(cache: Arc<DirectoryCache>, parser: LineParser<T>) -> Self {
        Self { cache, parser }
    }
}

#[async_trait]
impl<T> SegmentOpener<T> for JsonSegmentOpener<T>
where
    T: Sequenced + Send + 'static,
{
    async fn open(&self, segment: &SegmentDescriptor) -> Result<BoxRecordSource<T>> {
        let name = segment
            .object_key
            .strip_prefix(self.cache.directory())
            .unwrap_or(&segment.object_key);
        let file = self.cache.download_file(name).await?;
        Ok(JsonSource::open_cached(&file, self.parser.clone())?.boxed())
    }
}

/// Discovers the segments of one feed and builds sources over them.
pub struct SegmentCatalog<T> {
    cache: Arc<DirectoryCache>,
    pattern: SegmentPattern,
    opener: Arc<dyn SegmentOpener<T>>,
}

impl<T> SegmentCatalog<T>
where
    T: Sequenced + Send + 'static,
{
    pub fn new(
        cache: Arc<DirectoryCache>,
        prefix: &str,
        suffix: &str,
        opener: Arc<dyn SegmentOpener<T>>,
    ) -> Result<Self> {
        let pattern = SegmentPattern::new(cache.directory(), prefix, suffix)?;
        Ok(Self {
            cache,
            pattern,
            opener,
        })
    }

    /// Catalog whose segments are NDJSON files parsed with `parser`.
    pub fn json(
        cache: Arc<DirectoryCache>,
        prefix: &str,
        suffix: &str,
        parser: LineParser<T>,
    ) -> Result<Self> {
        let opener = Arc::new(JsonSegmentOpener::new(cache.clone(), parser));
        Self::new(cache, prefix, suffix, opener)
    }

    /// Segments that may hold records at or after `start`, sorted.
    pub async fn segments_from(&self, start: i64) -> Result<Vec<SegmentDescriptor>> {
        let mut segments: Vec<SegmentDescriptor> = self
            .cache
            .list_object_keys()
            .await?
            .iter()
            .filter_map(|key| self.pattern.parse(key))
            .filter(|segment| segment.may_contain_from(start))
            .collect();
        segments.sort();
        Ok(segments)
    }

    /// A source yielding every record with sequence number `>= start`.
    #[instrument(skip(self))]
    pub async fn create_source(&self, start: i64) -> Result<BoxRecordSource<T>> {
        let segments = self.segments_from(start).await?;
        info!(
            segments = segments.len(),
            bucket = %self.cache.bucket(),
            directory = %self.cache.directory(),
            "Selected segments"
        );
        Ok(SegmentedSource::new(segments, self.opener.clone()).starting_at(start))
    }

    /// True when the store is reachable and holds at least one record.
    pub async fn check_connectivity(&self) -> Result<bool> {
        let mut source = self.create_source(MIN_SEQUENCE_NUM).await?;
        let result = source.has_more().await;
        rda_common::error::merge_close_result(result, source.close().await)
    }
}

/// Reads a list of segments one after another with at most one open.
pub struct SegmentedSource<T> {
    remaining: VecDeque<SegmentDescriptor>,
    current: Option<BoxRecordSource<T>>,
    opener: Arc<dyn SegmentOpener<T>>,
}

impl<T> SegmentedSource<T>
where
    T: Sequenced + Send + 'static,
{
    pub fn new(segments: Vec<SegmentDescriptor>, opener: Arc<dyn SegmentOpener<T>>) -> Self {
        Self {
            remaining: segments.into(),
            current: None,
            opener,
        }
    }

    async fn close_current(&mut self) -> Result<()> {
        match self.current.take() {
            Some(mut current) => current.close().await,
            None => Ok(()),
        }
    }

    /// Opens the next segment; false when none remain.
    async fn open_next(&mut self) -> Result<bool> {
        let Some(segment) = self.remaining.pop_front() else {
            return Ok(false);
        };
        debug!(key = %segment.object_key, "Opening segment");
        self.current = Some(self.opener.open(&segment).await?);
        Ok(true)
    }

    /// Leaves `current` positioned on a segment with records, if any remain.
    async fn advance(&mut self) -> Result<bool> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if current.has_more().await? {
                    return Ok(true);
                }
                self.close_current().await?;
            }
            if !self.open_next().await? {
                return Ok(false);
            }
        }
    }
}

#[async_trait]
impl<T> RecordSource<T> for SegmentedSource<T>
where
    T: Sequenced + Send + 'static,
{
    async fn has_more(&mut self) -> Result<bool> {
        self.advance().await
    }

    async fn next(&mut self) -> Result<T> {
        if !self.advance().await? {
            return exhausted();
        }
        match self.current.as_mut() {
            Some(current) => current.next().await,
            None => exhausted(),
        }
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        if !self.advance().await? {
            return Ok(None);
        }
        match self.current.as_mut() {
            Some(current) => current.peek_sequence_number().await,
            None => Ok(None),
        }
    }

    async fn skip_to(&mut self, position: i64) -> Result<()> {
        self.remaining
            .retain(|segment| segment.may_contain_from(position));

        loop {
            if let Some(current) = self.current.as_mut() {
                current.skip_to(position).await?;
                if current.has_more().await? {
                    return Ok(());
                }
                self.close_current().await?;
            }
            if !self.open_next().await? {
                return Ok(());
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.remaining.clear();
        self.close_current().await
    }
}
