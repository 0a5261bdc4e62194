//! Per-call record source construction

use async_trait::async_trait;
use rda_common::Result;
use std::marker::PhantomData;
use std::path::PathBuf;

use crate::catalog::SegmentCatalog;
use crate::model::ClaimChange;
use crate::random::{ClaimGenerator, RandomClaimSource};
use crate::source::{
    BoxRecordSource, EmptySource, JsonSource, LineParser, RecordSource, RecordSourceExt, Sequenced,
};

/// Builds a fresh source positioned at `since` for each call or job run.
#[async_trait]
pub trait SourceFactory<T>: Send + Sync
where
    T: Sequenced + Send + 'static,
{
    async fn create(&self, since: i64) -> Result<BoxRecordSource<T>>;
}

/// Every call sees an empty feed.
pub struct EmptySourceFactory<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> EmptySourceFactory<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for EmptySourceFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> SourceFactory<T> for EmptySourceFactory<T>
where
    T: Sequenced + Send + 'static,
{
    async fn create(&self, _since: i64) -> Result<BoxRecordSource<T>> {
        Ok(EmptySource::new().boxed())
    }
}

/// Serves generated claims; every call replays the same deterministic feed.
pub struct RandomSourceFactory<G> {
    generator: G,
    max_to_send: u64,
}

impl<G> RandomSourceFactory<G> {
    pub fn new(generator: G, max_to_send: u64) -> Self {
        Self {
            generator,
            max_to_send,
        }
    }
}

#[async_trait]
impl<G> SourceFactory<ClaimChange<G::Claim>> for RandomSourceFactory<G>
where
    G: ClaimGenerator + Clone + 'static,
{
    async fn create(&self, since: i64) -> Result<BoxRecordSource<ClaimChange<G::Claim>>> {
        let mut source = RandomClaimSource::new(self.generator.clone(), self.max_to_send);
        source.skip_to(since).await?;
        Ok(source.boxed())
    }
}

/// Re-reads a local NDJSON file for each call.
pub struct JsonFileSourceFactory<T> {
    path: PathBuf,
    parser: LineParser<T>,
}

impl<T> JsonFileSourceFactory<T> {
    pub fn new(path: impl Into<PathBuf>, parser: LineParser<T>) -> Self {
        Self {
            path: path.into(),
            parser,
        }
    }
}

#[async_trait]
impl<T> SourceFactory<T> for JsonFileSourceFactory<T>
where
    T: Sequenced + Send + 'static,
{
    async fn create(&self, since: i64) -> Result<BoxRecordSource<T>> {
        let source = JsonSource::open_file(&self.path, self.parser.clone())?;
        Ok(source.starting_at(since))
    }
}

#[async_trait]
impl<T> SourceFactory<T> for SegmentCatalog<T>
where
    T: Sequenced + Send + 'static,
{
    async fn create(&self, since: i64) -> Result<BoxRecordSource<T>> {
        self.create_source(since).await
    }
}
