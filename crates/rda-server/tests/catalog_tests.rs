//! Object-storage segment catalog integration tests
//!
//! These tests run the catalog, cache and NDJSON sources together against the
//! in-memory object store:
//! - segment selection and ordering by starting position
//! - at most one segment open at a time
//! - one download per object version
//! - draining a catalog through a bounded load job

mod common;

use async_trait::async_trait;
use common::{sequence_numbers, Fixture, BUCKET, DIRECTORY, FEED, SUFFIX};
use rda_server::catalog::{catch_all_key, JsonSegmentOpener, SegmentCatalog, SegmentDescriptor, SegmentOpener};
use rda_server::job::{BoundedLoadJob, BoxRdaSink, JobOutcome, JobSettings, RdaSink, SinkFactory};
use rda_server::model::FissClaimChange;
use rda_server::server::SourceFactory;
use rda_server::source::{drain, json_parser, BoxRecordSource, RecordSource, RecordSourceExt};
use rda_server::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tracks how many segments are open at once.
#[derive(Default)]
struct OpenCounter {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
}

struct CountingOpener {
    inner: JsonSegmentOpener<FissClaimChange>,
    counter: Arc<OpenCounter>,
}

#[async_trait]
impl SegmentOpener<FissClaimChange> for CountingOpener {
    async fn open(&self, segment: &SegmentDescriptor) -> Result<BoxRecordSource<FissClaimChange>> {
        let inner = self.inner.open(segment).await?;
        let open = self.counter.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counter.peak.fetch_max(open, Ordering::SeqCst);
        self.counter.opened.fetch_add(1, Ordering::SeqCst);
        Ok(CountedSource {
            inner,
            counter: self.counter.clone(),
            closed: false,
        }
        .boxed())
    }
}

struct CountedSource {
    inner: BoxRecordSource<FissClaimChange>,
    counter: Arc<OpenCounter>,
    closed: bool,
}

#[async_trait]
impl RecordSource<FissClaimChange> for CountedSource {
    async fn has_more(&mut self) -> Result<bool> {
        self.inner.has_more().await
    }

    async fn next(&mut self) -> Result<FissClaimChange> {
        self.inner.next().await
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        self.inner.peek_sequence_number().await
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counter.open.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.close().await
    }
}

fn counting_catalog(fixture: &Fixture, counter: Arc<OpenCounter>) -> SegmentCatalog<FissClaimChange> {
    let opener = CountingOpener {
        inner: JsonSegmentOpener::new(fixture.cache.clone(), json_parser()),
        counter,
    };
    SegmentCatalog::new(fixture.cache.clone(), FEED, SUFFIX, Arc::new(opener)).unwrap()
}

async fn read_from(catalog: &SegmentCatalog<FissClaimChange>, start: i64) -> Vec<i64> {
    let mut source = catalog.create_source(start).await.unwrap();
    let records = drain(&mut source).await.unwrap();
    source.close().await.unwrap();
    sequence_numbers(&records)
}

#[tokio::test]
async fn test_reads_segments_in_order_from_start() {
    let fixture = Fixture::new();
    fixture.put_segment(0, 10, [0, 2, 4, 6, 8, 10]);
    fixture.put_segment(5, 15, 11..=15);
    fixture.put_segment(20, 30, [20, 25, 30]);
    let catalog = fixture.catalog();

    let segments = catalog.segments_from(8).await.unwrap();
    let ranges: Vec<(i64, i64)> = segments
        .iter()
        .map(|s| (s.min_sequence_number, s.max_sequence_number))
        .collect();
    assert_eq!(ranges, vec![(0, 10), (5, 15), (20, 30)]);

    assert_eq!(
        read_from(&catalog, 8).await,
        vec![8, 10, 11, 12, 13, 14, 15, 20, 25, 30]
    );
}

#[tokio::test]
async fn test_segments_ending_before_start_are_skipped() {
    let fixture = Fixture::new();
    fixture.put_segment(0, 10, 0..=10);
    fixture.put_segment(11, 20, 11..=20);
    let catalog = fixture.catalog();

    let segments = catalog.segments_from(15).await.unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(read_from(&catalog, 15).await, vec![15, 16, 17, 18, 19, 20]);
    assert_eq!(fixture.store.download_count(), 1);
}

#[tokio::test]
async fn test_catch_all_and_foreign_keys() {
    let fixture = Fixture::new();
    fixture.put_segment(0, 2, 0..=2);
    let catch_all = format!("{DIRECTORY}{}", catch_all_key(FEED, SUFFIX));
    fixture.store.put_object(BUCKET, &catch_all, common::ndjson(3..=4));
    fixture
        .store
        .put_object(BUCKET, &format!("{DIRECTORY}mcs-0-9.ndjson"), "not fiss");
    fixture
        .store
        .put_object(BUCKET, &format!("{DIRECTORY}fiss-0-9.csv"), "wrong suffix");
    fixture
        .store
        .put_object(BUCKET, "elsewhere/fiss-0-9.ndjson", "other directory");

    let catalog = fixture.catalog();
    assert_eq!(read_from(&catalog, 0).await, vec![0, 1, 2, 3, 4]);
    assert_eq!(read_from(&catalog, 1_000_000).await, Vec::<i64>::new());
    assert_eq!(catalog.segments_from(1_000_000).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_at_most_one_segment_open() {
    let fixture = Fixture::new();
    for start in (0..50).step_by(10) {
        fixture.put_segment(start, start + 9, start..start + 10);
    }
    let counter = Arc::new(OpenCounter::default());
    let catalog = counting_catalog(&fixture, counter.clone());

    let records = read_from(&catalog, 0).await;
    assert_eq!(records, (0..50).collect::<Vec<_>>());
    assert_eq!(counter.peak.load(Ordering::SeqCst), 1);
    assert_eq!(counter.opened.load(Ordering::SeqCst), 5);
    assert_eq!(counter.open.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_close_mid_segment_releases_it() {
    let fixture = Fixture::new();
    fixture.put_segment(0, 9, 0..10);
    fixture.put_segment(10, 19, 10..20);
    let counter = Arc::new(OpenCounter::default());
    let catalog = counting_catalog(&fixture, counter.clone());

    let mut source = catalog.create_source(0).await.unwrap();
    for expected in 0..3 {
        assert_eq!(source.next().await.unwrap().seq, expected);
    }
    assert_eq!(counter.open.load(Ordering::SeqCst), 1);
    source.close().await.unwrap();
    assert_eq!(counter.open.load(Ordering::SeqCst), 0);
    assert_eq!(counter.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_skip_to_across_segments() {
    let fixture = Fixture::new();
    fixture.put_segment(0, 9, 0..10);
    fixture.put_segment(10, 19, 10..20);
    fixture.put_segment(20, 29, 20..30);
    let counter = Arc::new(OpenCounter::default());
    let catalog = counting_catalog(&fixture, counter.clone());

    let mut source = catalog.create_source(0).await.unwrap();
    assert_eq!(source.next().await.unwrap().seq, 0);
    source.skip_to(25).await.unwrap();
    assert_eq!(source.peek_sequence_number().await.unwrap(), Some(25));
    let rest = drain(&mut source).await.unwrap();
    assert_eq!(sequence_numbers(&rest), vec![25, 26, 27, 28, 29]);
    source.close().await.unwrap();

    // The middle segment was never opened.
    assert_eq!(counter.opened.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_repeated_reads_download_each_version_once() {
    let fixture = Fixture::new();
    let key = fixture.put_segment(0, 4, 0..5);
    fixture.put_segment(5, 9, 5..10);
    let catalog = fixture.catalog();

    assert_eq!(read_from(&catalog, 0).await.len(), 10);
    assert_eq!(read_from(&catalog, 0).await.len(), 10);
    assert_eq!(fixture.store.download_count(), 2);

    // A new version of one object is fetched again and the old copy pruned.
    fixture.store.put_object(BUCKET, &key, common::ndjson([1, 3]));
    assert_eq!(read_from(&catalog, 0).await, vec![1, 3, 5, 6, 7, 8, 9]);
    assert_eq!(fixture.store.download_count(), 3);
    assert_eq!(fixture.cache.delete_obsolete_files().await.unwrap(), 1);
    assert_eq!(read_from(&catalog, 0).await.len(), 7);
    assert_eq!(fixture.store.download_count(), 3);
}

#[tokio::test]
async fn test_check_connectivity() {
    let fixture = Fixture::new();
    let catalog = fixture.catalog();
    assert!(!catalog.check_connectivity().await.unwrap());

    fixture.put_segment(0, 0, [0]);
    assert!(catalog.check_connectivity().await.unwrap());
}

#[derive(Default)]
struct RecordingSinks {
    batches: Arc<Mutex<Vec<Vec<i64>>>>,
}

struct RecordingSink {
    batches: Arc<Mutex<Vec<Vec<i64>>>>,
}

#[async_trait]
impl RdaSink<FissClaimChange> for RecordingSink {
    async fn write_batch(&mut self, batch: Vec<FissClaimChange>) -> Result<usize> {
        let count = batch.len();
        self.batches.lock().unwrap().push(sequence_numbers(&batch));
        Ok(count)
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SinkFactory<FissClaimChange> for RecordingSinks {
    async fn create(&self) -> Result<BoxRdaSink<FissClaimChange>> {
        Ok(Box::new(RecordingSink {
            batches: self.batches.clone(),
        }))
    }
}

#[tokio::test]
async fn test_load_job_drains_catalog_in_batches() {
    let fixture = Fixture::new();
    fixture.put_segment(0, 4, 0..5);
    fixture.put_segment(5, 9, 5..10);
    let sources: Arc<dyn SourceFactory<FissClaimChange>> = Arc::new(fixture.catalog());
    let sinks = Arc::new(RecordingSinks::default());

    let job = BoundedLoadJob::new(
        sources,
        sinks.clone(),
        JobSettings {
            batch_size: 3,
            ..JobSettings::default()
        },
    );
    let outcome = job.call().await;

    assert!(outcome.is_success());
    assert_eq!(outcome.outcome, JobOutcome::WorkDone);
    assert_eq!(outcome.processed_count, 10);
    let batches = sinks.batches.lock().unwrap();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    assert_eq!(batches.concat(), (0..10).collect::<Vec<_>>());
}
