//! Streaming service integration tests
//!
//! Drives `RdaService` end to end over the in-process call transport:
//! - resuming a feed from the last received sequence number
//! - client cancellation and dropped calls releasing the source
//! - source failures reaching the client after earlier records

mod common;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rda_server::model::{FissClaimChange, McsClaimChange};
use rda_server::random::{Clock, GeneratorConfig, McsClaimGenerator};
use rda_server::server::{
    EmptySourceFactory, JsonFileSourceFactory, RandomSourceFactory, RdaService, SourceFactory,
};
use rda_server::source::{json_parser, BoxRecordSource, RecordSource, RecordSourceExt};
use rda_server::Result;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn mcs_generator() -> McsClaimGenerator {
    let clock = Clock::Fixed(Utc.with_ymd_and_hms(2024, 6, 30, 8, 0, 0).unwrap());
    McsClaimGenerator::new(GeneratorConfig::builder().seed(99).clock(clock).build().unwrap())
}

fn mcs_service(max_to_send: u64) -> RdaService {
    RdaService::new(
        "test",
        Arc::new(EmptySourceFactory::new()),
        Arc::new(RandomSourceFactory::new(mcs_generator(), max_to_send)),
    )
    .with_stream_capacity(4)
}

#[tokio::test]
async fn test_resume_after_cancel_continues_feed() {
    let service = mcs_service(20);
    let full = service.get_mcs_claims(0).await.unwrap().collect().await.unwrap();
    assert_eq!(full.len(), 20);

    let mut stream = service.get_mcs_claims(0).await.unwrap();
    let mut last_seen = -1;
    while last_seen < 9 {
        last_seen = stream.next().await.unwrap().unwrap().seq;
    }
    stream.cancel();

    let resumed = service
        .get_mcs_claims(last_seen + 1)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(resumed, full[10..].to_vec());
}

#[tokio::test]
async fn test_since_beyond_end_is_empty() {
    let service = mcs_service(5);
    let records = service.get_mcs_claims(50).await.unwrap().collect().await.unwrap();
    assert!(records.is_empty());
}

/// Wraps another factory and counts closes of the sources it hands out.
struct CloseTracking<F> {
    inner: F,
    closes: Arc<AtomicUsize>,
}

struct TrackedSource<T> {
    inner: BoxRecordSource<T>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl<T> RecordSource<T> for TrackedSource<T>
where
    T: rda_server::source::Sequenced + Send + 'static,
{
    async fn has_more(&mut self) -> Result<bool> {
        self.inner.has_more().await
    }

    async fn next(&mut self) -> Result<T> {
        self.inner.next().await
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        self.inner.peek_sequence_number().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

#[async_trait]
impl<F> SourceFactory<McsClaimChange> for CloseTracking<F>
where
    F: SourceFactory<McsClaimChange>,
{
    async fn create(&self, since: i64) -> Result<BoxRecordSource<McsClaimChange>> {
        Ok(TrackedSource {
            inner: self.inner.create(since).await?,
            closes: self.closes.clone(),
        }
        .boxed())
    }
}

fn tracked_service(closes: Arc<AtomicUsize>) -> RdaService {
    RdaService::new(
        "test",
        Arc::new(EmptySourceFactory::new()),
        Arc::new(CloseTracking {
            inner: RandomSourceFactory::new(mcs_generator(), 1_000_000),
            closes,
        }),
    )
    .with_stream_capacity(4)
}

async fn wait_for_close(closes: &AtomicUsize) {
    for _ in 0..200 {
        if closes.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_stops_stream_and_closes_source() {
    let closes = Arc::new(AtomicUsize::new(0));
    let service = tracked_service(closes.clone());

    let mut stream = service.get_mcs_claims(0).await.unwrap();
    for expected in 0..5 {
        assert_eq!(stream.next().await.unwrap().unwrap().seq, expected);
    }
    stream.cancel();

    let mut buffered = 0;
    while let Some(item) = stream.next().await {
        item.unwrap();
        buffered += 1;
    }
    assert!(buffered <= 4);
    wait_for_close(&closes).await;
}

#[tokio::test]
async fn test_dropped_stream_closes_source() {
    let closes = Arc::new(AtomicUsize::new(0));
    let service = tracked_service(closes.clone());

    let mut stream = service.get_mcs_claims(0).await.unwrap();
    stream.next().await.unwrap().unwrap();
    drop(stream);

    wait_for_close(&closes).await;
}

#[tokio::test]
async fn test_file_feed_failure_reaches_client_after_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fiss.ndjson");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(common::ndjson(0..4).as_bytes()).unwrap();
    file.write_all(b"{\"truncated\": \n").unwrap();
    file.write_all(common::ndjson(5..7).as_bytes()).unwrap();
    drop(file);

    let service = RdaService::new(
        "test",
        Arc::new(JsonFileSourceFactory::new(&path, json_parser::<FissClaimChange>())),
        Arc::new(EmptySourceFactory::new()),
    );

    let mut stream = service.get_fiss_claims(1).await.unwrap();
    let mut received = Vec::new();
    let failed = loop {
        match stream.next().await {
            Some(Ok(change)) => received.push(change.seq),
            Some(Err(_)) => break true,
            None => break false,
        }
    };
    assert!(failed);
    assert_eq!(received, vec![1, 2, 3]);
    assert!(stream.next().await.is_none());
}
