use rda_common::{RdaError, Result};
use tokio::time::Instant;
use tracing::{debug, info};

use super::sink::RdaSink;
use crate::source::{RecordSource, Sequenced};

/// Limits on one pass of [`retrieve_and_process_objects`].
#[derive(Debug, Clone, Copy)]
pub struct BatchBounds {
    pub max_records: usize,
    pub batch_size: usize,
    /// Checked once per pulled record.
    pub deadline: Instant,
}

impl BatchBounds {
    pub fn new(max_records: usize, batch_size: usize, deadline: Instant) -> Self {
        Self {
            max_records,
            batch_size: batch_size.max(1),
            deadline,
        }
    }
}

/// Pulls records from `source` and hands them to `sink` in batches until the
/// source runs dry or a bound is reached. Returns the number of records the
/// sink accepted.
///
/// Any failure is returned as [`RdaError::Processing`] carrying the count
/// accepted before it. Records already pulled when the source fails are
/// written first; if that write fails too, the source error stays primary
/// and the write error is attached as suppressed.
pub async fn retrieve_and_process_objects<T, S, K>(
    source: &mut S,
    sink: &mut K,
    bounds: BatchBounds,
) -> Result<usize>
where
    T: Sequenced + Send + 'static,
    S: RecordSource<T> + ?Sized,
    K: RdaSink<T> + ?Sized,
{
    let mut processed = 0usize;
    let mut pulled = 0usize;
    let mut batch = Vec::with_capacity(bounds.batch_size);

    let pull_result = loop {
        if pulled >= bounds.max_records {
            debug!(pulled, "Reached record limit");
            break Ok(());
        }
        if Instant::now() >= bounds.deadline {
            info!(pulled, "Reached run time limit");
            break Ok(());
        }
        match source.has_more().await {
            Ok(true) => {},
            Ok(false) => break Ok(()),
            Err(error) => break Err(error),
        }
        match source.next().await {
            Ok(record) => batch.push(record),
            Err(error) => break Err(error),
        }
        pulled += 1;

        if batch.len() >= bounds.batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(bounds.batch_size));
            processed += write(sink, full, processed).await?;
        }
    };

    let flush_result = if batch.is_empty() {
        Ok(0)
    } else {
        sink.write_batch(batch).await
    };

    match (pull_result, flush_result) {
        (Ok(()), Ok(count)) => Ok(processed + count),
        (Ok(()), Err(error)) => Err(RdaError::processing(processed, error)),
        (Err(error), Ok(count)) => Err(RdaError::processing(processed + count, error)),
        (Err(error), Err(flush_error)) => Err(RdaError::processing(
            processed,
            error.with_suppressed(flush_error),
        )),
    }
}

async fn write<T, K>(sink: &mut K, batch: Vec<T>, processed: usize) -> Result<usize>
where
    T: Send + 'static,
    K: RdaSink<T> + ?Sized,
{
    sink.write_batch(batch)
        .await
        .map_err(|error| RdaError::processing(processed, error))
}
