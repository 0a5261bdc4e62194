//! Bounded load job
//!
//! One invocation opens a fresh source and sink, moves records between them
//! in batches under record-count and run-time limits, and always closes both
//! before reporting an outcome.

use rda_common::RdaError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

pub mod batch;
pub mod sink;

pub use batch::{retrieve_and_process_objects, BatchBounds};
pub use sink::{BoxRdaSink, NdjsonFileSink, NdjsonFileSinkFactory, RdaSink, SinkFactory};

use crate::server::SourceFactory;
use crate::source::{RecordSource, Sequenced};

pub const DEFAULT_MAX_RECORDS: usize = usize::MAX;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_RUNTIME: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    NothingToDo,
    WorkDone,
}

/// Result of one job invocation. A failure still reports the records
/// processed before it.
#[derive(Debug)]
pub struct ProcessingOutcome {
    pub outcome: JobOutcome,
    pub processed_count: usize,
    pub error: Option<RdaError>,
}

impl ProcessingOutcome {
    fn new(processed_count: usize, error: Option<RdaError>) -> Self {
        let outcome = if processed_count == 0 && error.is_none() {
            JobOutcome::NothingToDo
        } else {
            JobOutcome::WorkDone
        };
        Self {
            outcome,
            processed_count,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JobSettings {
    pub starting_sequence_number: i64,
    pub max_records: usize,
    pub batch_size: usize,
    pub max_runtime: Duration,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            starting_sequence_number: 0,
            max_records: DEFAULT_MAX_RECORDS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_runtime: DEFAULT_MAX_RUNTIME,
        }
    }
}

/// Drains one feed into a sink under [`JobSettings`] limits.
pub struct BoundedLoadJob<T> {
    sources: Arc<dyn SourceFactory<T>>,
    sinks: Arc<dyn SinkFactory<T>>,
    settings: JobSettings,
}

impl<T> BoundedLoadJob<T>
where
    T: Sequenced + Send + 'static,
{
    pub fn new(
        sources: Arc<dyn SourceFactory<T>>,
        sinks: Arc<dyn SinkFactory<T>>,
        settings: JobSettings,
    ) -> Self {
        Self {
            sources,
            sinks,
            settings,
        }
    }

    pub async fn call(&self) -> ProcessingOutcome {
        let started = Instant::now();
        let deadline = started
            .checked_add(self.settings.max_runtime)
            .unwrap_or_else(|| started + Duration::from_secs(86_400 * 365));

        let mut source = match self.sources.create(self.settings.starting_sequence_number).await {
            Ok(source) => source,
            Err(e) => {
                error!(error = %e, "Failed to open source");
                return ProcessingOutcome::new(0, Some(e));
            },
        };
        let mut sink = match self.sinks.create().await {
            Ok(sink) => sink,
            Err(e) => {
                error!(error = %e, "Failed to open sink");
                let e = match source.close().await {
                    Ok(()) => e,
                    Err(close_error) => e.with_suppressed(close_error),
                };
                return ProcessingOutcome::new(0, Some(e));
            },
        };

        let bounds = BatchBounds::new(self.settings.max_records, self.settings.batch_size, deadline);
        let (processed, mut failure) =
            match retrieve_and_process_objects(source.as_mut(), sink.as_mut(), bounds).await {
                Ok(processed) => (processed, None),
                Err(e) => {
                    let (processed, cause) = e.into_processing_parts();
                    (processed, Some(cause))
                },
            };

        for close_result in [sink.close().await, source.close().await] {
            if let Err(close_error) = close_result {
                warn!(error = %close_error, "Failed to close job resource");
                failure = Some(match failure {
                    Some(primary) => primary.with_suppressed(close_error),
                    None => close_error,
                });
            }
        }

        let outcome = ProcessingOutcome::new(processed, failure);
        match &outcome.error {
            None => info!(
                processed,
                elapsed_secs = started.elapsed().as_secs_f64(),
                outcome = ?outcome.outcome,
                "Load job finished"
            ),
            Some(e) => error!(processed, error = %e, "Load job failed"),
        }
        outcome
    }
}
