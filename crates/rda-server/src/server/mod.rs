//! Streaming service for the FISS and MCS change feeds

use rda_common::Result;
use std::sync::Arc;
use tracing::info;

pub mod channel;
pub mod factory;
pub mod responder;

pub use channel::{start_stream, ChangeStream, ChannelCallStream};
pub use factory::{EmptySourceFactory, JsonFileSourceFactory, RandomSourceFactory, SourceFactory};
pub use responder::{CallStream, ResponderState, StreamResponder};

use crate::model::{FissClaimChange, McsClaimChange};
use crate::source::Sequenced;

/// Default number of records buffered per call.
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Serves change streams for both claim feeds.
pub struct RdaService {
    version: String,
    fiss: Arc<dyn SourceFactory<FissClaimChange>>,
    mcs: Arc<dyn SourceFactory<McsClaimChange>>,
    stream_capacity: usize,
}

impl RdaService {
    pub fn new(
        version: impl Into<String>,
        fiss: Arc<dyn SourceFactory<FissClaimChange>>,
        mcs: Arc<dyn SourceFactory<McsClaimChange>>,
    ) -> Self {
        Self {
            version: version.into(),
            fiss,
            mcs,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// FISS changes with sequence number `>= since`.
    pub async fn get_fiss_claims(&self, since: i64) -> Result<ChangeStream<FissClaimChange>> {
        info!(since, "Starting FISS claim stream");
        self.open(self.fiss.as_ref(), since).await
    }

    /// MCS changes with sequence number `>= since`.
    pub async fn get_mcs_claims(&self, since: i64) -> Result<ChangeStream<McsClaimChange>> {
        info!(since, "Starting MCS claim stream");
        self.open(self.mcs.as_ref(), since).await
    }

    async fn open<T>(&self, factory: &dyn SourceFactory<T>, since: i64) -> Result<ChangeStream<T>>
    where
        T: Sequenced + Send + 'static,
    {
        let source = factory.create(since).await?;
        Ok(start_stream(source, self.stream_capacity))
    }
}
