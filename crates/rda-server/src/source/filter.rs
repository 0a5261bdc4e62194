use async_trait::async_trait;
use rda_common::Result;
use std::marker::PhantomData;

use super::{exhausted, RecordSource, Sequenced};

/// Yields only the records of `inner` accepted by the predicate.
///
/// At most one accepted record is buffered ahead so that `has_more` can be
/// answered truthfully any number of times.
pub struct FilterSource<S, T, P> {
    inner: S,
    predicate: P,
    buffered: Option<T>,
    _record: PhantomData<fn() -> T>,
}

impl<S, T, P> FilterSource<S, T, P>
where
    T: Sequenced + Send + 'static,
    S: RecordSource<T>,
    P: FnMut(&T) -> bool + Send,
{
    pub fn new(inner: S, predicate: P) -> Self {
        Self {
            inner,
            predicate,
            buffered: None,
            _record: PhantomData,
        }
    }

    async fn fill(&mut self) -> Result<()> {
        while self.buffered.is_none() && self.inner.has_more().await? {
            let record = self.inner.next().await?;
            if (self.predicate)(&record) {
                self.buffered = Some(record);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S, T, P> RecordSource<T> for FilterSource<S, T, P>
where
    T: Sequenced + Send + 'static,
    S: RecordSource<T>,
    P: FnMut(&T) -> bool + Send,
{
    async fn has_more(&mut self) -> Result<bool> {
        self.fill().await?;
        Ok(self.buffered.is_some())
    }

    async fn next(&mut self) -> Result<T> {
        self.fill().await?;
        match self.buffered.take() {
            Some(record) => Ok(record),
            None => exhausted(),
        }
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        self.fill().await?;
        Ok(self.buffered.as_ref().map(Sequenced::sequence_number))
    }

    async fn skip_to(&mut self, position: i64) -> Result<()> {
        if let Some(record) = &self.buffered {
            if record.sequence_number() >= position {
                return Ok(());
            }
            self.buffered = None;
        }
        self.inner.skip_to(position).await
    }

    async fn close(&mut self) -> Result<()> {
        self.buffered = None;
        self.inner.close().await
    }
}
