//! Pull-style record sources
//!
//! A [`RecordSource`] yields records in producer order and can be positioned
//! by sequence number. Everything that feeds the streaming service or the
//! bounded load job (random generators, NDJSON files, object-storage
//! segments) implements this trait, and decorators such as [`FilterSource`]
//! wrap any other source.
//!
//! Sources follow single-caller semantics: every operation takes `&mut self`.

use async_trait::async_trait;
use rda_common::{RdaError, Result};

pub mod empty;
pub mod exception;
pub mod filter;
pub mod json;

pub use empty::EmptySource;
pub use exception::ExceptionSource;
pub use filter::FilterSource;
pub use json::{json_parser, JsonSource, LineParser};

/// Records that carry a producer-assigned position in the feed.
pub trait Sequenced {
    fn sequence_number(&self) -> i64;
}

#[async_trait]
pub trait RecordSource<T>: Send
where
    T: Sequenced + Send + 'static,
{
    /// True when a following call to [`next`](Self::next) will not fail with
    /// [`RdaError::Exhausted`]. Repeated calls without `next` are idempotent.
    async fn has_more(&mut self) -> Result<bool>;

    /// Returns the next record, or [`RdaError::Exhausted`] past the end.
    async fn next(&mut self) -> Result<T>;

    /// Sequence number of the record `next` would return, without consuming it.
    async fn peek_sequence_number(&mut self) -> Result<Option<i64>>;

    /// Discards leading records whose sequence number is below `position`.
    async fn skip_to(&mut self, position: i64) -> Result<()> {
        while let Some(sequence_number) = self.peek_sequence_number().await? {
            if sequence_number >= position {
                break;
            }
            self.next().await?;
        }
        Ok(())
    }

    /// Releases any open stream. Safe to call when nothing was read.
    async fn close(&mut self) -> Result<()>;
}

pub type BoxRecordSource<T> = Box<dyn RecordSource<T>>;

#[async_trait]
impl<T> RecordSource<T> for BoxRecordSource<T>
where
    T: Sequenced + Send + 'static,
{
    async fn has_more(&mut self) -> Result<bool> {
        (**self).has_more().await
    }

    async fn next(&mut self) -> Result<T> {
        (**self).next().await
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        (**self).peek_sequence_number().await
    }

    async fn skip_to(&mut self, position: i64) -> Result<()> {
        (**self).skip_to(position).await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

/// Combinators available on every sized source.
pub trait RecordSourceExt<T>: RecordSource<T> + Sized + 'static
where
    T: Sequenced + Send + 'static,
{
    /// Only yields records for which `predicate` returns true.
    fn filter<P>(self, predicate: P) -> FilterSource<Self, T, P>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        FilterSource::new(self, predicate)
    }

    /// Only yields records at or after `position`.
    fn starting_at(self, position: i64) -> BoxRecordSource<T> {
        self.filter(move |record: &T| record.sequence_number() >= position)
            .boxed()
    }

    fn boxed(self) -> BoxRecordSource<T> {
        Box::new(self)
    }
}

impl<T, S> RecordSourceExt<T> for S
where
    T: Sequenced + Send + 'static,
    S: RecordSource<T> + 'static,
{
}

/// Pulls every remaining record from `source` into a vector.
pub async fn drain<T, S>(source: &mut S) -> Result<Vec<T>>
where
    T: Sequenced + Send + 'static,
    S: RecordSource<T> + ?Sized,
{
    let mut records = Vec::new();
    while source.has_more().await? {
        records.push(source.next().await?);
    }
    Ok(records)
}

pub(crate) fn exhausted<T>() -> Result<T> {
    Err(RdaError::Exhausted)
}
