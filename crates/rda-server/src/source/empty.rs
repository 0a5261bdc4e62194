use async_trait::async_trait;
use rda_common::Result;
use std::marker::PhantomData;

use super::{exhausted, RecordSource, Sequenced};

/// A source with no records, used for feeds that are not configured.
pub struct EmptySource<T> {
    _record: PhantomData<fn() -> T>,
}

impl<T> EmptySource<T> {
    pub fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<T> Default for EmptySource<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> RecordSource<T> for EmptySource<T>
where
    T: Sequenced + Send + 'static,
{
    async fn has_more(&mut self) -> Result<bool> {
        Ok(false)
    }

    async fn next(&mut self) -> Result<T> {
        exhausted()
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        Ok(None)
    }

    async fn skip_to(&mut self, _position: i64) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
