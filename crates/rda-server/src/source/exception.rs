use async_trait::async_trait;
use rda_common::{RdaError, Result};
use std::marker::PhantomData;

use super::{RecordSource, Sequenced};

type ErrorFactory = Box<dyn FnMut() -> RdaError + Send>;

/// Delivers `limit` records from `inner` and then fails every call with an
/// error produced by `error_factory`.
///
/// Used to check that callers account for partial progress correctly.
pub struct ExceptionSource<S, T> {
    inner: S,
    remaining: usize,
    error_factory: ErrorFactory,
    _record: PhantomData<fn() -> T>,
}

impl<S, T> ExceptionSource<S, T> {
    pub fn new<F>(inner: S, limit: usize, error_factory: F) -> Self
    where
        F: FnMut() -> RdaError + Send + 'static,
    {
        Self {
            inner,
            remaining: limit,
            error_factory: Box::new(error_factory),
            _record: PhantomData,
        }
    }

    fn fail<R>(&mut self) -> Result<R> {
        Err((self.error_factory)())
    }
}

#[async_trait]
impl<S, T> RecordSource<T> for ExceptionSource<S, T>
where
    T: Sequenced + Send + 'static,
    S: RecordSource<T>,
{
    async fn has_more(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            return self.fail();
        }
        self.inner.has_more().await
    }

    async fn next(&mut self) -> Result<T> {
        if self.remaining == 0 {
            return self.fail();
        }
        let record = self.inner.next().await?;
        self.remaining -= 1;
        Ok(record)
    }

    async fn peek_sequence_number(&mut self) -> Result<Option<i64>> {
        if self.remaining == 0 {
            return self.fail();
        }
        self.inner.peek_sequence_number().await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_fails_after_limit() {
        let mut source = ExceptionSource::new(VecSource::new(0..10), 3, || {
            RdaError::Injected("after three".to_string())
        });

        for expected in 0..3 {
            assert!(source.has_more().await.unwrap());
            assert_eq!(source.next().await.unwrap(), TestRecord(expected));
        }

        assert!(matches!(source.has_more().await, Err(RdaError::Injected(_))));
        assert!(matches!(source.next().await, Err(RdaError::Injected(_))));
        source.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_inner_exhaustion_wins_before_limit() {
        let mut source =
            ExceptionSource::new(VecSource::new([1]), 5, || RdaError::Injected("x".to_string()));
        assert_eq!(source.next().await.unwrap(), TestRecord(1));
        assert!(!source.has_more().await.unwrap());
    }
}
