//! Pushes records from a source to a flow-controlled call transport

use rda_common::{RdaError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::source::{BoxRecordSource, RecordSource, Sequenced};

/// The outgoing half of one streaming call.
pub trait CallStream<T>: Send + Sync {
    /// False while the transport cannot accept another message.
    fn is_ready(&self) -> bool;

    /// True once the client has gone away.
    fn is_cancelled(&self) -> bool;

    fn send(&self, item: T) -> Result<()>;

    /// Ends the call successfully.
    fn complete(&self);

    /// Ends the call with `error`.
    fn fail(&self, error: RdaError);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Running,
    Completed,
    Cancelled,
    Errored,
}

impl ResponderState {
    pub fn is_terminal(self) -> bool {
        self != ResponderState::Running
    }
}

struct Inner<T> {
    source: Option<BoxRecordSource<T>>,
    state: ResponderState,
}

impl<T> Inner<T>
where
    T: Sequenced + Send + 'static,
{
    async fn close_source(&mut self) -> Result<()> {
        match self.source.take() {
            Some(mut source) => source.close().await,
            None => Ok(()),
        }
    }

    /// Sends one record; false when the source is exhausted.
    async fn pump_one<C: CallStream<T>>(&mut self, stream: &C) -> Result<bool> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        if !source.has_more().await? {
            return Ok(false);
        }
        let record = source.next().await?;
        stream.send(record)?;
        Ok(true)
    }
}

/// Drives one streaming call.
///
/// The transport calls [`on_ready`](Self::on_ready) whenever it can accept
/// more messages and [`on_cancel`](Self::on_cancel) when the client goes away.
/// Records are pulled one at a time and only while the transport is ready.
/// The source and the state share one lock, so a terminal state is entered
/// exactly once and the source is closed exactly once.
pub struct StreamResponder<T, C> {
    inner: Mutex<Inner<T>>,
    stream: C,
    cancelled: AtomicBool,
}

impl<T, C> StreamResponder<T, C>
where
    T: Sequenced + Send + 'static,
    C: CallStream<T>,
{
    pub fn new(source: BoxRecordSource<T>, stream: C) -> Self {
        Self {
            inner: Mutex::new(Inner {
                source: Some(source),
                state: ResponderState::Running,
            }),
            stream,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn stream(&self) -> &C {
        &self.stream
    }

    pub async fn state(&self) -> ResponderState {
        self.inner.lock().await.state
    }

    /// Marks the call cancelled; the next ready signal winds it down.
    pub fn on_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.stream.is_cancelled()
    }

    async fn finish_cancelled(&self, inner: &mut Inner<T>) {
        if let Err(error) = inner.close_source().await {
            warn!(error = %error, "Failed to close source of cancelled call");
        }
        self.stream.complete();
        inner.state = ResponderState::Cancelled;
        debug!("Call cancelled");
    }

    pub async fn on_ready(&self) -> ResponderState {
        let mut inner = self.inner.lock().await;

        while inner.state == ResponderState::Running {
            if self.is_cancelled() {
                self.finish_cancelled(&mut inner).await;
                break;
            }

            if !self.stream.is_ready() {
                break;
            }

            match inner.pump_one(&self.stream).await {
                Ok(true) => {},
                Ok(false) => {
                    match inner.close_source().await {
                        Ok(()) => {
                            self.stream.complete();
                            inner.state = ResponderState::Completed;
                        },
                        Err(error) => {
                            self.stream.fail(error);
                            inner.state = ResponderState::Errored;
                        },
                    }
                    debug!(state = ?inner.state, "Source exhausted");
                },
                Err(RdaError::Cancelled) => self.finish_cancelled(&mut inner).await,
                Err(error) => {
                    warn!(error = %error, "Streaming call failed");
                    if let Err(close_error) = inner.close_source().await {
                        warn!(error = %close_error, "Failed to close source after error");
                    }
                    self.stream.fail(error);
                    inner.state = ResponderState::Errored;
                },
            }
        }

        inner.state
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::source::testing::{TestRecord, VecSource};
    use crate::source::{ExceptionSource, RecordSourceExt};
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex as StdMutex};

    /// Transport double with a fixed number of send credits.
    #[derive(Default)]
    struct RecordingStream {
        sent: StdMutex<Vec<i64>>,
        credits: AtomicUsize,
        cancelled: AtomicBool,
        completed: AtomicUsize,
        failures: StdMutex<Vec<String>>,
    }

    impl RecordingStream {
        fn with_credits(credits: usize) -> Self {
            let stream = Self::default();
            stream.credits.store(credits, Ordering::SeqCst);
            stream
        }

        fn sent(&self) -> Vec<i64> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl CallStream<TestRecord> for RecordingStream {
        fn is_ready(&self) -> bool {
            self.credits.load(Ordering::SeqCst) > 0
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }

        fn send(&self, item: TestRecord) -> Result<()> {
            self.credits.fetch_sub(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(item.0);
            Ok(())
        }

        fn complete(&self) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        fn fail(&self, error: RdaError) {
            self.failures.lock().unwrap().push(error.to_string());
        }
    }

    #[tokio::test]
    async fn test_sends_only_while_ready_then_completes() {
        let source = VecSource::new([1, 2, 3, 4]);
        let closes = source.closes.clone();
        let responder = StreamResponder::new(source.boxed(), RecordingStream::with_credits(2));

        assert_eq!(responder.on_ready().await, ResponderState::Running);
        assert_eq!(responder.stream().sent(), vec![1, 2]);

        responder.stream().credits.store(10, Ordering::SeqCst);
        assert_eq!(responder.on_ready().await, ResponderState::Completed);
        assert_eq!(responder.stream().sent(), vec![1, 2, 3, 4]);
        assert_eq!(responder.stream().completed.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        assert_eq!(responder.on_ready().await, ResponderState::Completed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_sending_and_closes_once() {
        let source = VecSource::new(0..100);
        let closes = source.closes.clone();
        let responder = StreamResponder::new(source.boxed(), RecordingStream::with_credits(3));

        responder.on_ready().await;
        responder.on_cancel();
        responder.stream().credits.store(50, Ordering::SeqCst);

        assert_eq!(responder.on_ready().await, ResponderState::Cancelled);
        assert_eq!(responder.on_ready().await, ResponderState::Cancelled);
        assert_eq!(responder.stream().sent(), vec![0, 1, 2]);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(responder.stream().completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_cancellation_is_polled() {
        let stream = RecordingStream::with_credits(5);
        stream.cancelled.store(true, Ordering::SeqCst);
        let responder = StreamResponder::new(VecSource::new([1]).boxed(), stream);

        assert_eq!(responder.on_ready().await, ResponderState::Cancelled);
        assert!(responder.stream().sent().is_empty());
    }

    #[tokio::test]
    async fn test_source_error_fails_call() {
        let source = ExceptionSource::new(VecSource::new(0..10), 2, || {
            RdaError::Injected("boom".to_string())
        });
        let responder = StreamResponder::new(source.boxed(), RecordingStream::with_credits(10));

        assert_eq!(responder.on_ready().await, ResponderState::Errored);
        assert_eq!(responder.state().await, ResponderState::Errored);
        assert_eq!(responder.stream().sent(), vec![0, 1]);
        let failures = responder.stream().failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("boom"));
        assert_eq!(responder.stream().completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_cancel_is_observed() {
        let responder = Arc::new(StreamResponder::new(
            VecSource::new(0..1000).boxed(),
            RecordingStream::with_credits(1),
        ));

        let cancel = {
            let responder = responder.clone();
            tokio::spawn(async move { responder.on_cancel() })
        };
        cancel.await.unwrap();

        responder.stream().credits.store(1000, Ordering::SeqCst);
        assert_eq!(responder.on_ready().await, ResponderState::Cancelled);
        assert!(responder.stream().sent().is_empty());
    }
}
