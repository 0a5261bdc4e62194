//! In-process call transport over a bounded tokio channel

use rda_common::{RdaError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::responder::{CallStream, StreamResponder};
use crate::source::{BoxRecordSource, Sequenced};

type Outcome = Option<RdaError>;

/// [`CallStream`] writing into a bounded mpsc channel.
///
/// The channel's free capacity is the flow-control signal, and a closed
/// receiver means the client cancelled. The terminal outcome travels on a
/// separate oneshot so it never competes with records for capacity.
pub struct ChannelCallStream<T> {
    sender: Mutex<Option<mpsc::Sender<T>>>,
    outcome: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl<T> ChannelCallStream<T> {
    pub fn new(sender: mpsc::Sender<T>, outcome: oneshot::Sender<Outcome>) -> Self {
        Self {
            sender: Mutex::new(Some(sender)),
            outcome: Mutex::new(Some(outcome)),
        }
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::Sender<T>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, outcome: Outcome) {
        self.sender().take();
        let sender = self
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            // The receiver is gone when the client dropped the stream.
            let _ = sender.send(outcome);
        }
    }
}

impl<T> CallStream<T> for ChannelCallStream<T>
where
    T: Send,
{
    fn is_ready(&self) -> bool {
        self.sender()
            .as_ref()
            .map(|sender| sender.capacity() > 0)
            .unwrap_or(false)
    }

    fn is_cancelled(&self) -> bool {
        self.sender()
            .as_ref()
            .map(mpsc::Sender::is_closed)
            .unwrap_or(false)
    }

    fn send(&self, item: T) -> Result<()> {
        let guard = self.sender();
        let Some(sender) = guard.as_ref() else {
            return Err(RdaError::Transport("call already finished".to_string()));
        };
        sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => RdaError::Cancelled,
            mpsc::error::TrySendError::Full(_) => {
                RdaError::Transport("channel full".to_string())
            },
        })
    }

    fn complete(&self) {
        self.finish(None);
    }

    fn fail(&self, error: RdaError) {
        self.finish(Some(error));
    }
}

/// Client side of a streaming call.
pub struct ChangeStream<T> {
    receiver: mpsc::Receiver<T>,
    outcome: Option<oneshot::Receiver<Outcome>>,
}

impl<T> ChangeStream<T> {
    /// The next record, then the call's error if it failed, then `None`.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if let Some(item) = self.receiver.recv().await {
            return Some(Ok(item));
        }
        match self.outcome.take()?.await {
            Ok(Some(error)) => Some(Err(error)),
            _ => None,
        }
    }

    /// Stops the call. Records already buffered are still returned by `next`.
    pub fn cancel(&mut self) {
        self.receiver.close();
    }

    /// Reads every remaining record, failing with the call's error.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        while let Some(item) = self.next().await {
            records.push(item?);
        }
        Ok(records)
    }
}

/// Starts streaming `source` to a new [`ChangeStream`].
///
/// A driver task waits for channel capacity and calls
/// [`StreamResponder::on_ready`] each time some frees up. A closed or dropped
/// receiver turns into [`StreamResponder::on_cancel`].
pub fn start_stream<T>(source: BoxRecordSource<T>, capacity: usize) -> ChangeStream<T>
where
    T: Sequenced + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let (outcome_sender, outcome_receiver) = oneshot::channel();
    let waiter = sender.clone();
    let responder = Arc::new(StreamResponder::new(
        source,
        ChannelCallStream::new(sender, outcome_sender),
    ));

    tokio::spawn(async move {
        loop {
            match waiter.reserve().await {
                Ok(permit) => drop(permit),
                Err(_) => responder.on_cancel(),
            }
            let state = responder.on_ready().await;
            if state.is_terminal() {
                debug!(?state, "Streaming call finished");
                break;
            }
        }
    });

    ChangeStream {
        receiver,
        outcome: Some(outcome_receiver),
    }
}
