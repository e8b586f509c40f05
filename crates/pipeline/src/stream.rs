//! Streaming execution of a turn.
//!
//! A streaming turn runs on its own task and reports progress through a
//! bounded channel. The channel holds a single status, so the driver parks
//! after getting one snapshot ahead of the consumer; a turn is never
//! abandoned half-way because the consumer stopped listening.

use keepsake_core::{Error, Result, StepStatus, TurnResult};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::driver::{self, TurnContext};
use crate::sink::ChannelSink;

/// Capacity of the status channel. One slot keeps the driver at most one
/// emission ahead of the consumer.
const STATUS_CHANNEL_CAPACITY: usize = 1;

/// A turn in flight, observed one status at a time.
pub struct TurnStream {
    rx: mpsc::Receiver<StepStatus>,
    handle: JoinHandle<Result<TurnResult>>,
}

impl TurnStream {
    pub(crate) fn spawn(ctx: TurnContext, input: String) -> Self {
        let (tx, rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            let sink = ChannelSink::new(tx);
            driver::run_turn(&ctx, &input, &sink).await
        });
        Self { rx, handle }
    }

    /// The next status snapshot, or `None` once the turn has emitted its
    /// last one.
    pub async fn next_status(&mut self) -> Option<StepStatus> {
        self.rx.recv().await
    }

    /// Waits for the turn to finish and returns its result.
    ///
    /// Statuses not yet consumed are discarded; the turn itself always runs
    /// to completion.
    pub async fn finish(self) -> Result<TurnResult> {
        let TurnStream { rx, handle } = self;
        drop(rx);
        match handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("turn task failed: {e}"))),
        }
    }

    /// Adapts the remaining statuses into a [`tokio_stream::Stream`].
    ///
    /// The turn keeps running in the background, but its [`TurnResult`] can
    /// no longer be retrieved; use this for observe-only consumers.
    pub fn into_stream(self) -> ReceiverStream<StepStatus> {
        ReceiverStream::new(self.rx)
    }
}
