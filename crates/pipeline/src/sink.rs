//! Status observation for running turns.
//!
//! The turn driver reports progress by emitting [`StepStatus`] snapshots
//! into a [`StatusSink`]. Batch and streaming execution run the exact same
//! driver; only the sink differs. A callback sink relays snapshots to a
//! caller-supplied closure, a channel sink feeds a stream, and the null
//! sink discards everything.

use std::sync::Arc;

use async_trait::async_trait;
use keepsake_core::StepStatus;
use tokio::sync::{Mutex, mpsc};

/// Receives every status snapshot a turn emits, in order.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn emit(&self, status: StepStatus);
}

/// Discards all statuses. Used for batch runs with no observer.
pub struct NullSink;

#[async_trait]
impl StatusSink for NullSink {
    async fn emit(&self, _status: StepStatus) {}
}

/// Closure invoked for each status snapshot of a batch run.
pub type StatusCallback = Arc<dyn Fn(&StepStatus) + Send + Sync>;

/// Relays each status to a caller-supplied closure.
pub struct CallbackSink {
    callback: StatusCallback,
}

impl CallbackSink {
    pub fn new(callback: StatusCallback) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl StatusSink for CallbackSink {
    async fn emit(&self, status: StepStatus) {
        (self.callback)(&status);
    }
}

/// Collects statuses in memory. Primarily a test aid.
#[derive(Default)]
pub struct BufferSink {
    entries: Mutex<Vec<StepStatus>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything emitted so far.
    pub async fn snapshot(&self) -> Vec<StepStatus> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl StatusSink for BufferSink {
    async fn emit(&self, status: StepStatus) {
        self.entries.lock().await.push(status);
    }
}

/// Forwards statuses into a bounded channel.
///
/// Sending parks the turn while the channel is full, which is what paces
/// streaming execution. A dropped receiver is not an error: the turn keeps
/// running to completion and the remaining statuses go nowhere.
pub struct ChannelSink {
    tx: mpsc::Sender<StepStatus>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<StepStatus>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl StatusSink for ChannelSink {
    async fn emit(&self, status: StepStatus) {
        let _ = self.tx.send(status).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::StepKind;

    #[tokio::test]
    async fn buffer_sink_collects_in_order() {
        let sink = BufferSink::new();
        sink.emit(StepStatus::processing(StepKind::Judgment, Some("Likes".into())))
            .await;
        sink.emit(StepStatus::processing(StepKind::ReplyGeneration, None))
            .await;

        let seen = sink.snapshot().await;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind, StepKind::Judgment);
        assert_eq!(seen[1].kind, StepKind::ReplyGeneration);
    }

    #[tokio::test]
    async fn callback_sink_invokes_closure() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = CallbackSink::new(Arc::new(move |status: &StepStatus| {
            captured.lock().unwrap().push(status.kind);
        }));

        sink.emit(StepStatus::processing(StepKind::AttributeExtraction, None))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![StepKind::AttributeExtraction]);
    }

    #[tokio::test]
    async fn channel_sink_tolerates_dropped_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = ChannelSink::new(tx);

        // Must not panic or hang.
        sink.emit(StepStatus::processing(StepKind::ReplyGeneration, None))
            .await;
    }
}
