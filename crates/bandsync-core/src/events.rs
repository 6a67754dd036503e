//! Caller-visible events emitted by the task executor.
//!
//! The executor reports outcomes on an event channel returned from
//! [`TaskExecutor::spawn`](crate::executor::TaskExecutor::spawn): a
//! [`SyncEvent::SyncCompleted`] exactly once per completed sync, and a
//! [`SyncEvent::TaskFinished`] for every terminal task. An aborted sync
//! never produces a `SyncCompleted`; its failure surfaces as a
//! `TaskFinished` with [`OrderStatus::Failed`].
//!
//! All events are serializable for logging, persistence, and IPC.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use bandsync_types::DailySleep;

use crate::task::OrderStatus;

/// Events emitted by the task executor.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SyncEvent {
    /// An order task reached a terminal status.
    TaskFinished {
        /// The task's log name.
        task: String,
        /// Success or failure.
        status: OrderStatus,
    },
    /// One sleep sync completed; the final ordered, merged record set.
    SyncCompleted {
        /// One entry per day, in index order.
        sleeps: Vec<DailySleep>,
    },
}

/// Receiver for executor events.
pub type EventReceiver = mpsc::Receiver<SyncEvent>;

/// An async [`Stream`] over executor events.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
///
/// let (executor, events) = TaskExecutor::spawn(channel, ExecutorOptions::default());
/// let mut stream = SyncEventStream::new(events);
/// while let Some(event) = stream.next().await {
///     if let SyncEvent::SyncCompleted { sleeps } = event {
///         println!("synced {} days", sleeps.len());
///     }
/// }
/// ```
pub struct SyncEventStream {
    receiver: EventReceiver,
}

impl SyncEventStream {
    /// Wrap an event receiver in a stream.
    #[must_use]
    pub fn new(receiver: EventReceiver) -> Self {
        Self { receiver }
    }
}

impl From<EventReceiver> for SyncEventStream {
    fn from(receiver: EventReceiver) -> Self {
        Self::new(receiver)
    }
}

impl Stream for SyncEventStream {
    type Item = SyncEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}
