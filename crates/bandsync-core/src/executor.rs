//! The sequential task executor and its timeout supervisor.
//!
//! The executor owns the protocol's single-flight invariant: at most one
//! order task is awaiting a response at any time. Inbound frames, task
//! submissions, resets, and deadline expiry are all serialized through one
//! event loop, so a frame can never race a timeout abort for the same task
//! and the session state is only ever touched by the task currently in
//! flight.
//!
//! The timeout supervisor is a single re-armable deadline inside that loop:
//! armed when an awaited task is sent, recomputed when the task learns how
//! many chunks to expect, extended once by a short grace window when the
//! task asks to defer, and cleared on completion. At most one deadline is
//! armed at any instant.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::events::{EventReceiver, SyncEvent};
use crate::session::SyncSession;
use crate::task::{OrderStatus, OrderTask, ResponseKind, ResponseOutcome, TimeoutDecision};

/// Options for the task executor's timing and buffering.
///
/// Use the builder-style setters for configuration:
///
/// ```
/// use std::time::Duration;
/// use bandsync_core::ExecutorOptions;
///
/// let options = ExecutorOptions::new()
///     .exchange_timeout(Duration::from_secs(5))
///     .per_chunk_timeout(Duration::from_millis(150));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Base budget for one exchange, armed when an awaited task is sent.
    /// Default: 3 seconds.
    pub exchange_timeout: Duration,
    /// Additional budget granted per expected chunk once a count is known.
    /// Default: 100 milliseconds.
    pub per_chunk_timeout: Duration,
    /// Length of the single grace extension a task may request on expiry.
    /// Default: 1 second.
    pub grace_timeout: Duration,
    /// Capacity of the event channel returned by [`TaskExecutor::spawn`].
    /// Default: 32 events.
    pub event_buffer: usize,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            exchange_timeout: Duration::from_secs(3),
            per_chunk_timeout: Duration::from_millis(100),
            grace_timeout: Duration::from_secs(1),
            event_buffer: 32,
        }
    }
}

impl ExecutorOptions {
    /// Create options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base per-exchange budget.
    #[must_use]
    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    /// Set the per-expected-chunk budget.
    #[must_use]
    pub fn per_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.per_chunk_timeout = timeout;
        self
    }

    /// Set the grace extension length.
    #[must_use]
    pub fn grace_timeout(mut self, timeout: Duration) -> Self {
        self.grace_timeout = timeout;
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that the timeouts are non-zero and the event buffer holds at
    /// least one event.
    pub fn validate(&self) -> Result<()> {
        if self.exchange_timeout.is_zero() {
            return Err(Error::invalid_config("exchange_timeout must be > 0"));
        }
        if self.grace_timeout.is_zero() {
            return Err(Error::invalid_config("grace_timeout must be > 0"));
        }
        if self.event_buffer == 0 {
            return Err(Error::invalid_config("event_buffer must be > 0"));
        }
        Ok(())
    }

    fn chunked_budget(&self, expected_chunks: u32) -> Duration {
        self.exchange_timeout + self.per_chunk_timeout * expected_chunks
    }
}

enum EngineCommand {
    Enqueue(Box<dyn OrderTask>),
    Frame(Vec<u8>),
    Reset,
}

/// Handle to the sequential task executor.
///
/// Created with [`spawn`](Self::spawn), which starts the executor's event
/// loop as a background task and returns the event receiver alongside the
/// handle. All handle methods are non-blocking posts into that loop.
///
/// Dropping the handle (or calling [`close`](Self::close)) stops the loop;
/// in-flight and queued tasks are dropped.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bandsync_core::{ExecutorOptions, MockChannel, SleepIndexTask, SyncEvent, TaskExecutor};
///
/// # async fn example(last_sync: time::PrimitiveDateTime) {
/// let channel = Arc::new(MockChannel::new());
/// let (executor, mut events) = TaskExecutor::spawn(channel, ExecutorOptions::default());
///
/// executor
///     .enqueue(Box::new(SleepIndexTask::new(last_sync)))
///     .unwrap();
///
/// while let Some(event) = events.recv().await {
///     if let SyncEvent::SyncCompleted { sleeps } = event {
///         println!("synced {} days", sleeps.len());
///         break;
///     }
/// }
/// # }
/// ```
pub struct TaskExecutor {
    commands: mpsc::UnboundedSender<EngineCommand>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TaskExecutor {
    /// Spawn the executor over `channel` and return the handle plus the
    /// event receiver.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(channel: Arc<dyn Channel>, options: ExecutorOptions) -> (Self, EventReceiver) {
        let (events_tx, events_rx) = mpsc::channel(options.event_buffer.max(1));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let engine = Engine {
            channel,
            options,
            events: events_tx,
            queue: VecDeque::new(),
            current: None,
            session: SyncSession::new(),
            deadline: None,
        };
        let handle = tokio::spawn(engine.run(commands_rx, cancel.clone()));

        (
            Self {
                commands: commands_tx,
                cancel,
                handle,
            },
            events_rx,
        )
    }

    /// Submit an order task.
    ///
    /// The task starts immediately if nothing is in flight, otherwise it
    /// waits its turn in the pending queue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the executor has stopped.
    pub fn enqueue(&self, task: Box<dyn OrderTask>) -> Result<()> {
        self.commands
            .send(EngineCommand::Enqueue(task))
            .map_err(|_| Error::Closed)
    }

    /// Deliver one inbound frame from the channel.
    ///
    /// The frame is routed to the currently in-flight task only; frames
    /// arriving while no task is in flight are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the executor has stopped.
    pub fn handle_frame(&self, frame: Vec<u8>) -> Result<()> {
        self.commands
            .send(EngineCommand::Frame(frame))
            .map_err(|_| Error::Closed)
    }

    /// Abort the in-flight task, drop the pending queue, and go idle.
    ///
    /// Call this when the link disconnects: queued exchanges cannot outlive
    /// the connection they were built for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] if the executor has stopped.
    pub fn reset(&self) -> Result<()> {
        self.commands
            .send(EngineCommand::Reset)
            .map_err(|_| Error::Closed)
    }

    /// Stop the executor's event loop.
    pub fn close(self) {
        self.cancel.cancel();
    }

    /// Whether the event loop is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Engine {
    channel: Arc<dyn Channel>,
    options: ExecutorOptions,
    events: mpsc::Sender<SyncEvent>,
    queue: VecDeque<Box<dyn OrderTask>>,
    current: Option<Box<dyn OrderTask>>,
    session: SyncSession,
    deadline: Option<Instant>,
}

impl Engine {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
        cancel: CancellationToken,
    ) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("task executor cancelled, stopping");
                    break;
                }
                command = commands.recv() => match command {
                    Some(EngineCommand::Enqueue(task)) => self.on_enqueue(task).await,
                    Some(EngineCommand::Frame(frame)) => self.on_frame(&frame).await,
                    Some(EngineCommand::Reset) => self.on_reset().await,
                    None => {
                        debug!("executor handle dropped, stopping");
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_deadline().await;
                }
            }
        }
    }

    async fn on_enqueue(&mut self, task: Box<dyn OrderTask>) {
        debug!(task = task.name(), pending = self.queue.len(), "order task enqueued");
        self.queue.push_back(task);
        if self.current.is_none() {
            self.advance().await;
        }
    }

    /// Send queued tasks until one is awaiting a response or the queue is
    /// dry. A failed write fails that task only.
    async fn advance(&mut self) {
        while let Some(task) = self.queue.pop_front() {
            let frame = task.assemble();
            debug!(task = task.name(), len = frame.len(), "sending order task");

            if let Err(e) = self.channel.write(&frame).await {
                warn!(task = task.name(), error = %e, "outbound write failed");
                self.emit_finished(task.name(), OrderStatus::Failed).await;
                continue;
            }

            match task.response_kind() {
                ResponseKind::None => {
                    debug!(task = task.name(), "completed, no response expected");
                    self.emit_finished(task.name(), OrderStatus::Success).await;
                }
                ResponseKind::Awaited => {
                    self.deadline = Some(Instant::now() + self.options.exchange_timeout);
                    self.current = Some(task);
                    return;
                }
            }
        }
    }

    async fn on_frame(&mut self, frame: &[u8]) {
        let Some(task) = self.current.as_mut() else {
            debug!(len = frame.len(), "inbound frame dropped, no task in flight");
            return;
        };
        let task_name = task.name();

        match task.on_frame(&mut self.session, frame) {
            ResponseOutcome::Ignored => {
                debug!(task = task_name, len = frame.len(), "inbound frame ignored");
            }
            ResponseOutcome::Pending => {}
            ResponseOutcome::Rearm { expected_chunks } => {
                let budget = self.options.chunked_budget(expected_chunks);
                debug!(task = task_name, expected_chunks, ?budget, "deadline re-armed");
                self.deadline = Some(Instant::now() + budget);
            }
            ResponseOutcome::Done { follow_up, report } => {
                self.deadline = None;
                self.current = None;
                info!(task = task_name, "order task completed");

                if let Some(next) = follow_up {
                    self.queue.push_front(next);
                }
                if report.is_some() {
                    // The sync is over either way; nothing may leak into the
                    // next one.
                    self.session.clear();
                }

                // Advance before reporting so the next exchange is already in
                // flight when the caller observes the result.
                self.advance().await;

                self.emit_finished(task_name, OrderStatus::Success).await;
                if let Some(sleeps) = report {
                    self.emit(SyncEvent::SyncCompleted { sleeps }).await;
                }
            }
        }
    }

    async fn on_deadline(&mut self) {
        self.deadline = None;
        let Some(task) = self.current.as_mut() else {
            return;
        };
        let task_name = task.name();

        match task.on_timeout(&mut self.session) {
            TimeoutDecision::Defer => {
                debug!(
                    task = task_name,
                    grace = ?self.options.grace_timeout,
                    "grace extension granted"
                );
                self.deadline = Some(Instant::now() + self.options.grace_timeout);
            }
            TimeoutDecision::Abort => {
                warn!(task = task_name, "order task timed out, aborting");
                self.current = None;
                self.session.clear();
                self.emit_finished(task_name, OrderStatus::Failed).await;
                self.advance().await;
            }
        }
    }

    async fn on_reset(&mut self) {
        if let Some(task) = self.current.take() {
            warn!(task = task.name(), "in-flight task aborted by reset");
            self.emit_finished(task.name(), OrderStatus::Failed).await;
        }
        if !self.queue.is_empty() {
            debug!(dropped = self.queue.len(), "pending tasks dropped by reset");
            self.queue.clear();
        }
        self.deadline = None;
        self.session.clear();
    }

    async fn emit(&self, event: SyncEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
        }
    }

    async fn emit_finished(&self, task: &str, status: OrderStatus) {
        self.emit(SyncEvent::TaskFinished {
            task: task.to_string(),
            status,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = ExecutorOptions::default();
        assert_eq!(options.exchange_timeout, Duration::from_secs(3));
        assert_eq!(options.per_chunk_timeout, Duration::from_millis(100));
        assert_eq!(options.grace_timeout, Duration::from_secs(1));
        assert_eq!(options.event_buffer, 32);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_builder() {
        let options = ExecutorOptions::new()
            .exchange_timeout(Duration::from_secs(5))
            .per_chunk_timeout(Duration::from_millis(50))
            .grace_timeout(Duration::from_millis(500))
            .event_buffer(8);

        assert_eq!(options.exchange_timeout, Duration::from_secs(5));
        assert_eq!(options.per_chunk_timeout, Duration::from_millis(50));
        assert_eq!(options.grace_timeout, Duration::from_millis(500));
        assert_eq!(options.event_buffer, 8);
    }

    #[test]
    fn test_options_validate_rejects_zero() {
        assert!(ExecutorOptions::new()
            .exchange_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ExecutorOptions::new()
            .grace_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ExecutorOptions::new().event_buffer(0).validate().is_err());
    }

    #[test]
    fn test_chunked_budget_scales_with_count() {
        let options = ExecutorOptions::default();
        // 3 index + 6 detail chunks
        assert_eq!(
            options.chunked_budget(9),
            Duration::from_secs(3) + Duration::from_millis(900)
        );
        assert_eq!(options.chunked_budget(0), Duration::from_secs(3));
    }
}
