//! The order task abstraction: one logical request/response exchange.
//!
//! A task knows how to assemble its outbound frame, how to interpret inbound
//! frames addressed to it, and how it wants to be treated when its deadline
//! fires. Everything a task decides is communicated back to the executor as
//! a plain value ([`ResponseOutcome`] / [`TimeoutDecision`]); tasks never
//! reach into the executor, which keeps chaining and re-arming testable
//! without one.

use serde::{Deserialize, Serialize};

use bandsync_types::DailySleep;

use crate::session::SyncSession;

/// Terminal status of an order task, decided by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Submitted or in flight.
    Pending,
    /// Completed its exchange.
    Success,
    /// Aborted by timeout or a failed write.
    Failed,
}

/// Whether a task expects inbound frames after its request is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Fire-and-forget: the task completes as soon as the write succeeds.
    None,
    /// The task stays current until a terminal [`ResponseOutcome`].
    Awaited,
}

/// A task's answer when its deadline fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutDecision {
    /// Grant one short grace window instead of aborting.
    Defer,
    /// Abort the task unconditionally.
    Abort,
}

/// What an inbound frame meant to the current task.
pub enum ResponseOutcome {
    /// Header not in this task's accepted set, or payload was noise.
    /// Silently dropped; the link may carry stale or foreign frames.
    Ignored,
    /// Frame consumed; the exchange continues.
    Pending,
    /// A chunk count was learned: ask the supervisor to recompute the
    /// deadline from the expected transfer volume.
    Rearm {
        /// Chunks still expected on the link.
        expected_chunks: u32,
    },
    /// Terminal success.
    Done {
        /// Next task in the chain, started ahead of anything already queued.
        follow_up: Option<Box<dyn OrderTask>>,
        /// Caller-visible result, delivered after the executor has advanced.
        report: Option<Vec<DailySleep>>,
    },
}

/// One logical request/response unit of the sync protocol.
///
/// Implementations are state machines over the closed set of response
/// headers they accept; see the sleep tasks in [`crate::sleep`] for the two
/// variants that make up a sync. All methods are called from the executor's
/// event loop, never concurrently.
pub trait OrderTask: Send + Sync {
    /// Short name used in logs and failure events.
    fn name(&self) -> &'static str;

    /// Whether this task awaits a response (the default) or completes on
    /// write.
    fn response_kind(&self) -> ResponseKind {
        ResponseKind::Awaited
    }

    /// Produce the exact outbound command frame.
    ///
    /// Pure function of the task's construction parameters.
    fn assemble(&self) -> Vec<u8>;

    /// Interpret one inbound frame while this task is current.
    ///
    /// Must validate the frame's header byte(s) against the task's accepted
    /// set and return [`ResponseOutcome::Ignored`] for anything else.
    fn on_frame(&mut self, session: &mut SyncSession, frame: &[u8]) -> ResponseOutcome {
        let _ = (session, frame);
        ResponseOutcome::Ignored
    }

    /// Decide between a grace extension and an abort when the deadline
    /// fires. The default never defers.
    fn on_timeout(&mut self, session: &mut SyncSession) -> TimeoutDecision {
        let _ = session;
        TimeoutDecision::Abort
    }
}
