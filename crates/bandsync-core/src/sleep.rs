//! The two-phase sleep sync: index task and record task.
//!
//! A sync is a chain of two exchanges. The index task asks the band for
//! everything recorded since the last sync, receives a chunk count followed
//! by one summary chunk per day, and hands the executor a record task as its
//! follow-up. The record task streams the minute-level detail chunks and
//! merges them into the entries the index phase allocated. Only when the
//! detail counter reaches zero does the merged set surface to the caller.
//!
//! Frame acceptance is deliberately lenient: the band sometimes prefixes a
//! marker byte, so a frame belongs to a task if either of its first two
//! bytes is in the task's accepted header set.

use time::PrimitiveDateTime;
use tracing::{debug, info, warn};

use bandsync_types::{codec, DailySleep};

use crate::commands::{
    RESPONSE_NEW_DATA_COUNT, RESPONSE_SLEEP_DETAIL, RESPONSE_SLEEP_INDEX, SLEEP_SYNC_REQUEST,
    SLEEP_SYNC_REQUEST_LEN,
};
use crate::session::SyncSession;
use crate::task::{OrderTask, ResponseOutcome, TimeoutDecision};

fn assemble_sync_request(last_sync: PrimitiveDateTime, echo: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(SLEEP_SYNC_REQUEST_LEN);
    frame.push(SLEEP_SYNC_REQUEST);
    frame.extend_from_slice(&codec::pack_datetime(last_sync));
    frame.push(echo);
    frame
}

fn accepts(frame: &[u8], chunk_header: u8) -> bool {
    frame.len() >= 2
        && frame[..2]
            .iter()
            .any(|&b| b == RESPONSE_NEW_DATA_COUNT || b == chunk_header)
}

/// First phase of a sleep sync: retrieves the per-day summary chunks and
/// allocates the index key space the record phase merges into.
pub struct SleepIndexTask {
    last_sync: PrimitiveDateTime,
    saw_response: bool,
    grace_used: bool,
}

impl SleepIndexTask {
    /// Create an index task requesting everything recorded since
    /// `last_sync`.
    #[must_use]
    pub fn new(last_sync: PrimitiveDateTime) -> Self {
        Self {
            last_sync,
            saw_response: false,
            grace_used: false,
        }
    }
}

impl OrderTask for SleepIndexTask {
    fn name(&self) -> &'static str {
        "sleep_index_sync"
    }

    fn assemble(&self) -> Vec<u8> {
        assemble_sync_request(self.last_sync, RESPONSE_SLEEP_INDEX)
    }

    fn on_frame(&mut self, session: &mut SyncSession, frame: &[u8]) -> ResponseOutcome {
        if !accepts(frame, RESPONSE_SLEEP_INDEX) {
            return ResponseOutcome::Ignored;
        }
        self.saw_response = true;

        match frame[0] {
            RESPONSE_NEW_DATA_COUNT => {
                let count = codec::be_uint(&frame[2..]);
                session.set_counts(count);
                debug!(count, "sleep index count received");
                if count == 0 {
                    info!("no unsynced sleep data");
                    return ResponseOutcome::Done {
                        follow_up: None,
                        report: Some(session.take_entries()),
                    };
                }
                ResponseOutcome::Rearm {
                    expected_chunks: session.pending_chunks(),
                }
            }
            RESPONSE_SLEEP_INDEX => {
                if session.index_remaining() == 0 {
                    // Replayed chunk after the phase already drained.
                    return ResponseOutcome::Pending;
                }
                match DailySleep::parse_index(frame) {
                    Ok(sleep) => session.record_index_chunk(sleep),
                    Err(e) => {
                        debug!(error = %e, "discarding malformed sleep index chunk");
                        return ResponseOutcome::Ignored;
                    }
                };
                if session.index_remaining() > 0 {
                    debug!(
                        remaining = session.index_remaining(),
                        "sleep index chunk stored"
                    );
                    return ResponseOutcome::Pending;
                }
                if session.is_empty() {
                    // Counter drained without yielding a single entry:
                    // vacuously complete rather than stalling the queue.
                    return ResponseOutcome::Done {
                        follow_up: None,
                        report: Some(session.take_entries()),
                    };
                }
                info!(days = session.len(), "sleep index phase complete");
                ResponseOutcome::Done {
                    follow_up: Some(Box::new(SleepRecordTask::new(self.last_sync))),
                    report: None,
                }
            }
            _ => ResponseOutcome::Ignored,
        }
    }

    fn on_timeout(&mut self, _session: &mut SyncSession) -> TimeoutDecision {
        if !self.saw_response {
            warn!("timed out waiting for sleep data count");
            return TimeoutDecision::Abort;
        }
        if !self.grace_used {
            self.grace_used = true;
            return TimeoutDecision::Defer;
        }
        TimeoutDecision::Abort
    }
}

/// Second phase of a sleep sync: streams detail chunks into the entries the
/// index phase allocated, then reports the merged set.
pub struct SleepRecordTask {
    last_sync: PrimitiveDateTime,
    grace_used: bool,
}

impl SleepRecordTask {
    /// Create a record task for the same sync window as the index phase.
    #[must_use]
    pub fn new(last_sync: PrimitiveDateTime) -> Self {
        Self {
            last_sync,
            grace_used: false,
        }
    }

    fn finish(&self, session: &mut SyncSession) -> ResponseOutcome {
        info!(days = session.len(), "sleep sync complete");
        ResponseOutcome::Done {
            follow_up: None,
            report: Some(session.take_entries()),
        }
    }
}

impl OrderTask for SleepRecordTask {
    fn name(&self) -> &'static str {
        "sleep_record_sync"
    }

    fn assemble(&self) -> Vec<u8> {
        assemble_sync_request(self.last_sync, RESPONSE_SLEEP_DETAIL)
    }

    fn on_frame(&mut self, session: &mut SyncSession, frame: &[u8]) -> ResponseOutcome {
        if !accepts(frame, RESPONSE_SLEEP_DETAIL) {
            return ResponseOutcome::Ignored;
        }

        match frame[0] {
            RESPONSE_NEW_DATA_COUNT => {
                // The index-phase estimate was provisional; the band's own
                // count wins.
                let count = codec::be_uint(&frame[2..]);
                session.set_detail_count(count);
                debug!(count, "sleep record count received");
                if count == 0 {
                    return self.finish(session);
                }
                ResponseOutcome::Rearm {
                    expected_chunks: count,
                }
            }
            RESPONSE_SLEEP_DETAIL => {
                if session.detail_remaining() == 0 {
                    return ResponseOutcome::Pending;
                }
                let index = u32::from(frame[1]);
                if !session.record_detail_chunk(index, &frame[2..]) {
                    debug!(index, "sleep detail chunk for unallocated index");
                    return ResponseOutcome::Ignored;
                }
                if session.detail_remaining() > 0 {
                    debug!(
                        remaining = session.detail_remaining(),
                        "sleep detail chunk merged"
                    );
                    return ResponseOutcome::Pending;
                }
                self.finish(session)
            }
            _ => ResponseOutcome::Ignored,
        }
    }

    fn on_timeout(&mut self, _session: &mut SyncSession) -> TimeoutDecision {
        // The record count was established during the index phase, so the
        // first expiry always earns the grace window.
        if !self.grace_used {
            self.grace_used = true;
            return TimeoutDecision::Defer;
        }
        warn!("timed out waiting for sleep detail chunks");
        TimeoutDecision::Abort
    }
}
