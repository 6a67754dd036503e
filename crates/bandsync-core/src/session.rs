//! Per-sync aggregation state.
//!
//! One [`SyncSession`] lives for the duration of one sleep sync: the index
//! phase allocates entries into it, the record phase merges detail into the
//! same entries, and the executor tears it down at completion or abort so
//! nothing leaks into the next sync. The executor owns the session and lends
//! it to the in-flight task one handler call at a time, which is what keeps
//! a completed task from ever touching it again.

use std::collections::BTreeMap;

use bandsync_types::DailySleep;

use crate::commands::DETAIL_CHUNKS_PER_INDEX;

/// Aggregation state for one sleep sync operation.
///
/// Entries are keyed by a running index allocated in index-chunk arrival
/// order; the record phase addresses the same keys. The two counters hold
/// the device-reported chunks still outstanding for each phase.
#[derive(Debug, Default)]
pub struct SyncSession {
    entries: BTreeMap<u32, DailySleep>,
    index_remaining: u32,
    detail_remaining: u32,
    next_index: u32,
}

impl SyncSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset both counters from the device-reported index-chunk count.
    ///
    /// The record counter is provisionally set to the fixed firmware ratio of
    /// [`DETAIL_CHUNKS_PER_INDEX`] detail chunks per index chunk; the record
    /// phase replaces it with the device's authoritative count.
    pub fn set_counts(&mut self, index_count: u32) {
        self.index_remaining = index_count;
        self.detail_remaining = index_count.saturating_mul(DETAIL_CHUNKS_PER_INDEX);
    }

    /// Replace the record counter with the device's authoritative count.
    pub fn set_detail_count(&mut self, count: u32) {
        self.detail_remaining = count;
    }

    /// Index chunks still outstanding.
    #[must_use]
    pub fn index_remaining(&self) -> u32 {
        self.index_remaining
    }

    /// Detail chunks still outstanding.
    #[must_use]
    pub fn detail_remaining(&self) -> u32 {
        self.detail_remaining
    }

    /// Total chunks still expected across both phases.
    #[must_use]
    pub fn pending_chunks(&self) -> u32 {
        self.index_remaining.saturating_add(self.detail_remaining)
    }

    /// Number of entries reconstructed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries have been reconstructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store one reconstructed index entry and consume one index chunk.
    ///
    /// Returns the key the entry was allocated under.
    pub fn record_index_chunk(&mut self, sleep: DailySleep) -> u32 {
        let key = self.next_index;
        self.next_index += 1;
        self.entries.insert(key, sleep);
        self.index_remaining = self.index_remaining.saturating_sub(1);
        key
    }

    /// Merge detail samples into the entry at `index` and consume one detail
    /// chunk.
    ///
    /// Returns `false` without touching the counter if no entry was allocated
    /// under `index`; the record phase never creates keys.
    pub fn record_detail_chunk(&mut self, index: u32, samples: &[u8]) -> bool {
        match self.entries.get_mut(&index) {
            Some(entry) => {
                entry.merge_detail(samples);
                self.detail_remaining = self.detail_remaining.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Drain all entries in index order, leaving the map empty.
    #[must_use]
    pub fn take_entries(&mut self) -> Vec<DailySleep> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    /// Tear the session down: entries dropped, counters zeroed.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index_remaining = 0;
        self.detail_remaining = 0;
        self.next_index = 0;
    }
}
