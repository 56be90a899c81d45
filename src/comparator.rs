// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Differential comparator: merge-join of two sorted key streams.
//!
//! # Algorithm
//!
//! ```text
//! source:       a   b       d   e
//! destination:  a       c   d       (end)
//! cursor:       Start ─▶ a ─▶ c ─▶ d ─▶ Exhausted
//! scheduled:        b           e
//! ```
//!
//! For each source key `k`, the destination cursor advances while it sorts
//! strictly before `k`. If it then holds `k`, the key already exists at the
//! destination; otherwise (cursor past `k`, or destination exhausted) `k` is
//! scheduled for replication. Both streams are read once, so memory use is
//! independent of the number of keys.
//!
//! When either stream reports a failure the comparator stops scheduling,
//! then keeps reading both streams to their end so the upstream duplicators
//! (which also feed the other direction) are never left blocked.

use crate::lister::ListingItem;
use crate::metrics;
use crate::signal::AbortSignal;
use crate::stats::DirectionStats;
use crate::worker::WorkItem;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Position in the destination stream.
///
/// `Exhausted` sorts after every real key, so no key can be mistaken for
/// the end of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestCursor {
    /// Nothing read yet; sorts before every key.
    Start,
    At(String),
    Exhausted,
}

impl DestCursor {
    /// True if the cursor must advance before `key` can be classified.
    pub fn is_behind(&self, key: &str) -> bool {
        match self {
            DestCursor::Start => true,
            DestCursor::At(current) => current.as_str() < key,
            DestCursor::Exhausted => false,
        }
    }

    /// True if the destination holds `key`. Only meaningful once `!is_behind(key)`.
    pub fn holds(&self, key: &str) -> bool {
        matches!(self, DestCursor::At(current) if current == key)
    }
}

/// How a comparison ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    /// Every source key was classified.
    Completed,
    /// The source listing failed part-way.
    SourceFailed(String),
    /// The destination listing failed part-way.
    DestinationFailed(String),
    /// The run was aborted or the worker pool went away.
    Aborted,
}

impl ComparisonOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ComparisonOutcome::Completed)
    }
}

enum Next {
    Key(String),
    End,
    Failed(String),
}

async fn next(rx: &mut mpsc::Receiver<ListingItem>) -> Next {
    match rx.recv().await {
        Some(ListingItem::Object(record)) => Next::Key(record.key),
        Some(ListingItem::End) => Next::End,
        Some(ListingItem::Failed(reason)) => Next::Failed(reason),
        None => Next::Failed("listing ended unexpectedly".to_string()),
    }
}

async fn drain(rx: &mut mpsc::Receiver<ListingItem>) -> usize {
    let mut drained = 0;
    while rx.recv().await.is_some() {
        drained += 1;
    }
    drained
}

/// Schedule every key of `source` that is absent from `destination`.
///
/// Missing keys are pushed onto `work` (blocking while it is full). The
/// sender is dropped before this function returns, which is what lets the
/// worker pool finish.
pub async fn compare(
    mut source: mpsc::Receiver<ListingItem>,
    mut destination: mpsc::Receiver<ListingItem>,
    work: async_channel::Sender<WorkItem>,
    stats: &DirectionStats,
    abort: &AbortSignal,
    direction: &str,
) -> ComparisonOutcome {
    let mut cursor = DestCursor::Start;

    let outcome = 'merge: loop {
        let key = match next(&mut source).await {
            Next::Key(key) => key,
            Next::End => break ComparisonOutcome::Completed,
            Next::Failed(reason) => break ComparisonOutcome::SourceFailed(reason),
        };
        if abort.is_triggered() {
            break ComparisonOutcome::Aborted;
        }
        stats.record_found();

        while cursor.is_behind(&key) {
            cursor = match next(&mut destination).await {
                Next::Key(dest_key) => DestCursor::At(dest_key),
                Next::End => DestCursor::Exhausted,
                Next::Failed(reason) => break 'merge ComparisonOutcome::DestinationFailed(reason),
            };
        }
        if cursor.holds(&key) {
            continue;
        }

        stats.record_missing();
        metrics::record_missing(direction);
        if work.send(WorkItem { key }).await.is_err() {
            break ComparisonOutcome::Aborted;
        }
    };

    // Close the queue so idle workers can exit while we drain.
    drop(work);

    match &outcome {
        ComparisonOutcome::Completed => debug!("Comparison complete"),
        ComparisonOutcome::SourceFailed(reason) | ComparisonOutcome::DestinationFailed(reason) => {
            error!(reason = %reason, "Listing failed, stop replicating, waiting for pending ones")
        }
        ComparisonOutcome::Aborted => warn!("Comparison aborted"),
    }

    let (src_rest, dst_rest) = tokio::join!(drain(&mut source), drain(&mut destination));
    if src_rest + dst_rest > 0 {
        debug!(source = src_rest, destination = dst_rest, "Drained remaining listing items");
    }
    outcome
}
