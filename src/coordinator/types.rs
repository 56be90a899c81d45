// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Run report types.
//!
//! Every call to [`SyncEngine::sync_all()`](super::SyncEngine::sync_all) or
//! [`SyncEngine::sync()`](super::SyncEngine::sync) returns a [`SyncReport`]
//! describing what each direction did.
//!
//! # Reading a Report
//!
//! - `copied` is the run's copy counter: objects written, both directions
//! - each [`DirectionReport`] carries its comparison outcome and counters
//! - a direction whose listing failed part-way is *not* an error; its
//!   `outcome` says so, and the next run picks up the rest

use crate::comparator::ComparisonOutcome;
use crate::stats::StatsSnapshot;
use std::time::Duration;

/// Which way a run copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// A to B and B to A concurrently, from a single listing of each store.
    Bidirectional,
    /// Source to destination only.
    OneWay,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Bidirectional => write!(f, "bidirectional"),
            SyncMode::OneWay => write!(f, "one-way"),
        }
    }
}

/// Result of one direction of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionReport {
    /// `"src -> dst"`.
    pub direction: String,
    pub outcome: ComparisonOutcome,
    pub stats: StatsSnapshot,
}

impl DirectionReport {
    /// True if every source key was compared and every scheduled copy succeeded
    /// or was skipped.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete() && self.stats.failed == 0 && self.stats.pending() == 0
    }
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mode: SyncMode,
    /// A to B (or source to destination for one-way runs).
    pub forward: DirectionReport,
    /// B to A. `None` for one-way runs.
    pub backward: Option<DirectionReport>,
    /// Objects copied across all directions.
    pub copied: u64,
    pub elapsed: Duration,
}

impl SyncReport {
    pub fn directions(&self) -> impl Iterator<Item = &DirectionReport> {
        std::iter::once(&self.forward).chain(self.backward.as_ref())
    }

    /// Counters summed over all directions.
    pub fn totals(&self) -> StatsSnapshot {
        self.directions()
            .fold(StatsSnapshot::default(), |acc, d| acc + d.stats)
    }

    pub fn is_complete(&self) -> bool {
        self.directions().all(DirectionReport::is_complete)
    }
}
