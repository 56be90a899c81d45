// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Run counters.
//!
//! A fresh [`CopyCounter`] and one [`DirectionStats`] per direction are created
//! for every `sync_all` call and shared with the workers via `Arc`, so
//! concurrent runs never mix their numbers.

use std::sync::atomic::{AtomicU64, Ordering};

/// Objects successfully replicated, across both directions of one run.
#[derive(Debug, Default)]
pub struct CopyCounter(AtomicU64);

impl CopyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Live counters for one direction (source -> destination).
#[derive(Debug, Default)]
pub struct DirectionStats {
    found: AtomicU64,
    missing: AtomicU64,
    copied: AtomicU64,
    copied_bytes: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time copy of [`DirectionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Source keys compared.
    pub found: u64,
    /// Source keys absent at the destination (scheduled).
    pub missing: u64,
    /// Objects replicated.
    pub copied: u64,
    pub copied_bytes: u64,
    /// Objects abandoned after the retry.
    pub failed: u64,
    /// Objects that vanished from the source before they could be copied.
    pub skipped: u64,
}

impl DirectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing(&self) {
        self.missing.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_copied(&self, bytes: u64) {
        self.copied.fetch_add(1, Ordering::Relaxed);
        self.copied_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            found: self.found.load(Ordering::Relaxed),
            missing: self.missing.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            copied_bytes: self.copied_bytes.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Scheduled objects not yet resolved one way or the other.
    pub fn pending(&self) -> u64 {
        self.missing
            .saturating_sub(self.copied + self.failed + self.skipped)
    }
}

impl std::ops::Add for StatsSnapshot {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            found: self.found + other.found,
            missing: self.missing + other.missing,
            copied: self.copied + other.copied,
            copied_bytes: self.copied_bytes + other.copied_bytes,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }
}
