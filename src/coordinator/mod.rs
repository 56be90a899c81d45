// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync coordinator.
//!
//! The orchestrator that ties together:
//! - Key listing via [`crate::lister`]
//! - Stream fan-out via [`crate::duplicator`]
//! - Set difference via [`crate::comparator`]
//! - Object copies via [`crate::worker`] and [`crate::replicator`]
//!
//! # Architecture
//!
//! ```text
//!  lister(A) ──▶ dup(A) ──┬──────────── source ─────────▶ compare(A -> B) ──▶ pool(A -> B)
//!                         └─── destination ─┐
//!                                           ▼
//!  lister(B) ──▶ dup(B) ──┬──────────── source ─────────▶ compare(B -> A) ──▶ pool(B -> A)
//!                         └─── destination ──▶ compare(A -> B)
//! ```
//!
//! Each store is listed exactly once per run; both directions run
//! concurrently. A run ends when both comparators have finished, both worker
//! pools have drained and both listers have stopped.
//!
//! # Failures
//!
//! | Failure                     | Effect                                            |
//! |-----------------------------|---------------------------------------------------|
//! | First listing call fails    | `sync_all` returns `SyncError::Listing`           |
//! | Later listing call fails    | Affected directions stop scheduling; run returns  |
//! | Keys out of order           | Run aborts; `sync_all` returns `OutOfOrder`       |
//! | Copy fails twice            | Key logged and counted as failed; run continues   |

mod types;

pub use types::{DirectionReport, SyncMode, SyncReport};

use crate::comparator::compare;
use crate::config::SyncConfig;
use crate::duplicator::duplicate;
use crate::error::{Result, SyncError};
use crate::lister::{start_listing, ListOptions, Listing, ListingItem};
use crate::metrics;
use crate::replicator::Replicator;
use crate::signal::AbortSignal;
use crate::stats::{CopyCounter, DirectionStats};
use crate::store::StoreRef;
use crate::worker::{WorkerContext, WorkerPool};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Differential sync between pairs of object stores.
///
/// The engine itself holds only configuration. Every run gets its own abort
/// signal, counters and worker pools, so one engine can serve concurrent runs.
pub struct SyncEngine {
    config: SyncConfig,
    replicator: Replicator,
}

impl SyncEngine {
    /// Create an engine, rejecting invalid configuration.
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let replicator = Replicator::new(config.block_size, config.spill_dir.clone());
        Ok(Self { config, replicator })
    }

    /// Make `a` and `b` hold the union of their keys, for keys after `marker`.
    ///
    /// Objects present on both sides are never compared by content. Returns
    /// once every scheduled copy has been attempted.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Listing`] if either store cannot be listed at all
    /// - [`SyncError::OutOfOrder`] if a store lists keys out of order
    /// - [`SyncError::Config`] if the end marker does not sort after `marker`
    pub async fn sync_all(&self, a: StoreRef, b: StoreRef, marker: &str) -> Result<SyncReport> {
        let started = Instant::now();
        self.config.validate_range(marker)?;
        info!(a = %a.uri(), b = %b.uri(), marker = %marker, "Starting bidirectional sync");

        let abort = Arc::new(AbortSignal::new());
        let counter = Arc::new(CopyCounter::new());
        let (listing_a, listing_b) = self.list_pair(&a, &b, marker, &abort).await?;

        let capacity = self.config.page_size;
        let (a_as_source, a_as_destination, dup_a) = duplicate(listing_a.items, capacity);
        let (b_as_source, b_as_destination, dup_b) = duplicate(listing_b.items, capacity);

        let forward = self.context(&a, &b, &counter, &abort);
        let backward = self.context(&b, &a, &counter, &abort);
        let progress = self.spawn_progress(vec![Arc::clone(&forward), Arc::clone(&backward)]);

        let forward = self.spawn_direction(forward, a_as_source, b_as_destination);
        let backward = self.spawn_direction(backward, b_as_source, a_as_destination);
        let forward = join_task(forward, "direction").await;
        let backward = join_task(backward, "direction").await;

        if let Some(progress) = progress {
            progress.abort();
        }
        let (forward, backward) = (forward?, backward?);
        join_task(dup_a, "duplicator").await?;
        join_task(dup_b, "duplicator").await?;
        let listed_a = join_task(listing_a.task, "lister").await?;
        let listed_b = join_task(listing_b.task, "lister").await?;
        let (listed_a, listed_b) = (listed_a?, listed_b?);
        debug!(listed_a, listed_b, "Listers finished");

        let report = SyncReport {
            mode: SyncMode::Bidirectional,
            forward,
            backward: Some(backward),
            copied: counter.get(),
            elapsed: started.elapsed(),
        };
        log_report(&report);
        Ok(report)
    }

    /// Copy keys after `marker` that exist in `src` but not in `dst`.
    ///
    /// Same pipeline as one direction of [`sync_all`](Self::sync_all),
    /// without duplicating the listings.
    pub async fn sync(&self, src: StoreRef, dst: StoreRef, marker: &str) -> Result<SyncReport> {
        let started = Instant::now();
        self.config.validate_range(marker)?;
        info!(src = %src.uri(), dst = %dst.uri(), marker = %marker, "Starting one-way sync");

        let abort = Arc::new(AbortSignal::new());
        let counter = Arc::new(CopyCounter::new());
        let (listing_src, listing_dst) = self.list_pair(&src, &dst, marker, &abort).await?;

        let ctx = self.context(&src, &dst, &counter, &abort);
        let progress = self.spawn_progress(vec![Arc::clone(&ctx)]);
        let forward = self.spawn_direction(ctx, listing_src.items, listing_dst.items);
        let forward = join_task(forward, "direction").await;

        if let Some(progress) = progress {
            progress.abort();
        }
        let forward = forward?;
        let listed_src = join_task(listing_src.task, "lister").await?;
        let listed_dst = join_task(listing_dst.task, "lister").await?;
        listed_src?;
        listed_dst?;

        let report = SyncReport {
            mode: SyncMode::OneWay,
            forward,
            backward: None,
            copied: counter.get(),
            elapsed: started.elapsed(),
        };
        log_report(&report);
        Ok(report)
    }

    fn list_options(&self, marker: &str) -> ListOptions {
        ListOptions {
            start: marker.to_string(),
            end: self.config.end.clone(),
            page_size: self.config.page_size,
        }
    }

    /// Start listing both stores. If the second fails, the first is abandoned.
    async fn list_pair(
        &self,
        first: &StoreRef,
        second: &StoreRef,
        marker: &str,
        abort: &Arc<AbortSignal>,
    ) -> Result<(Listing, Listing)> {
        let options = self.list_options(marker);
        let first_listing =
            start_listing(Arc::clone(first), options.clone(), Arc::clone(abort)).await?;
        match start_listing(Arc::clone(second), options, Arc::clone(abort)).await {
            Ok(second_listing) => Ok((first_listing, second_listing)),
            Err(e) => {
                abort.trigger();
                drop(first_listing.items);
                if let Err(join) = first_listing.task.await {
                    warn!(error = %join, "Abandoned lister failed");
                }
                Err(e)
            }
        }
    }

    fn context(
        &self,
        src: &StoreRef,
        dst: &StoreRef,
        counter: &Arc<CopyCounter>,
        abort: &Arc<AbortSignal>,
    ) -> Arc<WorkerContext> {
        Arc::new(WorkerContext {
            direction: format!("{} -> {}", src.uri(), dst.uri()),
            src: Arc::clone(src),
            dst: Arc::clone(dst),
            replicator: self.replicator.clone(),
            retry: self.config.retry.clone(),
            stats: Arc::new(DirectionStats::new()),
            counter: Arc::clone(counter),
            abort: Arc::clone(abort),
        })
    }

    /// Spawn one direction's comparator. The task resolves once its pool has drained.
    fn spawn_direction(
        &self,
        ctx: Arc<WorkerContext>,
        source: mpsc::Receiver<ListingItem>,
        destination: mpsc::Receiver<ListingItem>,
    ) -> JoinHandle<DirectionReport> {
        let workers = self.config.workers;
        let queue_capacity = self.config.queue_capacity;
        let span = info_span!("direction", direction = %ctx.direction);
        let direction = async move {
            let (pool, work) = WorkerPool::spawn(Arc::clone(&ctx), workers, queue_capacity);
            let outcome = compare(source, destination, work, &ctx.stats, &ctx.abort, &ctx.direction).await;

            let panicked = pool.join().await;
            if panicked > 0 {
                error!(panicked, "Workers exited abnormally");
            }
            debug!("Direction finished");
            DirectionReport {
                direction: ctx.direction.clone(),
                outcome,
                stats: ctx.stats.snapshot(),
            }
        };
        tokio::spawn(direction.instrument(span))
    }

    /// Log counters every `progress_interval` until aborted.
    fn spawn_progress(&self, directions: Vec<Arc<WorkerContext>>) -> Option<JoinHandle<()>> {
        let interval = self.config.progress_interval()?;
        Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;
            loop {
                timer.tick().await;
                for ctx in &directions {
                    let stats = ctx.stats.snapshot();
                    info!(
                        direction = %ctx.direction,
                        found = stats.found,
                        missing = stats.missing,
                        copied = stats.copied,
                        bytes = stats.copied_bytes,
                        failed = stats.failed,
                        pending = stats.pending(),
                        "Progress"
                    );
                }
            }
        }))
    }
}

async fn join_task<T>(handle: JoinHandle<T>, name: &str) -> Result<T> {
    handle
        .await
        .map_err(|e| SyncError::Internal(format!("{name} task failed: {e}")))
}

fn log_report(report: &SyncReport) {
    for direction in report.directions() {
        if !direction.outcome.is_complete() {
            warn!(
                direction = %direction.direction,
                outcome = ?direction.outcome,
                "Direction did not finish listing"
            );
        }
    }
    let totals = report.totals();
    info!(
        mode = %report.mode,
        found = totals.found,
        copied = report.copied,
        bytes = totals.copied_bytes,
        failed = totals.failed,
        skipped = totals.skipped,
        elapsed = ?report.elapsed,
        "Sync finished"
    );
    metrics::record_run(&report.mode.to_string(), report.copied, report.elapsed);
}
