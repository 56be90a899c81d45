// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication worker pool.
//!
//! Each direction of a run owns one pool: a bounded MPMC queue of keys and a
//! fixed number of workers pulling from it.
//!
//! ```text
//! comparator ──▶ async_channel (bounded) ──▶ worker 1 ─┐
//!                                        ├──▶ worker 2 ─┼──▶ replicate(src, dst, key)
//!                                        └──▶ worker N ─┘
//! ```
//!
//! Workers exit when the queue is closed and empty, or when the run's abort
//! signal fires. The pool keeps no sender of its own: once the comparator drops
//! its sender and the queue drains, [`WorkerPool::join`] returns.
//!
//! A key whose copy fails after the retry is logged and counted, then dropped.
//! The next run schedules it again.

use crate::metrics;
use crate::replicator::{Replicated, Replicator};
use crate::resilience::{retry, RetryPolicy};
use crate::signal::AbortSignal;
use crate::stats::{CopyCounter, DirectionStats};
use crate::store::{ObjectStore, StoreRef};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, warn, Instrument};

/// A key scheduled for replication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub key: String,
}

/// Everything a worker needs to copy objects in one direction.
pub struct WorkerContext {
    pub src: StoreRef,
    pub dst: StoreRef,
    pub replicator: Replicator,
    pub retry: RetryPolicy,
    pub stats: Arc<DirectionStats>,
    pub counter: Arc<CopyCounter>,
    pub abort: Arc<AbortSignal>,
    /// Label for logs and metrics, `"src -> dst"`.
    pub direction: String,
}

impl WorkerContext {
    /// Copy one key, retrying per policy, and record the outcome.
    async fn process(&self, key: &str) {
        let direction = self.direction.as_str();
        let replicator = &self.replicator;
        let src: &dyn ObjectStore = &*self.src;
        let dst: &dyn ObjectStore = &*self.dst;

        let started = Instant::now();
        metrics::worker_busy(direction);
        let result = retry(
            &self.retry,
            |attempt, e| {
                warn!(key = %key, attempt, error = %e, "Failed to copy, retrying");
                metrics::record_retry(direction);
            },
            move || replicator.replicate(src, dst, key),
        )
        .await;
        metrics::worker_idle(direction);

        match result {
            Ok(Replicated::Copied { bytes, spilled }) => {
                self.counter.increment();
                self.stats.record_copied(bytes);
                metrics::record_copy(direction, bytes, spilled, started.elapsed());
                debug!(key = %key, bytes, spilled, "Copied");
            }
            Ok(Replicated::SourceVanished) => {
                self.stats.record_skipped();
                metrics::record_source_vanished(direction);
                debug!(key = %key, "Skipped, deleted from source");
            }
            Err(e) => {
                self.stats.record_failed();
                metrics::record_copy_failure(direction);
                error!(key = %key, error = %e, "Failed to copy");
            }
        }
    }
}

/// A running set of workers for one direction.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `workers` tasks and return the pool with the queue's only sender.
    pub fn spawn(
        ctx: Arc<WorkerContext>,
        workers: usize,
        queue_capacity: usize,
    ) -> (Self, async_channel::Sender<WorkItem>) {
        let (tx, rx) = async_channel::bounded(queue_capacity.max(1));

        let handles = (0..workers.max(1))
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                let rx = rx.clone();
                let span = info_span!("worker", direction = %ctx.direction, id);
                tokio::spawn(run_worker(ctx, rx).instrument(span))
            })
            .collect();

        (Self { handles }, tx)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Returns how many panicked.
    pub async fn join(self) -> usize {
        let mut panicked = 0;
        for result in futures::future::join_all(self.handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task failed");
                panicked += 1;
            }
        }
        panicked
    }
}

async fn run_worker(ctx: Arc<WorkerContext>, rx: async_channel::Receiver<WorkItem>) {
    loop {
        let item = tokio::select! {
            biased;

            _ = ctx.abort.triggered() => {
                debug!("Worker stopping on abort");
                break;
            }
            item = rx.recv() => match item {
                Ok(item) => item,
                Err(_) => break,
            },
        };
        ctx.process(&item.key).await;
    }
}
