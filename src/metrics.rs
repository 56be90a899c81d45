// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics for observability.
//!
//! Emits through the `metrics` facade; the library never installs an exporter,
//! so these calls are no-ops unless the embedding process registers a recorder.
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `bisync_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! Per-direction metrics carry a `direction` label of the form `"src -> dst"`.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record one listing page received from a store.
pub fn record_listing_page(store: &str, keys: usize) {
    counter!("bisync_listing_pages_total", "store" => store.to_string()).increment(1);
    counter!("bisync_keys_listed_total", "store" => store.to_string()).increment(keys as u64);
}

/// Record a listing call that failed (initial or mid-stream).
pub fn record_listing_failure(store: &str, stage: &str) {
    counter!(
        "bisync_listing_failures_total",
        "store" => store.to_string(),
        "stage" => stage.to_string()
    )
    .increment(1);
}

/// Record a backend key-ordering violation.
pub fn record_order_violation(store: &str) {
    counter!("bisync_order_violations_total", "store" => store.to_string()).increment(1);
}

/// Record a key scheduled for replication.
pub fn record_missing(direction: &str) {
    counter!("bisync_keys_missing_total", "direction" => direction.to_string()).increment(1);
}

/// Record a successful object copy.
pub fn record_copy(direction: &str, bytes: u64, spilled: bool, duration: Duration) {
    let path = if spilled { "spill" } else { "memory" };
    counter!(
        "bisync_objects_copied_total",
        "direction" => direction.to_string(),
        "path" => path
    )
    .increment(1);
    counter!("bisync_bytes_copied_total", "direction" => direction.to_string()).increment(bytes);
    histogram!("bisync_copy_duration_seconds", "direction" => direction.to_string())
        .record(duration.as_secs_f64());
}

/// Record a failed copy attempt that will be retried.
pub fn record_retry(direction: &str) {
    counter!("bisync_copy_retries_total", "direction" => direction.to_string()).increment(1);
}

/// Record an object abandoned after its final attempt.
pub fn record_copy_failure(direction: &str) {
    counter!("bisync_copy_failures_total", "direction" => direction.to_string()).increment(1);
}

/// Record an object that disappeared from the source before it was copied.
pub fn record_source_vanished(direction: &str) {
    counter!("bisync_source_vanished_total", "direction" => direction.to_string()).increment(1);
}

/// Track workers currently replicating an object.
pub fn worker_busy(direction: &str) {
    gauge!("bisync_workers_busy", "direction" => direction.to_string()).increment(1.0);
}

pub fn worker_idle(direction: &str) {
    gauge!("bisync_workers_busy", "direction" => direction.to_string()).decrement(1.0);
}

/// Record a completed run.
pub fn record_run(mode: &str, copied: u64, duration: Duration) {
    counter!("bisync_runs_total", "mode" => mode.to_string()).increment(1);
    gauge!("bisync_last_run_copied", "mode" => mode.to_string()).set(copied as f64);
    histogram!("bisync_run_duration_seconds", "mode" => mode.to_string())
        .record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    // With no recorder installed every call must be a harmless no-op.
    #[test]
    fn test_metrics_without_recorder() {
        record_listing_page("mem://a", 10);
        record_listing_failure("mem://a", "initial");
        record_order_violation("mem://a");
        record_missing("a -> b");
        record_copy("a -> b", 1024, true, Duration::from_millis(5));
        record_copy("a -> b", 1, false, Duration::ZERO);
        record_retry("a -> b");
        record_copy_failure("a -> b");
        record_source_vanished("a -> b");
        worker_busy("a -> b");
        worker_idle("a -> b");
        record_run("bidirectional", 3, Duration::from_secs(1));
    }
}
