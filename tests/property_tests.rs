//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

mod common;

use bisync_engine::comparator::{compare, ComparisonOutcome, DestCursor};
use bisync_engine::lister::ListingItem;
use bisync_engine::signal::AbortSignal;
use bisync_engine::stats::DirectionStats;
use bisync_engine::store::{MemoryStore, ObjectRecord};
use bisync_engine::{SyncConfig, SyncEngine};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn key_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-c]{0,3}[a-z0-9/]{1,4}", 0..40)
}

async fn stream(keys: &BTreeSet<String>) -> mpsc::Receiver<ListingItem> {
    let (tx, rx) = mpsc::channel(keys.len() + 1);
    for key in keys {
        tx.send(ListingItem::Object(ObjectRecord::new(key.clone(), 0)))
            .await
            .unwrap();
    }
    tx.send(ListingItem::End).await.unwrap();
    rx
}

async fn scheduled(src: &BTreeSet<String>, dst: &BTreeSet<String>) -> (Vec<String>, ComparisonOutcome) {
    let (tx, rx) = async_channel::unbounded();
    let stats = DirectionStats::new();
    let outcome = compare(
        stream(src).await,
        stream(dst).await,
        tx,
        &stats,
        &AbortSignal::new(),
        "a -> b",
    )
    .await;
    let mut out = Vec::new();
    while let Ok(item) = rx.recv().await {
        out.push(item.key);
    }
    (out, outcome)
}

// =============================================================================
// Comparator Properties
// =============================================================================

proptest! {
    /// Scheduled keys are exactly the set difference, in ascending order.
    #[test]
    fn comparator_schedules_set_difference(src in key_set(), dst in key_set()) {
        let (keys, outcome) = runtime().block_on(scheduled(&src, &dst));
        let expected: Vec<String> = src.difference(&dst).cloned().collect();
        prop_assert_eq!(outcome, ComparisonOutcome::Completed);
        prop_assert_eq!(keys, expected);
    }

    /// A key is never scheduled against a destination that already holds it.
    #[test]
    fn comparator_against_superset_schedules_nothing(src in key_set(), extra in key_set()) {
        let dst: BTreeSet<String> = src.union(&extra).cloned().collect();
        let (keys, _) = runtime().block_on(scheduled(&src, &dst));
        prop_assert!(keys.is_empty());
    }

    /// The exhausted cursor sorts after every key.
    #[test]
    fn exhausted_cursor_is_never_behind(key in "\\PC{0,12}") {
        prop_assert!(!DestCursor::Exhausted.is_behind(&key));
        prop_assert!(!DestCursor::Exhausted.holds(&key));
        prop_assert!(DestCursor::Start.is_behind(&key));
    }
}

// =============================================================================
// End-to-End Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// After one run both stores hold the union; a second run copies nothing.
    #[test]
    fn sync_all_converges_to_union(a_keys in key_set(), b_keys in key_set()) {
        let rt = runtime();
        let (copied, again, a_after, b_after) = rt.block_on(async {
            let a = Arc::new(MemoryStore::new("a"));
            let b = Arc::new(MemoryStore::new("b"));
            for key in &a_keys {
                a.insert(key.clone(), common::payload(key, 8)).await;
            }
            for key in &b_keys {
                b.insert(key.clone(), common::payload(key, 8)).await;
            }

            let engine = SyncEngine::new(SyncConfig::for_testing()).unwrap();
            let first = engine.sync_all(a.clone(), b.clone(), "").await.unwrap();
            let second = engine.sync_all(a.clone(), b.clone(), "").await.unwrap();
            (first.copied, second.copied, a.keys().await, b.keys().await)
        });

        let union: Vec<String> = a_keys.union(&b_keys).cloned().collect();
        let expected = a_keys.symmetric_difference(&b_keys).count() as u64;
        prop_assert_eq!(copied, expected);
        prop_assert_eq!(again, 0);
        prop_assert_eq!(a_after, union.clone());
        prop_assert_eq!(b_after, union);
    }
}
