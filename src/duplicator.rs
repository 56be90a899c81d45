// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Stream duplicator: fans one listing stream out to two consumers.
//!
//! A single listing of a store serves as the source stream of one direction
//! and the destination stream of the other. Each item is delivered to both
//! outputs, in order, before the next one is read; a full output blocks the
//! duplicator (and through it the lister).
//!
//! If one output is dropped the other keeps receiving. Once an `End` or
//! `Failed` item has been forwarded the duplicator stops, closing both outputs.

use crate::lister::ListingItem;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Split `input` into two identical streams, each buffered up to `capacity`.
pub fn duplicate(
    mut input: mpsc::Receiver<ListingItem>,
    capacity: usize,
) -> (
    mpsc::Receiver<ListingItem>,
    mpsc::Receiver<ListingItem>,
    JoinHandle<()>,
) {
    let (left_tx, left_rx) = mpsc::channel(capacity.max(1));
    let (right_tx, right_rx) = mpsc::channel(capacity.max(1));

    let task = tokio::spawn(async move {
        let mut outputs = [Some(left_tx), Some(right_tx)];
        while let Some(item) = input.recv().await {
            let terminal = !matches!(item, ListingItem::Object(_));
            for slot in outputs.iter_mut() {
                if let Some(tx) = slot {
                    if tx.send(item.clone()).await.is_err() {
                        *slot = None;
                    }
                }
            }
            if terminal || outputs.iter().all(Option::is_none) {
                break;
            }
        }
    });

    (left_rx, right_rx, task)
}
