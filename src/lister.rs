// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key lister: turns a store's paginated listing into an ordered stream.
//!
//! # Design
//!
//! ```text
//! store.list(marker) ──▶ page ──▶ order check ──▶ mpsc (cap = page size) ──▶ consumer
//!        ▲                                │
//!        └──── marker = last key ◀────────┘
//! ```
//!
//! The first page is fetched before the producer task is spawned, so a store
//! that cannot be listed at all fails the caller directly. After that, every
//! outcome travels in-band as a [`ListingItem`]:
//!
//! - `Object` for each record, strictly increasing by key
//! - `End` once a page comes back empty (or the end marker is reached)
//! - `Failed` if a later page cannot be fetched, or the run was aborted
//!
//! A key that does not sort strictly after its predecessor raises the run's
//! [`AbortSignal`] and ends the producer with [`SyncError::OutOfOrder`].

use crate::error::{Result, SyncError};
use crate::metrics;
use crate::signal::AbortSignal;
use crate::store::{ObjectRecord, StoreRef};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

/// One element of a listing stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingItem {
    Object(ObjectRecord),
    /// The listing stopped early; no further items follow.
    Failed(String),
    /// Normal end of listing.
    End,
}

/// Where a listing starts and stops.
#[derive(Debug, Clone)]
pub struct ListOptions {
    /// List keys strictly after this marker. Empty lists from the beginning.
    pub start: String,
    /// Stop at the first key `>= end`.
    pub end: Option<String>,
    /// Keys per listing request and capacity of the output queue.
    pub page_size: usize,
}

/// A running listing.
pub struct Listing {
    /// The ordered stream.
    pub items: mpsc::Receiver<ListingItem>,
    /// Resolves to the number of records produced, or to the fatal error.
    pub task: JoinHandle<Result<u64>>,
}

/// Start listing `store` in a background task.
///
/// Returns `SyncError::Listing` if the first listing call fails.
pub async fn start_listing(
    store: StoreRef,
    options: ListOptions,
    abort: Arc<AbortSignal>,
) -> Result<Listing> {
    let uri = store.uri();
    let first = store
        .list("", &options.start, options.page_size)
        .await
        .map_err(|e| {
            error!(store = %uri, marker = %options.start, error = %e, "Can't list store");
            metrics::record_listing_failure(&uri, "initial");
            SyncError::Listing {
                store: uri.clone(),
                marker: options.start.clone(),
                message: e.to_string(),
            }
        })?;
    debug!(store = %uri, count = first.len(), "Listed first page");
    metrics::record_listing_page(&uri, first.len());

    let (tx, items) = mpsc::channel(options.page_size.max(1));
    let span = info_span!("lister", store = %uri);
    let task = tokio::spawn(produce(store, options, first, tx, abort).instrument(span));
    Ok(Listing { items, task })
}

async fn produce(
    store: StoreRef,
    options: ListOptions,
    mut page: Vec<ObjectRecord>,
    tx: mpsc::Sender<ListingItem>,
    abort: Arc<AbortSignal>,
) -> Result<u64> {
    let uri = store.uri();
    let mut previous: Option<String> = None;
    let mut listed = 0u64;

    loop {
        if page.is_empty() {
            let _ = tx.send(ListingItem::End).await;
            return Ok(listed);
        }

        for record in page {
            if let Some(prev) = &previous {
                if record.key.as_str() <= prev.as_str() {
                    error!(previous = %prev, key = %record.key, "The keys are out of order");
                    metrics::record_order_violation(&uri);
                    abort.trigger();
                    let _ = tx
                        .send(ListingItem::Failed(format!("keys out of order after {prev:?}")))
                        .await;
                    return Err(SyncError::OutOfOrder {
                        store: uri,
                        previous: prev.clone(),
                        key: record.key,
                    });
                }
            }
            if let Some(end) = &options.end {
                if record.key.as_str() >= end.as_str() {
                    debug!(end = %end, "Reached end marker");
                    let _ = tx.send(ListingItem::End).await;
                    return Ok(listed);
                }
            }

            previous = Some(record.key.clone());
            listed += 1;
            if tx.send(ListingItem::Object(record)).await.is_err() {
                debug!("Listing consumer went away");
                return Ok(listed);
            }
        }

        if abort.is_triggered() {
            let _ = tx.send(ListingItem::Failed("run aborted".to_string())).await;
            return Ok(listed);
        }

        let marker = previous.clone().unwrap_or_default();
        page = match store.list("", &marker, options.page_size).await {
            Ok(page) => page,
            Err(e) => {
                error!(marker = %marker, error = %e, "Fail to list after marker");
                metrics::record_listing_failure(&uri, "page");
                let _ = tx.send(ListingItem::Failed(e.to_string())).await;
                return Ok(listed);
            }
        };
        debug!(count = page.len(), "Listed next page");
        metrics::record_listing_page(&uri, page.len());
    }
}
