// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Run-wide abort flag.
//!
//! Raised when a backend breaks the key-ordering contract. Listers stop
//! paging, comparators stop scheduling and workers stop copying, so the run
//! unwinds promptly and `sync_all` can report the fatal error.

use tokio::sync::watch;

#[derive(Debug)]
pub struct AbortSignal {
    tx: watch::Sender<bool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Raise the flag. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the flag is raised.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // Only fails if the sender is gone, which cannot happen while `self` lives.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}
