// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry policy for per-object replication.
//!
//! The engine retries a failed copy a fixed number of times and then abandons
//! the key. Anything missed is picked up by the next run, since the
//! comparison is idempotent.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> bisync_engine::Result<()> {
//! use bisync_engine::resilience::{retry, RetryPolicy};
//!
//! let policy = RetryPolicy::default(); // one try plus one retry
//! let value = retry(&policy, |_attempt, _err| {}, || async { Ok::<_, bisync_engine::SyncError>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How many times a single object copy is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Pause between attempts as a duration string (e.g., "100ms").
    /// Empty means retry immediately.
    #[serde(default)]
    pub retry_delay: String,
}

fn default_max_attempts() -> usize {
    2
}

impl Default for RetryPolicy {
    /// One attempt plus one immediate retry.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay: String::new(),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            retry_delay: String::new(),
        }
    }

    /// Parse `retry_delay`. [`SyncConfig::validate`](crate::SyncConfig::validate)
    /// rejects unparseable values; here they fall back to no delay.
    pub fn delay(&self) -> Duration {
        if self.retry_delay.is_empty() {
            return Duration::ZERO;
        }
        humantime::parse_duration(&self.retry_delay).unwrap_or(Duration::ZERO)
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// `on_failure(attempt, &err)` is called for every failed attempt that will be
/// retried (attempts are 1-indexed). The last error is returned as-is.
/// Errors that are not [retryable](SyncError::is_retryable) end the loop at once.
pub async fn retry<T, F, Fut, L>(policy: &RetryPolicy, mut on_failure: L, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    L: FnMut(usize, &SyncError),
{
    let attempts = policy.max_attempts.max(1);
    let delay = policy.delay();
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts || !e.is_retryable() => return Err(e),
            Err(e) => {
                on_failure(attempt, &e);
                attempt += 1;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
