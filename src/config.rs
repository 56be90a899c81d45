// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the sync engine.
//!
//! [`SyncConfig`] is passed to [`SyncEngine::new()`](crate::SyncEngine::new)
//! and can be built programmatically or deserialized from JSON.
//!
//! # Quick Start
//!
//! ```rust
//! use bisync_engine::config::SyncConfig;
//!
//! let config = SyncConfig {
//!     workers: 16,
//!     end: Some("logs/2025".into()),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # JSON Example
//!
//! ```json
//! {
//!   "workers": 50,
//!   "page_size": 10240,
//!   "block_size": 10485760,
//!   "end": "z",
//!   "spill_dir": "/var/tmp/bisync",
//!   "progress_interval": "10s",
//!   "retry": { "max_attempts": 2, "retry_delay": "" }
//! }
//! ```

use crate::error::{Result, SyncError};
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Keys requested per listing call.
pub const DEFAULT_PAGE_SIZE: usize = 10_240;

/// Objects smaller than this are copied through memory; larger ones spill to disk.
pub const DEFAULT_BLOCK_SIZE: u64 = 10 << 20;

/// Concurrent replication workers per direction.
pub const DEFAULT_WORKERS: usize = 50;

/// Engine settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Replication workers per direction.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Keys per listing request. Also the capacity of each listing queue.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Capacity of each direction's work queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Small/large object threshold in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: u64,

    /// Stop listing at the first key `>= end`. `None` lists to the end.
    #[serde(default)]
    pub end: Option<String>,

    /// Directory for spill files. `None` uses the system temp dir.
    #[serde(default)]
    pub spill_dir: Option<PathBuf>,

    /// Log progress at this interval while a run is in flight (e.g., "10s").
    /// Empty disables progress logging.
    #[serde(default)]
    pub progress_interval: String,

    /// Per-object retry policy.
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_queue_capacity() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_block_size() -> u64 {
    DEFAULT_BLOCK_SIZE
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            page_size: DEFAULT_PAGE_SIZE,
            queue_capacity: DEFAULT_PAGE_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            end: None,
            spill_dir: None,
            progress_interval: String::new(),
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Small pages and queues so tests exercise pagination and backpressure.
    pub fn for_testing() -> Self {
        Self {
            workers: 4,
            page_size: 16,
            queue_capacity: 8,
            block_size: 1024,
            ..Self::default()
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SyncError::Config("workers must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(SyncError::Config("queue_capacity must be at least 1".into()));
        }
        if self.block_size == 0 {
            return Err(SyncError::Config("block_size must be at least 1".into()));
        }
        if !self.progress_interval.is_empty()
            && humantime::parse_duration(&self.progress_interval).is_err()
        {
            return Err(SyncError::Config(format!(
                "invalid progress_interval {:?}",
                self.progress_interval
            )));
        }
        if !self.retry.retry_delay.is_empty()
            && humantime::parse_duration(&self.retry.retry_delay).is_err()
        {
            return Err(SyncError::Config(format!(
                "invalid retry.retry_delay {:?}",
                self.retry.retry_delay
            )));
        }
        Ok(())
    }

    /// Check that `end` leaves something to list after `start`.
    pub fn validate_range(&self, start: &str) -> Result<()> {
        match &self.end {
            Some(end) if end.as_str() <= start => Err(SyncError::Config(format!(
                "end marker {end:?} must sort after start marker {start:?}"
            ))),
            _ => Ok(()),
        }
    }

    /// Parsed progress interval, `None` when disabled.
    pub fn progress_interval(&self) -> Option<Duration> {
        if self.progress_interval.is_empty() {
            return None;
        }
        humantime::parse_duration(&self.progress_interval)
            .ok()
            .filter(|d| !d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.workers, 50);
        assert_eq!(config.page_size, 10_240);
        assert_eq!(config.queue_capacity, 10_240);
        assert_eq!(config.block_size, 10 * 1024 * 1024);
        assert!(config.end.is_none());
        assert!(config.progress_interval().is_none());
        assert_eq!(config.retry.max_attempts, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config: SyncConfig = serde_json::from_str(
            r#"{"workers": 8, "end": "m", "progress_interval": "5s", "retry": {"max_attempts": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.end.as_deref(), Some("m"));
        assert_eq!(config.progress_interval(), Some(Duration::from_secs(5)));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        for config in [
            SyncConfig { workers: 0, ..Default::default() },
            SyncConfig { page_size: 0, ..Default::default() },
            SyncConfig { queue_capacity: 0, ..Default::default() },
            SyncConfig { block_size: 0, ..Default::default() },
        ] {
            assert!(matches!(config.validate(), Err(SyncError::Config(_))));
        }
    }

    #[test]
    fn test_validate_rejects_bad_interval() {
        let config = SyncConfig {
            progress_interval: "often".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_retry_delay() {
        let config = SyncConfig {
            retry: RetryPolicy {
                max_attempts: 2,
                retry_delay: "soon".into(),
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));

        let config: SyncConfig =
            serde_json::from_str(r#"{"retry": {"retry_delay": "50ms"}}"#).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_range() {
        let config = SyncConfig {
            end: Some("m".into()),
            ..Default::default()
        };
        assert!(config.validate_range("").is_ok());
        assert!(config.validate_range("a").is_ok());
        assert!(config.validate_range("m").is_err());
        assert!(config.validate_range("z").is_err());
        assert!(SyncConfig::default().validate_range("z").is_ok());
    }

    #[test]
    fn test_for_testing_is_valid() {
        let config = SyncConfig::for_testing();
        assert!(config.validate().is_ok());
        assert!(config.page_size < DEFAULT_PAGE_SIZE);
    }
}
