// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the sync engine.
//!
//! Errors are categorized by how far they propagate:
//!
//! | Error Type | Retryable | Propagation |
//! |------------|-----------|-------------|
//! | `OutOfOrder` | No | Fatal: aborts the whole run |
//! | `Listing` | No | Fails the `sync_all` call (initial listing only) |
//! | `Store` | Yes | Per object: retried once, then abandoned |
//! | `Io` | Yes | Per object (spill file) |
//! | `Config` | No | Rejected before any work starts |
//! | `InvalidUri` | No | CLI: bad store URI |
//! | `UnsupportedScheme` | No | CLI: unknown backend |
//! | `Internal` | No | Unexpected internal error |
//!
//! Mid-stream listing failures never surface here: they are carried through
//! the pipeline as [`ListingItem::Failed`](crate::lister::ListingItem::Failed)
//! and absorbed by the comparator.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur during synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The first listing call against a store failed before any keys were produced.
    #[error("Listing error ({store}, marker {marker:?}): {message}")]
    Listing {
        store: String,
        marker: String,
        message: String,
    },

    /// A backend returned keys that are not strictly increasing.
    ///
    /// The merge-join cannot be trusted against such a backend, so the run aborts.
    #[error("Keys out of order from {store}: {previous:?} >= {key:?}")]
    OutOfOrder {
        store: String,
        previous: String,
        key: String,
    },

    /// A get, put, or exists call failed for one object.
    #[error("Store error ({operation} {key:?}): {message}")]
    Store {
        operation: String,
        key: String,
        message: String,
    },

    /// Local I/O failure (spill file creation, write, or rewind).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A store URI could not be parsed.
    #[error("Invalid store URI: {0}")]
    InvalidUri(String),

    /// A store URI names a backend this build does not provide.
    #[error("Unsupported storage scheme: {0}")]
    UnsupportedScheme(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Create a per-object store error.
    pub fn store(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Store {
            operation: operation.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { .. } => true,
            Self::Io(_) => true,
            Self::Listing { .. } => false,
            Self::OutOfOrder { .. } => false,
            Self::Config(_) => false,
            Self::InvalidUri(_) => false,
            Self::UnsupportedScheme(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Check if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfOrder { .. })
    }
}
