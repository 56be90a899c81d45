// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object store abstraction.
//!
//! The sync engine consumes every backend through [`ObjectStore`]. Backends are
//! trusted for everything except key ordering, which the
//! [lister](crate::lister) checks on every record.
//!
//! # Example
//!
//! ```rust,no_run
//! use bisync_engine::store::{BoxFuture, ByteStream, ObjectRecord, ObjectStore, StoreError};
//!
//! struct MyBackend { /* ... */ }
//!
//! impl ObjectStore for MyBackend {
//!     fn uri(&self) -> String {
//!         "my://bucket".to_string()
//!     }
//!
//!     fn list(&self, _prefix: &str, _marker: &str, _limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>> {
//!         Box::pin(async move { Ok(Vec::new()) })
//!     }
//!
//!     fn get(&self, _key: &str, _offset: u64, _length: Option<u64>) -> BoxFuture<'_, ByteStream> {
//!         Box::pin(async move { Err(StoreError::not_found("unused")) })
//!     }
//!
//!     fn put(&self, _key: &str, _body: ByteStream) -> BoxFuture<'_, ()> {
//!         Box::pin(async move { Ok(()) })
//!     }
//!
//!     fn exists(&self, key: &str) -> BoxFuture<'_, ()> {
//!         let key = key.to_string();
//!         Box::pin(async move { Err(StoreError::not_found(&key)) })
//!     }
//! }
//! ```

mod file;
mod memory;
mod prefix;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use prefix::PrefixStore;

use crate::error::{Result, SyncError};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncRead;

/// Result type for backend calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Type alias for boxed async futures (keeps the trait object-safe).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// A readable object body, used for both downloads and uploads.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Shared handle to a backend.
pub type StoreRef = Arc<dyn ObjectStore>;

/// Simplified error reported by backends.
#[derive(Debug, Clone)]
pub struct StoreError(pub String);

impl StoreError {
    pub fn not_found(key: &str) -> Self {
        Self(format!("{key}: not exists"))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

/// One entry of a listing page.
///
/// Only `key` drives the comparison; the other fields are informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
    pub mtime: Option<SystemTime>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            mtime: None,
        }
    }
}

/// What the sync engine needs from a backend.
pub trait ObjectStore: Send + Sync + 'static {
    /// Human-readable location, used in logs and errors.
    fn uri(&self) -> String;

    /// List at most `limit` records whose keys start with `prefix` and sort
    /// strictly after `marker`, in ascending key order.
    fn list(&self, prefix: &str, marker: &str, limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>>;

    /// Ranged read. `length = None` reads through the end of the object.
    ///
    /// An `offset` at or past the end yields an empty stream.
    fn get(&self, key: &str, offset: u64, length: Option<u64>) -> BoxFuture<'_, ByteStream>;

    /// Upload a whole object, replacing any existing one at `key`.
    fn put(&self, key: &str, body: ByteStream) -> BoxFuture<'_, ()>;

    /// `Ok(())` if the object is present, an error otherwise.
    fn exists(&self, key: &str) -> BoxFuture<'_, ()>;
}

/// Open a store from a URI.
///
/// Accepted forms:
/// - `mem://name[/prefix]`: a fresh in-memory store
/// - `file:///abs/path`: a directory tree
/// - a bare path (relative paths resolve against the working directory)
pub fn open_store(uri: &str) -> Result<StoreRef> {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return open_path(uri);
    };

    match scheme.to_ascii_lowercase().as_str() {
        "file" => {
            if rest.is_empty() {
                return Err(SyncError::InvalidUri(uri.to_string()));
            }
            open_path(rest)
        }
        "mem" => {
            let (name, prefix) = match rest.split_once('/') {
                Some((name, prefix)) => (name, prefix),
                None => (rest, ""),
            };
            if name.is_empty() {
                return Err(SyncError::InvalidUri(uri.to_string()));
            }
            let store: StoreRef = Arc::new(MemoryStore::new(name));
            Ok(with_prefix(store, prefix))
        }
        "" => Err(SyncError::InvalidUri(uri.to_string())),
        other => Err(SyncError::UnsupportedScheme(other.to_string())),
    }
}

/// Wrap a store so every key is relative to `prefix`. An empty prefix is a no-op.
pub fn with_prefix(store: StoreRef, prefix: &str) -> StoreRef {
    if prefix.is_empty() {
        store
    } else {
        Arc::new(PrefixStore::new(store, prefix))
    }
}

fn open_path(path: &str) -> Result<StoreRef> {
    if path.is_empty() {
        return Err(SyncError::InvalidUri(path.to_string()));
    }
    let mut root = PathBuf::from(path);
    if root.is_relative() {
        root = std::env::current_dir()?.join(root);
    }
    Ok(Arc::new(FileStore::new(root)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mem_store() {
        let store = open_store("mem://bucket").unwrap();
        assert_eq!(store.uri(), "mem://bucket");
    }

    #[test]
    fn test_open_mem_store_with_prefix() {
        let store = open_store("mem://bucket/logs/").unwrap();
        assert_eq!(store.uri(), "mem://bucket/logs/");
    }

    #[test]
    fn test_open_file_store() {
        let store = open_store("file:///tmp/bisync-root").unwrap();
        assert!(store.uri().starts_with("file://"));
        assert!(store.uri().contains("bisync-root"));
    }

    #[test]
    fn test_open_bare_relative_path_is_absolute() {
        let store = open_store("some/dir").unwrap();
        let uri = store.uri();
        let path = uri.trim_start_matches("file://");
        assert!(std::path::Path::new(path).is_absolute());
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = open_store("ftp://host/bucket").err().unwrap();
        assert!(matches!(err, SyncError::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[test]
    fn test_invalid_uris() {
        assert!(matches!(open_store("mem://"), Err(SyncError::InvalidUri(_))));
        assert!(matches!(open_store("file://"), Err(SyncError::InvalidUri(_))));
        assert!(matches!(open_store("://x"), Err(SyncError::InvalidUri(_))));
        assert!(matches!(open_store(""), Err(SyncError::InvalidUri(_))));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::not_found("a/b");
        assert_eq!(err.to_string(), "a/b: not exists");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_object_record_new() {
        let record = ObjectRecord::new("k", 3);
        assert_eq!(record.key, "k");
        assert_eq!(record.size, 3);
        assert!(record.mtime.is_none());
    }
}
