// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Filesystem backend.
//!
//! Keys are `/`-separated paths relative to the root directory. Listing walks
//! the tree in key order: directory names sort as if they carried their
//! trailing `/`, so `a.txt` (0x2E) comes before everything under `a/` (0x2F).
//!
//! A paged listing keeps its walk between calls. When the next `list` call
//! asks for the keys after the last one returned, the walk resumes where it
//! stopped instead of reading the tree again from the root.

use super::{BoxFuture, ByteStream, ObjectRecord, ObjectStore, StoreError, StoreResult};
use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, warn};

/// An object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    walk: Arc<Mutex<Option<Walk>>>,
    dir_reads: Arc<AtomicU64>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            walk: Arc::new(Mutex::new(None)),
            dir_reads: Arc::new(AtomicU64::new(0)),
        }
    }

    fn path(&self, key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || escapes {
            return Err(StoreError(format!("invalid key {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FileStore {
    fn uri(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn list(&self, prefix: &str, marker: &str, limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>> {
        let root = self.root.clone();
        let prefix = prefix.to_string();
        let marker = marker.to_string();
        let saved = Arc::clone(&self.walk);
        let dir_reads = Arc::clone(&self.dir_reads);
        Box::pin(async move {
            let records = tokio::task::spawn_blocking(move || {
                let previous = saved.lock().unwrap_or_else(PoisonError::into_inner).take();
                let mut walk = match previous {
                    Some(walk) if walk.continues(&prefix, &marker) => walk,
                    _ => {
                        debug!(root = %root.display(), marker = %marker, "Starting directory walk");
                        Walk::start(&root, prefix, marker)
                    }
                };
                let mut out = Vec::new();
                while out.len() < limit {
                    match walk.next(&dir_reads)? {
                        Some(record) => out.push(record),
                        None => break,
                    }
                }
                *saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(walk);
                Ok::<_, std::io::Error>(out)
            })
            .await
            .map_err(|e| StoreError(format!("listing task failed: {e}")))??;
            Ok(records)
        })
    }

    fn get(&self, key: &str, offset: u64, length: Option<u64>) -> BoxFuture<'_, ByteStream> {
        let path = self.path(key);
        Box::pin(async move {
            let mut file = tokio::fs::File::open(path?).await?;
            if offset > 0 {
                file.seek(SeekFrom::Start(offset)).await?;
            }
            let body: ByteStream = match length {
                Some(n) => Box::new(file.take(n)),
                None => Box::new(file),
            };
            Ok(body)
        })
    }

    fn put(&self, key: &str, mut body: ByteStream) -> BoxFuture<'_, ()> {
        let is_dir = key.ends_with('/');
        let path = self.path(key.trim_end_matches('/'));
        Box::pin(async move {
            let path = path?;
            if is_dir {
                tokio::fs::create_dir_all(&path).await?;
                return Ok(());
            }
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::File::create(&path).await?;
            tokio::io::copy(&mut body, &mut file).await?;
            file.flush().await?;
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        let path = self.path(&key);
        Box::pin(async move {
            match tokio::fs::metadata(path?).await {
                Ok(_) => Ok(()),
                Err(_) => Err(StoreError::not_found(&key)),
            }
        })
    }
}

/// A directory entry. Directory keys carry their trailing `/`.
#[derive(Debug)]
struct Entry {
    key: String,
    path: PathBuf,
    is_dir: bool,
}

/// Depth-first walk in key order over the entries sorting after `last`.
#[derive(Debug)]
struct Walk {
    prefix: String,
    /// The marker, then the last key returned.
    last: String,
    /// Unvisited entries of each open directory, innermost last.
    stack: Vec<std::vec::IntoIter<Entry>>,
}

impl Walk {
    fn start(root: &Path, prefix: String, marker: String) -> Self {
        let mut stack = Vec::new();
        if root.is_dir() {
            let entry = Entry {
                key: String::new(),
                path: root.to_path_buf(),
                is_dir: true,
            };
            stack.push(vec![entry].into_iter());
        }
        Self {
            prefix,
            last: marker,
            stack,
        }
    }

    fn continues(&self, prefix: &str, marker: &str) -> bool {
        self.prefix == prefix && self.last == marker
    }

    /// Next object in key order. Only returned files are stat'ed.
    fn next(&mut self, dir_reads: &AtomicU64) -> std::io::Result<Option<ObjectRecord>> {
        while let Some(frame) = self.stack.last_mut() {
            let Some(entry) = frame.next() else {
                self.stack.pop();
                continue;
            };
            if entry.is_dir {
                // Every key below sorts at or before `last`.
                if entry.key <= self.last && !self.last.starts_with(&entry.key) {
                    continue;
                }
                if !entry.key.starts_with(&self.prefix) && !self.prefix.starts_with(&entry.key) {
                    continue;
                }
                dir_reads.fetch_add(1, Ordering::Relaxed);
                let children = read_sorted(&entry.path, &entry.key)?;
                self.stack.push(children.into_iter());
            } else if entry.key > self.last && entry.key.starts_with(&self.prefix) {
                let meta = match std::fs::metadata(&entry.path) {
                    Ok(meta) => meta,
                    // Removed since the directory was read
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e),
                };
                self.last.clone_from(&entry.key);
                return Ok(Some(ObjectRecord {
                    key: entry.key,
                    size: meta.len(),
                    mtime: meta.modified().ok(),
                }));
            }
        }
        Ok(None)
    }
}

/// Entries of `dir` sorted by key, without stat'ing regular files.
fn read_sorted(dir: &Path, dir_key: &str) -> std::io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
            continue;
        };
        let mut file_type = entry.file_type()?;
        if file_type.is_symlink() {
            // Follows symlinks
            match std::fs::metadata(entry.path()) {
                Ok(meta) => file_type = meta.file_type(),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping dangling symlink");
                    continue;
                }
            }
        }
        let is_dir = file_type.is_dir();
        let key = if is_dir {
            format!("{dir_key}{name}/")
        } else {
            format!("{dir_key}{name}")
        };
        entries.push(Entry {
            key,
            path: entry.path(),
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(entries)
}
