// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory backend.

use super::{BoxFuture, ByteStream, ObjectRecord, ObjectStore, StoreError};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::ops::Bound;
use std::time::SystemTime;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    mtime: SystemTime,
}

/// An object store held entirely in memory.
///
/// Keys live in a `BTreeMap`, so listings come out sorted for free.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    objects: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Insert (or replace) an object directly.
    pub async fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        let entry = Entry {
            data: data.into(),
            mtime: SystemTime::now(),
        };
        self.objects.write().await.insert(key.into(), entry);
    }

    /// Remove an object, returning its content if it was present.
    pub async fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.write().await.remove(key).map(|e| e.data)
    }

    /// Fetch a whole object.
    pub async fn content(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|e| e.data.clone())
    }

    /// All keys, ascending.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl ObjectStore for MemoryStore {
    fn uri(&self) -> String {
        format!("mem://{}", self.name)
    }

    fn list(&self, prefix: &str, marker: &str, limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>> {
        let prefix = prefix.to_string();
        let marker = marker.to_string();
        Box::pin(async move {
            let objects = self.objects.read().await;
            let records = objects
                .range::<str, _>((Bound::Excluded(marker.as_str()), Bound::Unbounded))
                .filter(|(key, _)| key.starts_with(&prefix))
                .take(limit)
                .map(|(key, entry)| ObjectRecord {
                    key: key.clone(),
                    size: entry.data.len() as u64,
                    mtime: Some(entry.mtime),
                })
                .collect();
            Ok(records)
        })
    }

    fn get(&self, key: &str, offset: u64, length: Option<u64>) -> BoxFuture<'_, ByteStream> {
        let key = key.to_string();
        Box::pin(async move {
            if key.is_empty() {
                return Err(StoreError("object key cannot be empty".to_string()));
            }
            let objects = self.objects.read().await;
            let entry = objects.get(&key).ok_or_else(|| StoreError::not_found(&key))?;

            let len = entry.data.len();
            let start = usize::try_from(offset).unwrap_or(len).min(len);
            let end = match length {
                Some(n) => start.saturating_add(usize::try_from(n).unwrap_or(usize::MAX)).min(len),
                None => len,
            };
            let body: ByteStream = Box::new(Cursor::new(entry.data[start..end].to_vec()));
            Ok(body)
        })
    }

    fn put(&self, key: &str, mut body: ByteStream) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            if key.is_empty() {
                return Err(StoreError("object key cannot be empty".to_string()));
            }
            let mut data = Vec::new();
            body.read_to_end(&mut data).await?;
            self.insert(key, data).await;
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            if self.objects.read().await.contains_key(&key) {
                Ok(())
            } else {
                Err(StoreError::not_found(&key))
            }
        })
    }
}
