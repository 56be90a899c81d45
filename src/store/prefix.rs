// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Key-prefix wrapper: exposes the objects under `prefix` of an inner store
//! with the prefix stripped from their keys.

use super::{BoxFuture, ByteStream, ObjectRecord, ObjectStore, StoreRef};

pub struct PrefixStore {
    inner: StoreRef,
    prefix: String,
}

impl PrefixStore {
    pub fn new(inner: StoreRef, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl ObjectStore for PrefixStore {
    fn uri(&self) -> String {
        format!("{}/{}", self.inner.uri(), self.prefix)
    }

    fn list(&self, prefix: &str, marker: &str, limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>> {
        let full_prefix = self.full_key(prefix);
        // An empty marker must stay empty: "prefix" itself would exclude a key equal to it.
        let full_marker = if marker.is_empty() {
            String::new()
        } else {
            self.full_key(marker)
        };
        Box::pin(async move {
            let records = self.inner.list(&full_prefix, &full_marker, limit).await?;
            Ok(records
                .into_iter()
                .map(|mut record| {
                    record.key = record.key.split_off(self.prefix.len());
                    record
                })
                .collect())
        })
    }

    fn get(&self, key: &str, offset: u64, length: Option<u64>) -> BoxFuture<'_, ByteStream> {
        let key = self.full_key(key);
        Box::pin(async move { self.inner.get(&key, offset, length).await })
    }

    fn put(&self, key: &str, body: ByteStream) -> BoxFuture<'_, ()> {
        let key = self.full_key(key);
        Box::pin(async move { self.inner.put(&key, body).await })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, ()> {
        let key = self.full_key(key);
        Box::pin(async move { self.inner.exists(&key).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::io::Cursor;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_prefix_strips_and_prepends() {
        let inner = Arc::new(MemoryStore::new("bucket"));
        inner.insert("logs/a", b"1".to_vec()).await;
        inner.insert("logs/b", b"2".to_vec()).await;
        inner.insert("other", b"3".to_vec()).await;

        let store = PrefixStore::new(inner.clone(), "logs/");
        assert_eq!(store.uri(), "mem://bucket/logs/");

        let keys: Vec<_> = store.list("", "", 10).await.unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["a", "b"]);

        let after: Vec<_> = store.list("", "a", 10).await.unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(after, vec!["b"]);

        store.put("c", Box::new(Cursor::new(b"4".to_vec()))).await.unwrap();
        assert_eq!(inner.content("logs/c").await.unwrap(), b"4");
        assert!(store.exists("c").await.is_ok());
        assert!(store.exists("other").await.is_err());
    }
}
