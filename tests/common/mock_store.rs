//! Mock backends for testing.
//!
//! `FlakyStore` forwards to a `MemoryStore` and fails selected calls, or hides
//! keys to model objects deleted after they were listed.
//! It also records call counts and peak `put` concurrency for assertions.

use bisync_engine::store::{BoxFuture, ByteStream, MemoryStore, ObjectRecord, ObjectStore, StoreError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Failure-injecting wrapper around a [`MemoryStore`].
///
/// # Example
/// ```rust,ignore
/// let store = FlakyStore::new(seeded("a", &["k"]).await);
/// store.fail_gets("k", 1);      // first get of "k" fails, the retry succeeds
/// store.fail_lists_after(2);    // third list call onward fails
/// ```
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    get_failures: Mutex<HashMap<String, usize>>,
    put_failures: Mutex<HashMap<String, usize>>,
    hidden: Mutex<HashSet<String>>,
    fail_every_put: AtomicBool,
    lists_before_failure: Mutex<Option<usize>>,
    put_delay: Mutex<Duration>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub lists: AtomicUsize,
    in_flight_puts: AtomicUsize,
    pub max_in_flight_puts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            get_failures: Mutex::new(HashMap::new()),
            put_failures: Mutex::new(HashMap::new()),
            hidden: Mutex::new(HashSet::new()),
            fail_every_put: AtomicBool::new(false),
            lists_before_failure: Mutex::new(None),
            put_delay: Mutex::new(Duration::ZERO),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            in_flight_puts: AtomicUsize::new(0),
            max_in_flight_puts: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<MemoryStore> {
        &self.inner
    }

    /// Fail the next `times` gets of `key`.
    pub fn fail_gets(&self, key: &str, times: usize) {
        self.get_failures.lock().unwrap().insert(key.to_string(), times);
    }

    /// Fail the next `times` puts of `key`.
    pub fn fail_puts(&self, key: &str, times: usize) {
        self.put_failures.lock().unwrap().insert(key.to_string(), times);
    }

    /// Keep listing `key` but answer get and exists as if it was deleted.
    pub fn hide(&self, key: &str) {
        self.hidden.lock().unwrap().insert(key.to_string());
    }

    fn is_hidden(&self, key: &str) -> bool {
        self.hidden.lock().unwrap().contains(key)
    }

    pub fn fail_every_put(&self) {
        self.fail_every_put.store(true, Ordering::SeqCst);
    }

    /// Let `ok` list calls succeed, then fail every later one.
    pub fn fail_lists_after(&self, ok: usize) {
        *self.lists_before_failure.lock().unwrap() = Some(ok);
    }

    /// Hold every put for `delay` so concurrent workers overlap.
    pub fn slow_puts(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = delay;
    }

    fn take_failure(map: &Mutex<HashMap<String, usize>>, key: &str) -> bool {
        let mut map = map.lock().unwrap();
        match map.get_mut(key) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }
}

impl ObjectStore for FlakyStore {
    fn uri(&self) -> String {
        format!("flaky+{}", self.inner.uri())
    }

    fn list(&self, prefix: &str, marker: &str, limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>> {
        let call = self.lists.fetch_add(1, Ordering::SeqCst);
        let limit_reached = matches!(*self.lists_before_failure.lock().unwrap(), Some(ok) if call >= ok);
        if limit_reached {
            return Box::pin(async { Err(StoreError("list: service unavailable".into())) });
        }
        self.inner.list(prefix, marker, limit)
    }

    fn get(&self, key: &str, offset: u64, length: Option<u64>) -> BoxFuture<'_, ByteStream> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.is_hidden(key) {
            let key = key.to_string();
            return Box::pin(async move { Err(StoreError::not_found(&key)) });
        }
        if Self::take_failure(&self.get_failures, key) {
            return Box::pin(async { Err(StoreError("get: connection reset".into())) });
        }
        self.inner.get(key, offset, length)
    }

    fn put(&self, key: &str, body: ByteStream) -> BoxFuture<'_, ()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_every_put.load(Ordering::SeqCst) || Self::take_failure(&self.put_failures, key) {
            return Box::pin(async { Err(StoreError("put: access denied".into())) });
        }
        let delay = *self.put_delay.lock().unwrap();
        let key = key.to_string();
        Box::pin(async move {
            let now = self.in_flight_puts.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight_puts.fetch_max(now, Ordering::SeqCst);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = self.inner.put(&key, body).await;
            self.in_flight_puts.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }

    fn exists(&self, key: &str) -> BoxFuture<'_, ()> {
        if self.is_hidden(key) {
            let key = key.to_string();
            return Box::pin(async move { Err(StoreError::not_found(&key)) });
        }
        self.inner.exists(key)
    }
}

/// Serves fixed pages whatever the marker, so tests can script bad orderings.
pub struct OutOfOrderStore {
    pages: Vec<Vec<&'static str>>,
    calls: AtomicUsize,
}

impl OutOfOrderStore {
    pub fn new(pages: Vec<Vec<&'static str>>) -> Self {
        Self {
            pages,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ObjectStore for OutOfOrderStore {
    fn uri(&self) -> String {
        "unordered://".to_string()
    }

    fn list(&self, _prefix: &str, _marker: &str, _limit: usize) -> BoxFuture<'_, Vec<ObjectRecord>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let page: Vec<ObjectRecord> = self
            .pages
            .get(n)
            .map(|keys| keys.iter().map(|k| ObjectRecord::new(*k, 1)).collect())
            .unwrap_or_default();
        Box::pin(async move { Ok(page) })
    }

    fn get(&self, key: &str, _offset: u64, _length: Option<u64>) -> BoxFuture<'_, ByteStream> {
        let body: ByteStream = Box::new(std::io::Cursor::new(key.as_bytes().to_vec()));
        Box::pin(async move { Ok(body) })
    }

    fn put(&self, _key: &str, _body: ByteStream) -> BoxFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn exists(&self, _key: &str) -> BoxFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
