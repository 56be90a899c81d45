//! Shared test utilities for integration, property and chaos tests.
//!
//! This module provides:
//! - `FlakyStore`, a failure-injecting wrapper around `MemoryStore`
//! - `OutOfOrderStore`, a backend that breaks the key-ordering contract
//! - Seeding and payload helpers

#![allow(dead_code)]

pub mod mock_store;

pub use mock_store::*;

use bisync_engine::store::MemoryStore;
use std::sync::Arc;

/// Deterministic payload of `len` bytes, distinct per key.
pub fn payload(key: &str, len: usize) -> Vec<u8> {
    let seed = key.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
    (0..len).map(|i| seed.wrapping_add((i % 251) as u8)).collect()
}

/// An in-memory store holding `keys`, each with a small distinct payload.
pub async fn seeded(name: &str, keys: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new(name));
    for key in keys {
        store.insert(*key, payload(key, 16)).await;
    }
    store
}

/// `count` zero-padded keys with the given prefix.
pub fn numbered_keys(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i:05}")).collect()
}

pub async fn seeded_owned(name: &str, keys: &[String]) -> Arc<MemoryStore> {
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    seeded(name, &refs).await
}
