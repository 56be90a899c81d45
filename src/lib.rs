// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # bisync engine
//!
//! Bidirectional differential sync between two key-addressed object stores.
//!
//! ## Architecture
//!
//! One run lists each store once, in key order, and streams the two listings
//! through a merge-join in both directions at the same time:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                               sync_all(A, B)                             │
//! │                                                                          │
//! │  ┌──────────┐   ┌────────────┐   ┌────────────────┐   ┌──────────────┐   │
//! │  │ Lister A │──►│ Duplicator │──►│ Compare A -> B │──►│ Workers (N)  │   │
//! │  └──────────┘   └────────────┘ ┌►└────────────────┘   └──────────────┘   │
//! │                        │       │                                         │
//! │                        └───────┼──────────┐                              │
//! │  ┌──────────┐   ┌────────────┐ │ ┌────────▼───────┐   ┌──────────────┐   │
//! │  │ Lister B │──►│ Duplicator │─┴►│ Compare B -> A │──►│ Workers (N)  │   │
//! │  └──────────┘   └────────────┘   └────────────────┘   └──────────────┘   │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Memory use is bounded by the channel capacities, not by the number of keys.
//! Objects that exist on both sides are left alone; only presence is compared.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bisync_engine::{open_store, SyncConfig, SyncEngine};
//!
//! #[tokio::main]
//! async fn main() -> bisync_engine::Result<()> {
//!     let engine = SyncEngine::new(SyncConfig::default())?;
//!     let a = open_store("/data/primary")?;
//!     let b = open_store("file:///mnt/backup")?;
//!
//!     let report = engine.sync_all(a, b, "").await?;
//!     println!("copied {} objects", report.copied);
//!     Ok(())
//! }
//! ```

pub mod comparator;
pub mod config;
pub mod coordinator;
pub mod duplicator;
pub mod error;
pub mod lister;
pub mod metrics;
pub mod replicator;
pub mod resilience;
pub mod signal;
pub mod stats;
pub mod store;
pub mod worker;

// Re-exports for convenience
pub use comparator::ComparisonOutcome;
pub use config::SyncConfig;
pub use coordinator::{DirectionReport, SyncEngine, SyncMode, SyncReport};
pub use error::{Result, SyncError};
pub use resilience::RetryPolicy;
pub use stats::StatsSnapshot;
pub use store::{open_store, ObjectRecord, ObjectStore, StoreRef};
