// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object replicator: copies one object's bytes between stores.
//!
//! # Two Paths
//!
//! ```text
//! get(key, 0, block) ──▶ len < block ? ──yes──▶ put(buffer)                  (memory)
//!                               │
//!                               no
//!                               ▼
//!          spill file (unlinked) ◀── buffer + get(key, len, ..)            (spill)
//!                               │
//!                         rewind, put(file)
//! ```
//!
//! The spill file is created already unlinked, so the kernel reclaims it when
//! the handle closes, even if the process dies mid-copy.
//!
//! A failed first read is checked against `exists`: if the object is gone from
//! the source it was deleted concurrently and there is nothing to copy.

use crate::config::DEFAULT_BLOCK_SIZE;
use crate::error::{Result, SyncError};
use crate::store::ObjectStore;
use std::io::{Cursor, SeekFrom};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, instrument};

/// What a replication did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replicated {
    /// Bytes were written to the destination.
    Copied { bytes: u64, spilled: bool },
    /// The object no longer exists at the source.
    SourceVanished,
}

/// Copies objects between stores.
#[derive(Debug, Clone)]
pub struct Replicator {
    block_size: u64,
    spill_dir: Option<PathBuf>,
}

impl Default for Replicator {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, None)
    }
}

impl Replicator {
    pub fn new(block_size: u64, spill_dir: Option<PathBuf>) -> Self {
        Self {
            block_size: block_size.max(1),
            spill_dir,
        }
    }

    /// Copy `key` from `src` to `dst`.
    #[instrument(skip(self, src, dst), fields(src = %src.uri(), dst = %dst.uri()))]
    pub async fn replicate(
        &self,
        src: &dyn ObjectStore,
        dst: &dyn ObjectStore,
        key: &str,
    ) -> Result<Replicated> {
        let first = match src.get(key, 0, Some(self.block_size)).await {
            Ok(body) => body,
            Err(e) => {
                if src.exists(key).await.is_err() {
                    debug!("Object vanished from source");
                    return Ok(Replicated::SourceVanished);
                }
                return Err(SyncError::store("get", key, e));
            }
        };

        let mut head = Vec::new();
        first
            .take(self.block_size)
            .read_to_end(&mut head)
            .await
            .map_err(|e| SyncError::store("get", key, e))?;
        let head_len = head.len() as u64;

        if head_len < self.block_size {
            dst.put(key, Box::new(Cursor::new(head)))
                .await
                .map_err(|e| SyncError::store("put", key, e))?;
            return Ok(Replicated::Copied {
                bytes: head_len,
                spilled: false,
            });
        }

        let mut spill = tokio::fs::File::from_std(self.spill_file()?);
        spill.write_all(&head).await?;
        drop(head);

        let mut rest = src
            .get(key, head_len, None)
            .await
            .map_err(|e| SyncError::store("get", key, e))?;
        let tail_len = tokio::io::copy(&mut rest, &mut spill).await?;
        spill.flush().await?;
        spill.seek(SeekFrom::Start(0)).await?;

        dst.put(key, Box::new(spill))
            .await
            .map_err(|e| SyncError::store("put", key, e))?;
        debug!(bytes = head_len + tail_len, "Copied through spill file");
        Ok(Replicated::Copied {
            bytes: head_len + tail_len,
            spilled: true,
        })
    }

    fn spill_file(&self) -> Result<std::fs::File> {
        let file = match &self.spill_dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(file)
    }
}
