// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! bisync CLI
//!
//! Makes two object stores hold the union of their keys.
//!
//! ```text
//! bisync [OPTIONS] SRC DST
//! ```
//!
//! Stores are given as `mem://name`, `file:///path` or a plain directory path.

use anyhow::Context;
use bisync_engine::store::open_store;
use bisync_engine::{SyncConfig, SyncEngine};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bidirectional differential sync between two object stores.
#[derive(Parser, Debug)]
#[command(name = "bisync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// First store
    src: String,

    /// Second store
    dst: String,

    /// Only sync keys that sort after this marker
    #[arg(long, default_value = "")]
    start: String,

    /// Stop at the first key at or after this marker
    #[arg(long)]
    end: Option<String>,

    /// Replication workers per direction
    #[arg(short = 'p', long = "threads")]
    threads: Option<usize>,

    /// Objects of at least this many bytes are spilled to disk while copying
    #[arg(long)]
    block_size: Option<u64>,

    /// Directory for spill files
    #[arg(long)]
    spill_dir: Option<PathBuf>,

    /// Copy from SRC to DST only
    #[arg(long)]
    one_way: bool,

    /// JSON config file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn sync_config(&self) -> anyhow::Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SyncConfig::default(),
        };
        if let Some(threads) = self.threads {
            config.workers = threads;
        }
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.end.is_some() {
            config.end = self.end.clone();
        }
        if self.spill_dir.is_some() {
            config.spill_dir = self.spill_dir.clone();
        }
        Ok(config)
    }

    fn log_filter(&self) -> EnvFilter {
        let level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_env_filter(cli.log_filter()).init();

    let config = cli.sync_config()?;
    let engine = SyncEngine::new(config).context("invalid configuration")?;
    let src = open_store(&cli.src).with_context(|| format!("opening {}", cli.src))?;
    let dst = open_store(&cli.dst).with_context(|| format!("opening {}", cli.dst))?;

    let report = if cli.one_way {
        engine.sync(src, dst, &cli.start).await?
    } else {
        engine.sync_all(src, dst, &cli.start).await?
    };

    let totals = report.totals();
    info!(
        found = totals.found,
        copied = report.copied,
        bytes = totals.copied_bytes,
        failed = totals.failed,
        "Done"
    );
    Ok(())
}
