// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `baton jobs --wal <path>` - List job records persisted in a write-ahead log

use crate::config;
use crate::output::{print_list, JobRow, OutputFormat};
use anyhow::{Context, Result};
use baton_core::SystemClock;
use baton_engine::Coordinator;
use baton_storage::WalStore;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct JobsArgs {
    /// Write-ahead log written by `baton run --wal`
    #[arg(long)]
    pub wal: PathBuf,

    /// TOML file with a [coordinator] table (for a non-default lock key)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn jobs(args: JobsArgs) -> Result<()> {
    if !args.wal.exists() {
        anyhow::bail!("no write-ahead log at {}", args.wal.display());
    }
    let store = WalStore::open(&args.wal)
        .with_context(|| format!("failed to open WAL {}", args.wal.display()))?;
    let config = config::load(args.config.as_deref())?;
    let coordinator = Coordinator::new(store, SystemClock, config);

    let rows: Vec<JobRow> = coordinator.jobs().await?.into_iter().map(JobRow).collect();
    if rows.is_empty() && matches!(args.format, OutputFormat::Text) {
        println!("No jobs");
        return Ok(());
    }
    print_list(&rows, args.format);
    Ok(())
}
