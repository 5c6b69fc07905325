// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `baton run` - Launch participants that take turns on a shared file

use crate::config;
use crate::demo::ChunkWriter;
use crate::output::{print_list, JobRow, OutputFormat};
use anyhow::{Context, Result};
use baton_core::{IdGen, SystemClock, UuidIdGen};
use baton_engine::{Admission, Coordinator};
use baton_storage::{MemoryStore, Store, TracedStore, WalStore};
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args)]
pub struct RunArgs {
    /// Number of participants to launch
    #[arg(short = 'n', long, default_value_t = 5)]
    pub participants: usize,

    /// How long each participant waits for its turn (e.g. "30s")
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub give_up_after: Duration,

    /// Pause between polls for the turn
    #[arg(long, default_value = "100ms", value_parser = humantime::parse_duration)]
    pub retry_interval: Duration,

    /// File the demo worker appends to
    #[arg(short, long, default_value = "output.txt")]
    pub output: PathBuf,

    /// Make every K-th turn crash before writing
    #[arg(long, value_name = "K")]
    pub crash_every: Option<u64>,

    /// Pause after each chunk the demo worker writes
    #[arg(long, default_value = "50ms", value_parser = humantime::parse_duration)]
    pub chunk_delay: Duration,

    /// TOML file with a [coordinator] table
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persist job records to this write-ahead log instead of memory
    #[arg(long)]
    pub wal: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn run(args: RunArgs) -> Result<()> {
    match args.wal.clone() {
        Some(path) => {
            let store = WalStore::open(&path)
                .with_context(|| format!("failed to open WAL {}", path.display()))?;
            run_with(TracedStore::new(store), args).await
        }
        None => run_with(TracedStore::new(MemoryStore::new()), args).await,
    }
}

async fn run_with<S: Store>(store: S, args: RunArgs) -> Result<()> {
    let config = config::load(args.config.as_deref())?;
    let coordinator = Coordinator::new(store, SystemClock, config);

    let mut worker = ChunkWriter::new(args.output.clone(), args.chunk_delay);
    if let Some(k) = args.crash_every {
        worker = worker.with_crash_every(k);
    }
    let admission = Admission::new(coordinator.clone(), Arc::new(worker));

    let ids = UuidIdGen;
    let mut launched = HashSet::new();
    let mut handles = Vec::with_capacity(args.participants);
    for _ in 0..args.participants {
        let id = ids.next();
        launched.insert(id.clone());
        let admission = admission.clone();
        let (give_up_after, retry_interval) = (args.give_up_after, args.retry_interval);
        handles.push(tokio::spawn(async move {
            admission.attempt(&id, give_up_after, retry_interval).await
        }));
    }

    for handle in handles {
        handle.await.context("participant task failed")?;
    }

    let rows: Vec<JobRow> = coordinator
        .jobs()
        .await?
        .into_iter()
        .filter(|job| launched.contains(&job.id))
        .map(JobRow)
        .collect();
    print_list(&rows, args.format);
    Ok(())
}
