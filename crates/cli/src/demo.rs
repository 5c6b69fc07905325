// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo worker: appends a fixed paragraph to a shared file, a few bytes at a time
//!
//! Two workers running at once would interleave their chunks and corrupt the
//! paragraph, which `baton verify` detects.

use async_trait::async_trait;
use baton_core::JobId;
use baton_engine::{WorkError, Worker};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// The paragraph every successful turn writes
pub const LINE: &str = "Maestro is the best......";
const TEXT: &str = "Maestro is the best......\n\n";
const CHUNK_SIZE: usize = 5;

/// Failure message of a deliberately crashed turn
pub const CRASH_MESSAGE: &str = "Crash";

pub struct ChunkWriter {
    path: PathBuf,
    chunk_delay: Duration,
    crash_every: Option<u64>,
    turns: AtomicU64,
}

impl ChunkWriter {
    pub fn new(path: PathBuf, chunk_delay: Duration) -> Self {
        Self {
            path,
            chunk_delay,
            crash_every: None,
            turns: AtomicU64::new(0),
        }
    }

    /// Crash on every `k`-th turn; zero disables crashing
    pub fn with_crash_every(mut self, k: u64) -> Self {
        self.crash_every = (k > 0).then_some(k);
        self
    }

    fn should_crash(&self) -> bool {
        let turn = self.turns.fetch_add(1, Ordering::SeqCst) + 1;
        self.crash_every.is_some_and(|k| turn % k == 0)
    }
}

#[async_trait]
impl Worker for ChunkWriter {
    async fn run(&self, id: &JobId) -> Result<(), WorkError> {
        if self.should_crash() {
            tracing::debug!(%id, "crashing before writing");
            return Err(CRASH_MESSAGE.into());
        }

        for chunk in TEXT.as_bytes().chunks(CHUNK_SIZE) {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(chunk).await?;
            file.flush().await?;
            tokio::time::sleep(self.chunk_delay).await;
        }
        tracing::debug!(%id, path = %self.path.display(), "paragraph written");
        Ok(())
    }
}
