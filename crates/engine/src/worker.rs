// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unit of work run once a participant is granted its turn

use async_trait::async_trait;
use baton_core::JobId;

/// Failure reported by a worker; its message is persisted on the job record
pub type WorkError = Box<dyn std::error::Error + Send + Sync>;

/// Work performed while holding the turn
///
/// Called exactly once per granted turn. May fail or panic; either way the
/// job is recorded as failed and the next participant is admitted.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    async fn run(&self, id: &JobId) -> Result<(), WorkError>;
}
