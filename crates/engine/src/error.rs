// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the turn-taking engine

use baton_core::{JobId, JobStatus};
use baton_storage::StoreError;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Errors from entering or leaving a critical section
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("timed out after {waited:?} waiting for lock {key}")]
    Timeout { key: String, waited: Duration },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from coordinator operations
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error(
        "out of order submission: {id} stamped {submitted_at}, \
         before first in line {first_in_line} stamped {first_submitted_at}"
    )]
    OutOfOrderSubmission {
        id: JobId,
        submitted_at: DateTime<Utc>,
        first_in_line: JobId,
        first_submitted_at: DateTime<Utc>,
    },
    #[error("turn for {id} is held by {holder}")]
    TurnHeld { id: JobId, holder: JobId },
    #[error("{0} is no longer first in line")]
    NotFirstInLine(JobId),
    #[error("illegal transition for {id}: {from} -> {to}")]
    IllegalTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("malformed job record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoordinatorError {
    /// Lock timeouts and store failures; the same call may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(self, CoordinatorError::Guard(_) | CoordinatorError::Store(_))
    }

    /// The queue moved between a granted poll and the claim
    pub fn is_turn_lost(&self) -> bool {
        matches!(
            self,
            CoordinatorError::TurnHeld { .. } | CoordinatorError::NotFirstInLine(_)
        )
    }
}
