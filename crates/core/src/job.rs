// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record schema and status state machine
//!
//! One record exists per participant submission. Records are created by the
//! submitting participant, mutated only through that participant's own
//! coordinator calls, and never deleted.

use crate::clock::utc_after;
use crate::document::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Participant-supplied unique job identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&JobId> for Value {
    fn from(id: &JobId) -> Self {
        Value::String(id.0.clone())
    }
}

/// Job lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    /// Legal moves: pending -> in_progress -> succeeded|failed, or pending -> failed
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::Pending, JobStatus::Failed)
                | (JobStatus::InProgress, JobStatus::Succeeded)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }

    /// Wire representation, as used in store filters
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<JobStatus> for Value {
    fn from(status: JobStatus) -> Self {
        Value::String(status.as_str().to_string())
    }
}

/// A participant's job as persisted in the shared store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    /// Time from submission to the terminal transition
    #[serde(default, with = "humantime_serde")]
    pub run_time: Option<Duration>,
    /// Failure detail, only set when `status` is failed
    #[serde(default)]
    pub error: Option<String>,
    /// After this instant a pending record is no longer eligible for a turn
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// After this instant an in-progress record stops blocking admission
    #[serde(default)]
    pub lease_expires_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(id: JobId, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            submitted_at,
            status: JobStatus::Pending,
            run_time: None,
            error: None,
            expires_at: None,
            started_at: None,
            lease_expires_at: None,
        }
    }

    /// Expire the pending record `give_up_after` past its submission
    pub fn with_expiry(mut self, give_up_after: Duration) -> Self {
        self.expires_at = Some(utc_after(self.submitted_at, give_up_after));
        self
    }

    /// Whether this record may still be granted a turn
    pub fn is_waiting(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.expires_at.is_none_or(|at| now < at)
    }

    /// Whether this record currently occupies the turn
    pub fn holds_turn(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::InProgress && self.lease_expires_at.is_none_or(|at| now < at)
    }

    /// Queue position key: submission time, then id for equal timestamps
    pub fn queue_key(&self) -> (DateTime<Utc>, &JobId) {
        (self.submitted_at, &self.id)
    }

    /// Elapsed time since submission, clamped at zero under clock skew
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.submitted_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(doc) => Ok(doc),
            _ => Err(serde::ser::Error::custom(
                "job record did not serialize to an object",
            )),
        }
    }

    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(doc))
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
