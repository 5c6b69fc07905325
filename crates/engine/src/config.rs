// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Coordinator configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Id of the lock document guarding every read-modify-write
    pub lock_key: String,
    /// Pause between attempts to take the lock
    #[serde(with = "humantime_serde")]
    pub lock_retry_interval: Duration,
    /// Longest a single operation waits for the lock
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
    /// How long a running turn blocks others without being renewed.
    /// Without a lease, an in-progress job blocks until it finishes.
    #[serde(with = "humantime_serde")]
    pub turn_lease: Option<Duration>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_key: "job_queue_lock".to_string(),
            lock_retry_interval: Duration::from_millis(10),
            lock_timeout: Duration::from_secs(30),
            turn_lease: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_key(mut self, key: impl Into<String>) -> Self {
        self.lock_key = key.into();
        self
    }

    pub fn with_lock_retry_interval(mut self, interval: Duration) -> Self {
        self.lock_retry_interval = interval;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_turn_lease(mut self, lease: Duration) -> Self {
        self.turn_lease = Some(lease);
        self
    }
}
